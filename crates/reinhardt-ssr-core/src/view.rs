//! Server-side markup tree.
//!
//! Components describe their output as a [`View`] tree which the bundle
//! renderer serializes to HTML once the whole component chain has rendered.

use std::borrow::Cow;

/// A unified representation of renderable content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
	/// An HTML element.
	Element(ElementView),
	/// An escaped text node.
	Text(Cow<'static, str>),
	/// A fragment containing multiple views (no wrapper element).
	Fragment(Vec<View>),
	/// An empty view (renders nothing).
	Empty,
}

/// Represents an HTML element in the view tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementView {
	tag: Cow<'static, str>,
	attrs: Vec<(Cow<'static, str>, Cow<'static, str>)>,
	children: Vec<View>,
	is_void: bool,
}

impl ElementView {
	/// Creates a new element view.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		let tag = tag.into();
		let is_void = matches!(
			tag.as_ref(),
			"area"
				| "base" | "br"
				| "col" | "embed"
				| "hr" | "img"
				| "input" | "link"
				| "meta" | "source"
				| "track" | "wbr"
		);
		Self {
			tag,
			attrs: Vec::new(),
			children: Vec::new(),
			is_void,
		}
	}

	/// Adds an attribute.
	pub fn attr(
		mut self,
		name: impl Into<Cow<'static, str>>,
		value: impl Into<Cow<'static, str>>,
	) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Adds a child view.
	pub fn child(mut self, child: impl IntoView) -> Self {
		self.children.push(child.into_view());
		self
	}

	/// Adds multiple child views.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoView>) -> Self {
		self.children
			.extend(children.into_iter().map(|c| c.into_view()));
		self
	}

	/// Returns the tag name.
	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	/// Returns the attributes.
	pub fn attrs(&self) -> &[(Cow<'static, str>, Cow<'static, str>)] {
		&self.attrs
	}

	/// Returns the child views.
	pub fn child_views(&self) -> &[View] {
		&self.children
	}

	/// Returns whether this is a void element.
	pub fn is_void(&self) -> bool {
		self.is_void
	}
}

impl View {
	/// Creates an element view.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> ElementView {
		ElementView::new(tag)
	}

	/// Creates a text view.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a fragment view.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoView>) -> Self {
		Self::Fragment(children.into_iter().map(|c| c.into_view()).collect())
	}

	/// Creates an empty view.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Returns true for [`View::Empty`].
	pub fn is_empty(&self) -> bool {
		matches!(self, View::Empty)
	}

	/// Renders the view to an HTML string.
	pub fn render_to_string(&self) -> String {
		let mut output = String::new();
		self.render_into(&mut output);
		output
	}

	fn render_into(&self, output: &mut String) {
		match self {
			View::Element(el) => {
				output.push('<');
				output.push_str(el.tag_name());

				for (name, value) in el.attrs() {
					output.push(' ');
					output.push_str(name);
					output.push_str("=\"");
					output.push_str(&html_escape(value));
					output.push('"');
				}

				if el.is_void() {
					output.push_str(" />");
				} else {
					output.push('>');
					for child in el.child_views() {
						child.render_into(output);
					}
					output.push_str("</");
					output.push_str(el.tag_name());
					output.push('>');
				}
			}
			View::Text(text) => {
				output.push_str(&html_escape(text));
			}
			View::Fragment(children) => {
				for child in children {
					child.render_into(output);
				}
			}
			View::Empty => {}
		}
	}
}

impl Default for View {
	fn default() -> Self {
		Self::Empty
	}
}

/// Trait for types that can be converted into a View.
pub trait IntoView {
	/// Converts self into a View.
	fn into_view(self) -> View;
}

impl IntoView for View {
	fn into_view(self) -> View {
		self
	}
}

impl IntoView for ElementView {
	fn into_view(self) -> View {
		View::Element(self)
	}
}

impl IntoView for String {
	fn into_view(self) -> View {
		View::Text(Cow::Owned(self))
	}
}

impl IntoView for &'static str {
	fn into_view(self) -> View {
		View::Text(Cow::Borrowed(self))
	}
}

impl<T: IntoView> IntoView for Option<T> {
	fn into_view(self) -> View {
		match self {
			Some(v) => v.into_view(),
			None => View::Empty,
		}
	}
}

impl<T: IntoView> IntoView for Vec<T> {
	fn into_view(self) -> View {
		View::fragment(self)
	}
}

/// Escapes text for HTML content and double-quoted attribute values.
///
/// Borrows the input when nothing needs escaping.
pub fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_element_render() {
		let view = View::element("div")
			.attr("class", "greeting")
			.child("Hello")
			.into_view();

		assert_eq!(view.render_to_string(), "<div class=\"greeting\">Hello</div>");
	}

	#[rstest]
	fn test_void_element_render() {
		let view = View::element("img").attr("src", "/logo.png").into_view();
		assert_eq!(view.render_to_string(), "<img src=\"/logo.png\" />");
	}

	#[rstest]
	fn test_text_is_escaped() {
		let view = View::text("<script>alert('x')</script>");
		assert_eq!(
			view.render_to_string(),
			"&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
		);
	}

	#[rstest]
	fn test_attribute_is_escaped() {
		let view = View::element("a")
			.attr("title", "\"quoted\" & more")
			.into_view();
		assert_eq!(
			view.render_to_string(),
			"<a title=\"&quot;quoted&quot; &amp; more\"></a>"
		);
	}

	#[rstest]
	#[case("plain text", "plain text", true)]
	#[case("a & b", "a &amp; b", false)]
	#[case("<'\">", "&lt;&#x27;&quot;&gt;", false)]
	#[case("", "", true)]
	fn test_html_escape(#[case] input: &str, #[case] expected: &str, #[case] borrowed: bool) {
		let escaped = html_escape(input);
		assert_eq!(escaped, expected);
		assert_eq!(matches!(escaped, Cow::Borrowed(_)), borrowed);
	}

	#[rstest]
	fn test_fragment_and_empty() {
		let view = View::fragment(vec![
			View::text("a"),
			View::empty(),
			View::element("b").child("c").into_view(),
		]);
		assert_eq!(view.render_to_string(), "a<b>c</b>");
		assert!(View::default().is_empty());
	}

	#[rstest]
	#[case(None, "")]
	#[case(Some("x"), "x")]
	fn test_option_into_view(#[case] value: Option<&'static str>, #[case] expected: &str) {
		assert_eq!(value.into_view().render_to_string(), expected);
	}
}
