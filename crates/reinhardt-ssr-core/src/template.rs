//! Document templates.
//!
//! A template is an HTML document containing slot comments:
//!
//! | Slot                      | Content                               |
//! |---------------------------|---------------------------------------|
//! | `<!--ssr-outlet-->`       | rendered application markup           |
//! | `<!--ssr-head-assets-->`  | stylesheet and preload links          |
//! | `<!--ssr-state-->`        | inline state assignment               |
//! | `<!--ssr-body-assets-->`  | deferred scripts                      |
//!
//! The outlet must appear exactly once; every other slot at most once.
//! A missing head slot is placed before `</head>` and missing state and body
//! slots before `</body>`.

mod compositor;

use std::path::{Path, PathBuf};

pub use compositor::{ComposeOptions, compose, is_valid_state_variable};

/// Error raised while loading a template or composing a document.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
	/// The template has no outlet slot.
	#[error("template has no {} slot", OUTLET_SLOT)]
	MissingOutlet,

	/// A slot appears more than once.
	#[error("template slot {0} appears more than once")]
	DuplicateSlot(&'static str),

	/// The template file could not be read.
	#[error("failed to read template {}: {source}", .path.display())]
	Io {
		/// File path.
		path: PathBuf,
		/// I/O failure.
		#[source]
		source: std::io::Error,
	},

	/// The configured state variable is not a JavaScript identifier.
	#[error("invalid state variable name: {0:?}")]
	InvalidStateVariable(String),

	/// The state could not be serialized.
	#[error("failed to serialize state: {0}")]
	State(#[from] serde_json::Error),
}

/// Marker replaced by the application markup.
pub const OUTLET_SLOT: &str = "<!--ssr-outlet-->";
/// Marker replaced by head asset links.
pub const HEAD_ASSETS_SLOT: &str = "<!--ssr-head-assets-->";
/// Marker replaced by body scripts.
pub const BODY_ASSETS_SLOT: &str = "<!--ssr-body-assets-->";
/// Marker replaced by the state script.
pub const STATE_SLOT: &str = "<!--ssr-state-->";

/// A slot in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
	/// Application markup.
	Outlet,
	/// Head asset links.
	HeadAssets,
	/// Body scripts.
	BodyAssets,
	/// State script.
	State,
}

impl Slot {
	const ALL: [Slot; 4] = [Slot::Outlet, Slot::HeadAssets, Slot::BodyAssets, Slot::State];

	/// The comment marking this slot.
	pub fn marker(&self) -> &'static str {
		match self {
			Self::Outlet => OUTLET_SLOT,
			Self::HeadAssets => HEAD_ASSETS_SLOT,
			Self::BodyAssets => BODY_ASSETS_SLOT,
			Self::State => STATE_SLOT,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Text(String),
	Slot(Slot),
}

/// A parsed document template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	segments: Vec<Segment>,
}

impl Template {
	/// Parses a template, inserting fallback positions for missing slots.
	pub fn parse(source: &str) -> Result<Self, TemplateError> {
		for slot in Slot::ALL {
			let count = source.matches(slot.marker()).count();
			if count > 1 {
				return Err(TemplateError::DuplicateSlot(slot.marker()));
			}
			if count == 0 && slot == Slot::Outlet {
				return Err(TemplateError::MissingOutlet);
			}
		}

		let mut source = source.to_string();

		if !source.contains(HEAD_ASSETS_SLOT) {
			let at = find_ascii_case_insensitive(&source, "</head>")
				.or_else(|| source.find(OUTLET_SLOT))
				.unwrap_or(0);
			source.insert_str(at, HEAD_ASSETS_SLOT);
		}

		let mut body_fallback = String::new();
		for slot in [Slot::State, Slot::BodyAssets] {
			if !source.contains(slot.marker()) {
				body_fallback.push_str(slot.marker());
			}
		}
		if !body_fallback.is_empty() {
			let at = rfind_ascii_case_insensitive(&source, "</body>").unwrap_or(source.len());
			source.insert_str(at, &body_fallback);
		}

		Ok(Self {
			segments: split_segments(&source),
		})
	}

	/// Reads and parses a template file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let template = Self::parse(&source)?;
		tracing::info!(path = %path.display(), "Template loaded");
		Ok(template)
	}

	/// Slots in document order.
	pub fn slots(&self) -> Vec<Slot> {
		self.segments
			.iter()
			.filter_map(|segment| match segment {
				Segment::Slot(slot) => Some(*slot),
				Segment::Text(_) => None,
			})
			.collect()
	}

	fn segments(&self) -> &[Segment] {
		&self.segments
	}

	fn text_len(&self) -> usize {
		self.segments
			.iter()
			.map(|segment| match segment {
				Segment::Text(text) => text.len(),
				Segment::Slot(_) => 0,
			})
			.sum()
	}
}

impl Default for Template {
	/// A minimal HTML5 document.
	fn default() -> Self {
		Self {
			segments: vec![
				Segment::Text(
					"<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n".to_string(),
				),
				Segment::Slot(Slot::HeadAssets),
				Segment::Text("</head>\n<body>\n".to_string()),
				Segment::Slot(Slot::Outlet),
				Segment::Text("\n".to_string()),
				Segment::Slot(Slot::State),
				Segment::Slot(Slot::BodyAssets),
				Segment::Text("</body>\n</html>\n".to_string()),
			],
		}
	}
}

fn split_segments(source: &str) -> Vec<Segment> {
	let mut segments = Vec::new();
	let mut rest = source;

	loop {
		let next = Slot::ALL
			.iter()
			.filter_map(|slot| rest.find(slot.marker()).map(|at| (at, *slot)))
			.min_by_key(|(at, _)| *at);

		let Some((at, slot)) = next else {
			if !rest.is_empty() {
				segments.push(Segment::Text(rest.to_string()));
			}
			return segments;
		};

		if at > 0 {
			segments.push(Segment::Text(rest[..at].to_string()));
		}
		segments.push(Segment::Slot(slot));
		rest = &rest[at + slot.marker().len()..];
	}
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
	haystack.to_ascii_lowercase().find(needle)
}

fn rfind_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
	haystack.to_ascii_lowercase().rfind(needle)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_explicit_slots_keep_their_position() {
		let template = Template::parse(
			"<html><head><!--ssr-head-assets--></head><body><!--ssr-outlet--><!--ssr-body-assets--><!--ssr-state--></body></html>",
		)
		.unwrap();

		assert_eq!(
			template.slots(),
			vec![Slot::HeadAssets, Slot::Outlet, Slot::BodyAssets, Slot::State]
		);
	}

	#[rstest]
	fn test_missing_slots_fall_back() {
		let template =
			Template::parse("<html><HEAD><title>x</title></HEAD><body><!--ssr-outlet--></BODY></html>")
				.unwrap();

		assert_eq!(
			template.slots(),
			vec![Slot::HeadAssets, Slot::Outlet, Slot::State, Slot::BodyAssets]
		);
		assert_eq!(
			template.segments()[0],
			Segment::Text("<html><HEAD><title>x</title>".to_string())
		);
	}

	#[rstest]
	fn test_fragment_template_without_head_or_body() {
		let template = Template::parse("<!--ssr-outlet-->").unwrap();
		assert_eq!(
			template.slots(),
			vec![Slot::HeadAssets, Slot::Outlet, Slot::State, Slot::BodyAssets]
		);
	}

	#[rstest]
	#[case("<html><body></body></html>")]
	#[case("")]
	fn test_missing_outlet(#[case] source: &str) {
		assert!(matches!(
			Template::parse(source),
			Err(TemplateError::MissingOutlet)
		));
	}

	#[rstest]
	#[case("<!--ssr-outlet--><!--ssr-outlet-->", OUTLET_SLOT)]
	#[case("<!--ssr-outlet--><!--ssr-state--><!--ssr-state-->", STATE_SLOT)]
	fn test_duplicate_slot(#[case] source: &str, #[case] slot: &str) {
		assert!(matches!(
			Template::parse(source),
			Err(TemplateError::DuplicateSlot(marker)) if marker == slot
		));
	}

	#[rstest]
	fn test_default_template_has_every_slot() {
		let template = Template::default();
		assert_eq!(
			template.slots(),
			vec![Slot::HeadAssets, Slot::Outlet, Slot::State, Slot::BodyAssets]
		);
		assert!(template.text_len() > 0);
	}

	#[rstest]
	fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("index.html");
		std::fs::write(&path, "<body><!--ssr-outlet--></body>").unwrap();

		assert!(Template::from_file(&path).is_ok());
		assert!(matches!(
			Template::from_file(dir.path().join("missing.html")),
			Err(TemplateError::Io { .. })
		));
	}
}
