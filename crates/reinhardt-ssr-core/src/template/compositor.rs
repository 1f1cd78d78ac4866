//! Merging rendered output into a template.

use super::{Segment, Slot, Template, TemplateError};
use crate::bundle::{AssetKind, ClientManifest};
use crate::ssr::{DEFAULT_STATE_VARIABLE, StatePayload};
use crate::view::html_escape;

/// Options for composing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
	/// Global variable receiving the serialized state.
	pub state_variable: String,
	/// Scripts referenced when no client manifest is available.
	pub static_scripts: Vec<String>,
	/// Stylesheets referenced when no client manifest is available.
	pub static_styles: Vec<String>,
}

impl Default for ComposeOptions {
	fn default() -> Self {
		Self {
			state_variable: DEFAULT_STATE_VARIABLE.to_string(),
			static_scripts: Vec::new(),
			static_styles: Vec::new(),
		}
	}
}

/// Returns true if `name` can be used as `window.<name>`.
pub fn is_valid_state_variable(name: &str) -> bool {
	let mut chars = name.chars();
	matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[derive(Default)]
struct AssetTags {
	head: String,
	body: String,
}

impl AssetTags {
	fn from_manifest(manifest: &ClientManifest, used_modules: &[String]) -> Self {
		let mut tags = Self::default();

		for asset in manifest.assets_for(used_modules) {
			let href = manifest.url_for(asset);
			let url = html_escape(&href);
			match asset.kind {
				AssetKind::Style => {
					tags.head
						.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">", url));
				}
				AssetKind::Preload => {
					tags.head.push_str(&format!(
						"<link rel=\"preload\" href=\"{}\" as=\"{}\">",
						url,
						asset.preload_as()
					));
				}
				AssetKind::Script => {
					tags.body
						.push_str(&format!("<script src=\"{}\" defer></script>", url));
				}
			}
		}

		tags
	}

	fn from_static(options: &ComposeOptions) -> Self {
		let mut tags = Self::default();

		for href in &options.static_styles {
			tags.head.push_str(&format!(
				"<link rel=\"stylesheet\" href=\"{}\">",
				html_escape(href)
			));
		}
		for src in &options.static_scripts {
			tags.body.push_str(&format!(
				"<script src=\"{}\" defer></script>",
				html_escape(src)
			));
		}

		tags
	}
}

/// Composes the response document.
///
/// With a manifest, asset tags cover the initial assets plus the assets of
/// `used_modules`; without one, the static assets of `options` are used.
pub fn compose(
	template: &Template,
	markup: &str,
	state: &StatePayload,
	used_modules: &[String],
	manifest: Option<&ClientManifest>,
	options: &ComposeOptions,
) -> Result<String, TemplateError> {
	if !is_valid_state_variable(&options.state_variable) {
		return Err(TemplateError::InvalidStateVariable(
			options.state_variable.clone(),
		));
	}

	let state_script = state.to_script_tag(&options.state_variable)?;
	let assets = match manifest {
		Some(manifest) => AssetTags::from_manifest(manifest, used_modules),
		None => AssetTags::from_static(options),
	};

	let mut document = String::with_capacity(
		template.text_len()
			+ markup.len()
			+ state_script.len()
			+ assets.head.len()
			+ assets.body.len(),
	);

	for segment in template.segments() {
		match segment {
			Segment::Text(text) => document.push_str(text),
			Segment::Slot(Slot::Outlet) => document.push_str(markup),
			Segment::Slot(Slot::HeadAssets) => document.push_str(&assets.head),
			Segment::Slot(Slot::State) => document.push_str(&state_script),
			Segment::Slot(Slot::BodyAssets) => document.push_str(&assets.body),
		}
	}

	Ok(document)
}
