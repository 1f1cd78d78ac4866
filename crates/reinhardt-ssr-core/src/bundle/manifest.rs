//! Client asset manifest.

use super::BundleLoadError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// How an asset is referenced from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
	/// `<script defer>` in the body.
	Script,
	/// `<link rel="stylesheet">` in the head.
	Style,
	/// `<link rel="preload">` in the head.
	Preload,
}

/// A single client asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetDescriptor {
	/// File path relative to the public path.
	pub file: String,
	/// Reference kind.
	#[serde(rename = "type")]
	pub kind: AssetKind,
}

impl AssetDescriptor {
	/// Creates an asset descriptor.
	pub fn new(file: impl Into<String>, kind: AssetKind) -> Self {
		Self {
			file: file.into(),
			kind,
		}
	}

	/// The `as` attribute value for a preload link, derived from the extension.
	pub fn preload_as(&self) -> &'static str {
		let extension = self
			.file
			.split(['?', '#'])
			.next()
			.and_then(|path| path.rsplit_once('.'))
			.map(|(_, ext)| ext.to_ascii_lowercase());

		match extension.as_deref() {
			Some("js" | "mjs") => "script",
			Some("css") => "style",
			Some("woff" | "woff2" | "ttf" | "otf") => "font",
			Some("png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif") => "image",
			_ => "fetch",
		}
	}
}

/// Mapping from module identifiers to client assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientManifest {
	/// Prefix prepended to every asset file.
	#[serde(default = "default_public_path")]
	pub public_path: String,
	/// Assets every document references.
	#[serde(default)]
	pub initial: Vec<AssetDescriptor>,
	/// Assets per module identifier.
	#[serde(default)]
	pub modules: IndexMap<String, Vec<AssetDescriptor>>,
}

fn default_public_path() -> String {
	"/".to_string()
}

impl Default for ClientManifest {
	fn default() -> Self {
		Self {
			public_path: default_public_path(),
			initial: Vec::new(),
			modules: IndexMap::new(),
		}
	}
}

impl ClientManifest {
	/// Parses a manifest from JSON.
	pub fn from_json(json: &str) -> Result<Self, BundleLoadError> {
		serde_json::from_str(json).map_err(BundleLoadError::parse("<inline>"))
	}

	/// Reads a manifest from a JSON file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BundleLoadError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(BundleLoadError::read(path))?;
		let manifest: Self = serde_json::from_str(&content)
			.map_err(BundleLoadError::parse(path.display().to_string()))?;

		tracing::info!(
			path = %path.display(),
			modules = manifest.modules.len(),
			"Client manifest loaded"
		);
		Ok(manifest)
	}

	/// Assets for a render: the initial assets followed by the assets of
	/// each used module in order, without duplicates.
	///
	/// Modules without an entry contribute nothing.
	pub fn assets_for<S: AsRef<str>>(&self, used_modules: &[S]) -> Vec<&AssetDescriptor> {
		let mut seen = HashSet::new();
		let module_assets = used_modules.iter().filter_map(|id| {
			let assets = self.modules.get(id.as_ref());
			if assets.is_none() {
				tracing::trace!(module = id.as_ref(), "Module has no client assets");
			}
			assets
		});

		self.initial
			.iter()
			.chain(module_assets.flatten())
			.filter(|asset| seen.insert(*asset))
			.collect()
	}

	/// The public URL of an asset.
	pub fn url_for(&self, asset: &AssetDescriptor) -> String {
		let file = asset.file.as_str();
		if file.starts_with('/') || file.contains("://") {
			return file.to_string();
		}
		format!(
			"{}/{}",
			self.public_path.trim_end_matches('/'),
			file.trim_start_matches("./")
		)
	}
}
