//! Server bundle loading.

use super::{App, AppFactory};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Error raised while loading a server bundle or client manifest.
#[derive(Debug, thiserror::Error)]
pub enum BundleLoadError {
	/// The file could not be read.
	#[error("failed to read {}: {source}", .path.display())]
	Io {
		/// File path.
		path: PathBuf,
		/// I/O failure.
		#[source]
		source: std::io::Error,
	},

	/// The document is not valid JSON of the expected shape.
	#[error("failed to parse {origin}: {source}")]
	Parse {
		/// File path or `<inline>`.
		origin: String,
		/// Parse failure.
		#[source]
		source: serde_json::Error,
	},

	/// The bundle names no entry module.
	#[error("bundle entry must not be empty")]
	EmptyEntry,

	/// The application uses a module the bundle does not declare.
	#[error("module `{0}` is used by the application but not declared by the bundle")]
	MissingModule(String),
}

impl BundleLoadError {
	pub(crate) fn read(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
		move |source| Self::Io {
			path: path.to_path_buf(),
			source,
		}
	}

	pub(crate) fn parse(origin: impl Into<String>) -> impl FnOnce(serde_json::Error) -> Self {
		let origin = origin.into();
		move |source| Self::Parse { origin, source }
	}
}

/// The bundle description emitted by the server build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDescriptor {
	/// Entry module identifier.
	pub entry: String,
	/// Every module identifier compiled into the bundle.
	pub modules: Vec<String>,
}

/// The immutable server bundle: application factory plus module graph.
pub struct ServerBundle {
	descriptor: BundleDescriptor,
	factory: Arc<dyn AppFactory>,
}

impl std::fmt::Debug for ServerBundle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServerBundle")
			.field("descriptor", &self.descriptor)
			.finish_non_exhaustive()
	}
}

impl ServerBundle {
	/// Creates a bundle, checking that every module the application can
	/// render is declared by the descriptor.
	pub fn new(
		descriptor: BundleDescriptor,
		factory: Arc<dyn AppFactory>,
	) -> Result<Self, BundleLoadError> {
		if descriptor.entry.trim().is_empty() {
			return Err(BundleLoadError::EmptyEntry);
		}

		if let Some(missing) = factory
			.module_ids()
			.into_iter()
			.find(|id| !descriptor.modules.contains(id))
		{
			return Err(BundleLoadError::MissingModule(missing));
		}

		tracing::info!(
			entry = %descriptor.entry,
			modules = descriptor.modules.len(),
			"Server bundle loaded"
		);

		Ok(Self {
			descriptor,
			factory,
		})
	}

	/// Parses a bundle description from JSON.
	pub fn from_json(json: &str, factory: Arc<dyn AppFactory>) -> Result<Self, BundleLoadError> {
		let descriptor = serde_json::from_str(json).map_err(BundleLoadError::parse("<inline>"))?;
		Self::new(descriptor, factory)
	}

	/// Reads a bundle description from a JSON file.
	pub fn from_file(
		path: impl AsRef<Path>,
		factory: Arc<dyn AppFactory>,
	) -> Result<Self, BundleLoadError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(BundleLoadError::read(path))?;
		let descriptor = serde_json::from_str(&content)
			.map_err(BundleLoadError::parse(path.display().to_string()))?;
		Self::new(descriptor, factory)
	}

	/// Entry module identifier.
	pub fn entry(&self) -> &str {
		&self.descriptor.entry
	}

	/// Declared module identifiers.
	pub fn modules(&self) -> &[String] {
		&self.descriptor.modules
	}

	/// Returns true if the module is declared.
	pub fn has_module(&self, module_id: &str) -> bool {
		self.descriptor.modules.iter().any(|m| m == module_id)
	}

	/// Builds a fresh application instance.
	pub fn create_app(&self) -> App {
		self.factory.create_app()
	}
}
