//! Layered settings for the SSR server
//!
//! Settings are merged from several [`ConfigSource`]s in ascending priority
//! order, so later layers override earlier ones:
//!
//! 1. Built-in defaults (priority 0)
//! 2. A TOML or JSON configuration file (priority 50)
//! 3. `SSR_`-prefixed environment variables (priority 100)
//!
//! ## Example
//!
//! ```no_run
//! use reinhardt_ssr_server::settings::SsrSettings;
//! use std::path::Path;
//!
//! let settings = SsrSettings::load(Some(Path::new("ssr.toml")))?;
//! println!("listening on {}", settings.bind_address);
//! # Ok::<(), reinhardt_ssr_server::settings::SettingsError>(())
//! ```

pub mod sources;

use indexmap::IndexMap;
use reinhardt_ssr_core::RenderOptions;
use reinhardt_ssr_core::template::is_valid_state_variable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use sources::{
	ConfigSource, DefaultSource, EnvSource, JsonFileSource, SourceError, TomlFileSource,
	auto_source,
};

/// Prefix of environment variables read by [`SsrSettings::load`].
pub const ENV_PREFIX: &str = "SSR_";

/// Errors raised while assembling settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	/// A source failed to load.
	#[error("failed to load {description}: {source}")]
	Source {
		/// Description of the failing source.
		description: String,
		/// Underlying error.
		#[source]
		source: SourceError,
	},

	/// The merged values do not fit the settings schema.
	#[error("invalid settings: {0}")]
	Deserialize(#[from] serde_json::Error),

	/// A value is well-typed but unusable.
	#[error("invalid setting `{key}`: {message}")]
	Invalid {
		/// Setting name.
		key: &'static str,
		/// What is wrong with it.
		message: String,
	},
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrSettings {
	/// Address the HTTP server binds to.
	pub bind_address: SocketAddr,
	/// Path of the server bundle description.
	pub bundle_path: PathBuf,
	/// Path of the client manifest; static assets are used when absent.
	pub client_manifest_path: Option<PathBuf>,
	/// Path of the document template; a minimal document is used when absent.
	pub template_path: Option<PathBuf>,
	/// Preload deadline in milliseconds; `0` disables the deadline.
	pub preload_timeout_ms: u64,
	/// Global variable receiving the serialized state.
	pub state_variable: String,
	/// Scripts referenced when no client manifest is configured.
	pub static_scripts: Vec<String>,
	/// Stylesheets referenced when no client manifest is configured.
	pub static_styles: Vec<String>,
	/// Default log filter, overridden by `RUST_LOG`.
	pub log_level: String,
	/// Time granted to in-flight connections on shutdown, in milliseconds.
	pub shutdown_timeout_ms: u64,
}

impl Default for SsrSettings {
	fn default() -> Self {
		Self {
			bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
			bundle_path: PathBuf::from("demo/server-bundle.json"),
			client_manifest_path: None,
			template_path: None,
			preload_timeout_ms: 10_000,
			state_variable: reinhardt_ssr_core::ssr::DEFAULT_STATE_VARIABLE.to_string(),
			static_scripts: Vec::new(),
			static_styles: Vec::new(),
			log_level: "info".to_string(),
			shutdown_timeout_ms: 30_000,
		}
	}
}

impl SsrSettings {
	/// Loads settings from defaults, an optional configuration file and
	/// `SSR_`-prefixed environment variables.
	pub fn load(config: Option<&Path>) -> Result<Self, SettingsError> {
		let mut builder = SettingsBuilder::new().with_defaults()?;

		if let Some(path) = config {
			let source = auto_source(path).map_err(|source| SettingsError::Source {
				description: path.display().to_string(),
				source,
			})?;
			builder = builder.add_boxed_source(source);
		}

		builder.add_source(EnvSource::new().with_prefix(ENV_PREFIX)).build()
	}

	/// Checks values that deserialize but cannot be used.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if !is_valid_state_variable(&self.state_variable) {
			return Err(SettingsError::Invalid {
				key: "state_variable",
				message: format!("`{}` is not a JavaScript identifier", self.state_variable),
			});
		}

		if self.bundle_path.as_os_str().is_empty() {
			return Err(SettingsError::Invalid {
				key: "bundle_path",
				message: "must not be empty".to_string(),
			});
		}

		Ok(())
	}

	/// The preload deadline, if any.
	pub fn preload_timeout(&self) -> Option<Duration> {
		(self.preload_timeout_ms > 0).then(|| Duration::from_millis(self.preload_timeout_ms))
	}

	/// The graceful shutdown window.
	pub fn shutdown_timeout(&self) -> Duration {
		Duration::from_millis(self.shutdown_timeout_ms)
	}

	/// Render options derived from these settings.
	pub fn render_options(&self) -> RenderOptions {
		let mut options = match self.preload_timeout() {
			Some(timeout) => RenderOptions::new().preload_timeout(timeout),
			None => RenderOptions::new().no_preload_timeout(),
		}
		.state_variable(self.state_variable.clone());

		for src in &self.static_scripts {
			options = options.static_script(src.clone());
		}
		for href in &self.static_styles {
			options = options.static_style(href.clone());
		}

		options
	}
}

/// Merges configuration sources into [`SsrSettings`].
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds the built-in defaults as the lowest priority layer.
	pub fn with_defaults(self) -> Result<Self, SettingsError> {
		let defaults = DefaultSource::from_serializable(&SsrSettings::default()).map_err(
			|source| SettingsError::Source {
				description: "Default values".to_string(),
				source,
			},
		)?;
		Ok(self.add_source(defaults))
	}

	/// Adds a source.
	pub fn add_source(self, source: impl ConfigSource + 'static) -> Self {
		self.add_boxed_source(Box::new(source))
	}

	/// Adds an already boxed source.
	pub fn add_boxed_source(mut self, source: Box<dyn ConfigSource>) -> Self {
		self.sources.push(source);
		self
	}

	/// Loads every source and merges the values by priority.
	pub fn merge(mut self) -> Result<IndexMap<String, Value>, SettingsError> {
		// Stable sort: sources with equal priority keep insertion order.
		self.sources.sort_by_key(|source| source.priority());

		let mut merged = IndexMap::new();
		for source in &self.sources {
			let values = source.load().map_err(|err| SettingsError::Source {
				description: source.description(),
				source: err,
			})?;
			tracing::debug!(
				source = %source.description(),
				keys = values.len(),
				"Loaded configuration source"
			);
			merged.extend(values);
		}

		Ok(merged)
	}

	/// Merges, deserializes and validates the settings.
	pub fn build(self) -> Result<SsrSettings, SettingsError> {
		let merged = self.merge()?;
		let object: serde_json::Map<String, Value> = merged.into_iter().collect();
		let settings: SsrSettings = serde_json::from_value(Value::Object(object))?;
		settings.validate()?;
		Ok(settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_defaults_build() {
		let settings = SettingsBuilder::new().with_defaults().unwrap().build().unwrap();

		assert_eq!(settings, SsrSettings::default());
		assert_eq!(settings.preload_timeout(), Some(Duration::from_secs(10)));
	}

	#[rstest]
	fn test_higher_priority_overrides() {
		let mut overrides = IndexMap::new();
		overrides.insert("log_level".to_string(), json!("trace"));

		struct Override(IndexMap<String, Value>);
		impl ConfigSource for Override {
			fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
				Ok(self.0.clone())
			}
			fn priority(&self) -> u8 {
				100
			}
			fn description(&self) -> String {
				"override".to_string()
			}
		}

		// Added before the defaults; priority decides, not insertion order.
		let settings = SettingsBuilder::new()
			.add_source(Override(overrides))
			.with_defaults()
			.unwrap()
			.build()
			.unwrap();

		assert_eq!(settings.log_level, "trace");
	}

	#[rstest]
	fn test_zero_timeout_disables_deadline() {
		let settings = SsrSettings {
			preload_timeout_ms: 0,
			..SsrSettings::default()
		};

		assert_eq!(settings.preload_timeout(), None);
		assert_eq!(settings.render_options().preload_timeout, None);
	}

	#[rstest]
	fn test_render_options_carry_static_assets() {
		let settings = SsrSettings {
			state_variable: "__STATE__".to_string(),
			static_scripts: vec!["/client.js".to_string()],
			static_styles: vec!["/app.css".to_string()],
			..SsrSettings::default()
		};

		let options = settings.render_options();
		assert_eq!(options.compose.state_variable, "__STATE__");
		assert_eq!(options.compose.static_scripts, vec!["/client.js".to_string()]);
		assert_eq!(options.compose.static_styles, vec!["/app.css".to_string()]);
	}

	#[rstest]
	#[case("window.x")]
	#[case("1abc")]
	#[case("")]
	fn test_invalid_state_variable_rejected(#[case] variable: &str) {
		let result = SettingsBuilder::new()
			.with_defaults()
			.unwrap()
			.add_source(DefaultSource::new().with_value("state_variable", json!(variable)))
			.build();

		assert!(matches!(
			result,
			Err(SettingsError::Invalid {
				key: "state_variable",
				..
			})
		));
	}

	#[rstest]
	fn test_type_mismatch_is_reported() {
		let result = SettingsBuilder::new()
			.with_defaults()
			.unwrap()
			.add_source(DefaultSource::new().with_value("bind_address", json!("not an address")))
			.build();

		assert!(matches!(result, Err(SettingsError::Deserialize(_))));
	}
}
