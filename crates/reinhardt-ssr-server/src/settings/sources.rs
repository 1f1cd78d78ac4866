//! Configuration sources for layered settings
//!
//! Sources are merged in priority order: environment variables override
//! configuration files, which override defaults.

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Keys whose environment values are comma-separated lists.
const LIST_KEYS: &[&str] = &["static_scripts", "static_styles"];

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
	/// Load configuration from this source
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Error type for configuration sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	/// The source file could not be read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// The source has an unexpected shape.
	#[error("Parse error: {0}")]
	Parse(String),

	/// Invalid TOML.
	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Invalid JSON.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// The source cannot be used, e.g. for an unknown file extension.
	#[error("Invalid source: {0}")]
	InvalidSource(String),
}

/// Environment variable configuration source
pub struct EnvSource {
	prefix: Option<String>,
}

impl EnvSource {
	/// Create a new environment variable configuration source
	pub fn new() -> Self {
		Self { prefix: None }
	}

	/// Set a prefix filter for environment variables
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_ssr_server::settings::sources::EnvSource;
	///
	/// let source = EnvSource::new().with_prefix("SSR_");
	/// ```
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let mut config = IndexMap::new();

		for (key, value) in std::env::vars() {
			let clean_key = match &self.prefix {
				Some(prefix) => match key.strip_prefix(prefix.as_str()) {
					Some(stripped) => stripped,
					None => continue,
				},
				None => key.as_str(),
			};

			let lower_key = clean_key.to_lowercase();
			config.insert(lower_key.clone(), parse_env_value(&lower_key, value));
		}

		Ok(config)
	}

	fn priority(&self) -> u8 {
		100
	}

	fn description(&self) -> String {
		match &self.prefix {
			Some(prefix) => format!("Environment variables (prefix: {})", prefix),
			None => "Environment variables".to_string(),
		}
	}
}

fn parse_env_value(key: &str, value: String) -> Value {
	if LIST_KEYS.contains(&key) {
		return Value::Array(
			value
				.split(',')
				.map(str::trim)
				.filter(|s| !s.is_empty())
				.map(|s| Value::String(s.to_string()))
				.collect(),
		);
	}

	if let Ok(num) = value.parse::<i64>() {
		Value::Number(num.into())
	} else if let Ok(b) = value.parse::<bool>() {
		Value::Bool(b)
	} else {
		Value::String(value)
	}
}

/// TOML file configuration source
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;
		let json_value = serde_json::to_value(toml_value)?;
		into_map(json_value)
	}

	fn priority(&self) -> u8 {
		50
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// JSON file configuration source
pub struct JsonFileSource {
	path: PathBuf,
}

impl JsonFileSource {
	/// Create a new JSON file configuration source
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for JsonFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let content = fs::read_to_string(&self.path)?;
		let json_value: Value = serde_json::from_str(&content)?;
		into_map(json_value)
	}

	fn priority(&self) -> u8 {
		50
	}

	fn description(&self) -> String {
		format!("JSON file: {}", self.path.display())
	}
}

fn into_map(value: Value) -> Result<IndexMap<String, Value>, SourceError> {
	match value {
		Value::Object(map) => Ok(map.into_iter().collect()),
		_ => Err(SourceError::Parse("Expected object at root".to_string())),
	}
}

/// Default values configuration source
#[derive(Default)]
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create a new default values configuration source
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a default value for a configuration key
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}

	/// Add every field of a serializable value as a default
	pub fn from_serializable(value: &impl serde::Serialize) -> Result<Self, SourceError> {
		Ok(Self {
			values: into_map(serde_json::to_value(value)?)?,
		})
	}
}

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0
	}

	fn description(&self) -> String {
		"Default values".to_string()
	}
}

/// Auto-detect configuration source based on file extension
pub fn auto_source(path: impl AsRef<Path>) -> Result<Box<dyn ConfigSource>, SourceError> {
	let path = path.as_ref();
	let ext = path
		.extension()
		.and_then(|e| e.to_str())
		.ok_or_else(|| SourceError::InvalidSource("No file extension".to_string()))?;

	match ext {
		"toml" => Ok(Box::new(TomlFileSource::new(path))),
		"json" => Ok(Box::new(JsonFileSource::new(path))),
		_ => Err(SourceError::InvalidSource(format!(
			"Unsupported file extension: {}",
			ext
		))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use std::env;
	use std::fs::File;
	use std::io::Write;
	use tempfile::TempDir;

	#[rstest]
	#[serial(env)]
	fn test_env_source_with_prefix() {
		// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			env::set_var("SSR_TEST_PRELOAD_TIMEOUT_MS", "2500");
			env::set_var("SSR_TEST_STATE_VARIABLE", "__STATE__");
			env::set_var("SSR_STATIC_SCRIPTS", "/a.js, /b.js");
			env::set_var("UNPREFIXED_SSR_VALUE", "ignored");
		}

		let config = EnvSource::new().with_prefix("SSR_").load().unwrap();

		assert_eq!(config.get("test_preload_timeout_ms"), Some(&Value::from(2500)));
		assert_eq!(
			config.get("test_state_variable"),
			Some(&Value::String("__STATE__".to_string()))
		);
		assert_eq!(
			config.get("static_scripts"),
			Some(&serde_json::json!(["/a.js", "/b.js"]))
		);
		assert!(!config.contains_key("unprefixed_ssr_value"));

		// SAFETY: Removing environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			env::remove_var("SSR_TEST_PRELOAD_TIMEOUT_MS");
			env::remove_var("SSR_TEST_STATE_VARIABLE");
			env::remove_var("SSR_STATIC_SCRIPTS");
			env::remove_var("UNPREFIXED_SSR_VALUE");
		}
	}

	#[rstest]
	fn test_toml_source() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("ssr.toml");

		let mut file = File::create(&config_path).unwrap();
		writeln!(
			file,
			r#"
bind_address = "0.0.0.0:8080"
preload_timeout_ms = 500
static_scripts = ["/client.js"]
"#
		)
		.unwrap();

		let config = TomlFileSource::new(&config_path).load().unwrap();

		assert_eq!(
			config.get("bind_address"),
			Some(&Value::String("0.0.0.0:8080".to_string()))
		);
		assert_eq!(config.get("preload_timeout_ms"), Some(&Value::from(500)));
		assert_eq!(config.get("static_scripts"), Some(&serde_json::json!(["/client.js"])));
	}

	#[rstest]
	fn test_json_source() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("ssr.json");
		std::fs::write(&config_path, r#"{"log_level": "debug"}"#).unwrap();

		let config = JsonFileSource::new(&config_path).load().unwrap();
		assert_eq!(
			config.get("log_level"),
			Some(&Value::String("debug".to_string()))
		);
	}

	#[rstest]
	fn test_json_source_rejects_non_object() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("ssr.json");
		std::fs::write(&config_path, "[1, 2]").unwrap();

		assert!(matches!(
			JsonFileSource::new(&config_path).load(),
			Err(SourceError::Parse(_))
		));
	}

	#[rstest]
	fn test_missing_file_is_an_error() {
		assert!(matches!(
			TomlFileSource::new("/nonexistent/ssr.toml").load(),
			Err(SourceError::Io(_))
		));
	}

	#[rstest]
	#[case("ssr.toml", true)]
	#[case("ssr.json", true)]
	#[case("ssr.yaml", false)]
	#[case("ssr", false)]
	fn test_auto_source(#[case] file: &str, #[case] supported: bool) {
		assert_eq!(auto_source(file).is_ok(), supported);
	}

	#[rstest]
	fn test_source_priority() {
		assert_eq!(EnvSource::new().priority(), 100);
		assert_eq!(TomlFileSource::new("ssr.toml").priority(), 50);
		assert_eq!(JsonFileSource::new("ssr.json").priority(), 50);
		assert_eq!(DefaultSource::new().priority(), 0);
	}
}
