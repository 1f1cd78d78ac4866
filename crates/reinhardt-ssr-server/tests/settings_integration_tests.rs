//! Settings Integration Tests
//!
//! Layering of defaults, configuration files and environment variables.
//!
//! Test Categories:
//! - Category 1: File Layering
//! - Category 2: Environment Overrides

use reinhardt_ssr_server::SsrSettings;
use reinhardt_ssr_server::settings::SettingsError;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Category 1: File Layering
// ============================================================================

/// Tests that a TOML file overrides defaults key by key
#[rstest]
#[serial(env)]
fn test_toml_file_overrides_defaults() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("ssr.toml");
	std::fs::write(
		&path,
		r#"
bind_address = "0.0.0.0:8080"
preload_timeout_ms = 250
static_scripts = ["/client.js"]
"#,
	)
	.unwrap();

	let settings = SsrSettings::load(Some(&path)).unwrap();

	assert_eq!(settings.bind_address, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
	assert_eq!(settings.preload_timeout(), Some(Duration::from_millis(250)));
	assert_eq!(settings.static_scripts, vec!["/client.js".to_string()]);
	assert_eq!(settings.log_level, "info");
	assert_eq!(settings.client_manifest_path, None);
}

/// Tests that a JSON file is accepted as well
#[rstest]
#[serial(env)]
fn test_json_file() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("ssr.json");
	std::fs::write(
		&path,
		r#"{"client_manifest_path": "dist/client-manifest.json", "log_level": "debug"}"#,
	)
	.unwrap();

	let settings = SsrSettings::load(Some(&path)).unwrap();

	assert_eq!(
		settings.client_manifest_path,
		Some(PathBuf::from("dist/client-manifest.json"))
	);
	assert_eq!(settings.log_level, "debug");
}

/// Tests that an unreadable configuration file is reported with its source
#[rstest]
#[serial(env)]
fn test_missing_file_is_reported() {
	let result = SsrSettings::load(Some(std::path::Path::new("/nonexistent/ssr.toml")));

	match result {
		Err(SettingsError::Source { description, .. }) => {
			assert!(description.contains("/nonexistent/ssr.toml"));
		}
		other => panic!("unexpected result: {:?}", other),
	}
}

// ============================================================================
// Category 2: Environment Overrides
// ============================================================================

/// Tests that SSR_ environment variables override the configuration file
#[rstest]
#[serial(env)]
fn test_environment_overrides_file() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("ssr.toml");
	std::fs::write(&path, "state_variable = \"__FROM_FILE__\"\npreload_timeout_ms = 250\n")
		.unwrap();

	// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
	// This test uses #[serial] to ensure exclusive access to environment variables.
	unsafe {
		env::set_var("SSR_STATE_VARIABLE", "__FROM_ENV__");
		env::set_var("SSR_PRELOAD_TIMEOUT_MS", "0");
		env::set_var("SSR_STATIC_STYLES", "/a.css,/b.css");
	}

	let result = SsrSettings::load(Some(&path));

	// SAFETY: Removing environment variables is unsafe in multi-threaded programs.
	// This test uses #[serial] to ensure exclusive access to environment variables.
	unsafe {
		env::remove_var("SSR_STATE_VARIABLE");
		env::remove_var("SSR_PRELOAD_TIMEOUT_MS");
		env::remove_var("SSR_STATIC_STYLES");
	}

	let settings = result.unwrap();
	assert_eq!(settings.state_variable, "__FROM_ENV__");
	assert_eq!(settings.preload_timeout(), None);
	assert_eq!(
		settings.static_styles,
		vec!["/a.css".to_string(), "/b.css".to_string()]
	);
}

/// Tests that an invalid environment value fails validation
#[rstest]
#[serial(env)]
fn test_invalid_environment_value() {
	// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
	// This test uses #[serial] to ensure exclusive access to environment variables.
	unsafe {
		env::set_var("SSR_STATE_VARIABLE", "window.state");
	}

	let result = SsrSettings::load(None);

	// SAFETY: Removing environment variables is unsafe in multi-threaded programs.
	// This test uses #[serial] to ensure exclusive access to environment variables.
	unsafe {
		env::remove_var("SSR_STATE_VARIABLE");
	}

	assert!(matches!(result, Err(SettingsError::Invalid { .. })));
}
