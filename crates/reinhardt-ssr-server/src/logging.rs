//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(default_level: &str) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	let result = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(true)
		.try_init();

	if result.is_err() {
		tracing::debug!("Tracing subscriber already installed");
	}
}
