//! Reinhardt SSR Server - HTTP boundary for the SSR renderer
//!
//! Wraps a [`BundleRenderer`](reinhardt_ssr_core::BundleRenderer) in a
//! hyper server: one render per request, status codes derived from the
//! render outcome, and graceful shutdown on Ctrl-C.
//!
//! ## Modules
//!
//! - [`settings`]: layered configuration (defaults, file, environment)
//! - [`app`]: startup wiring from settings to a shared renderer
//! - [`handler`]: request handling and error responses
//! - [`http`]: the server loop
//! - [`shutdown`]: shutdown coordination
//! - [`demo`]: the built-in demo application

#![warn(missing_docs)]

pub mod app;
pub mod demo;
pub mod handler;
pub mod http;
pub mod logging;
pub mod settings;
pub mod shutdown;

pub use crate::app::{SsrApplication, StartupError};
pub use crate::handler::{Handler, SsrHandler};
pub use crate::http::{HttpServer, serve, serve_with_shutdown};
pub use crate::logging::init_logging;
pub use crate::settings::{SettingsError, SsrSettings};
pub use crate::shutdown::{ShutdownCoordinator, shutdown_signal};
