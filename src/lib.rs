//! # Reinhardt SSR
//!
//! Server-side rendering with client hydration handoff.
//!
//! For every request a fresh application instance resolves the URL to a
//! component chain, runs the data hooks of the matched components
//! concurrently, renders markup from the populated store and composes a
//! document embedding a snapshot of that store for the client to hydrate
//! from.
//!
//! ## Feature Flags
//!
//! - `server` (default) - the HTTP boundary, layered settings and the
//!   `reinhardt-ssr` binary ([`server`])
//!
//! The rendering pipeline is always available. Build with
//! `default-features = false` to depend on it alone.
//!
//! ## Quick Start
//!
//! ```ignore
//! use reinhardt_ssr::prelude::*;
//! use std::sync::Arc;
//!
//! let bundle = Arc::new(ServerBundle::from_file("demo/server-bundle.json", factory)?);
//! let renderer = BundleRenderer::new(bundle, RenderOptions::new());
//! let html = renderer.render_document("/").await?;
//! ```

pub use reinhardt_ssr_core::*;

#[cfg(feature = "server")]
pub use reinhardt_ssr_server as server;

/// Commonly used types.
pub mod prelude {
	pub use reinhardt_ssr_core::{
		App, AppFactory, ApplicationFactory, BoxError, BundleRenderer, ClientManifest, Component,
		ComponentRef, IntoView, LoadContext, Loadable, RenderError, RenderOptions, RenderScope,
		RouteDescriptor, RouteTable, ServerBundle, SsrError, Store, StoreDefinition, Template, View,
	};

	#[cfg(feature = "server")]
	pub use reinhardt_ssr_server::{
		HttpServer, ShutdownCoordinator, SsrApplication, SsrHandler, SsrSettings,
	};
}

#[cfg(test)]
mod tests {
	use super::prelude::RouteTable;

	#[test]
	fn test_core_is_reexported_without_features() {
		let table = RouteTable::new(Vec::new()).unwrap();
		let router = crate::router::Router::new(std::sync::Arc::new(table));
		assert!(router.current().is_none());
		assert_eq!(crate::router::Location::parse("/b%61r").path(), "/bar");
	}

	#[cfg(feature = "server")]
	#[test]
	fn test_server_reexported_with_feature() {
		let settings = crate::server::SsrSettings::default();
		assert!(!settings.state_variable.is_empty());
	}
}
