//! Server bundle and client manifest.
//!
//! The [`ServerBundle`] couples an [`AppFactory`] with the module graph the
//! build emitted for it; the [`ClientManifest`] maps those modules to the
//! client assets a document must reference. Both are loaded once at startup
//! and shared immutably.

mod manifest;
mod server;

use crate::component::Component;
use crate::router::{RouteTable, Router};
use crate::store::{Store, StoreDefinition};
use std::sync::Arc;

pub use manifest::{AssetDescriptor, AssetKind, ClientManifest};
pub use server::{BundleDescriptor, BundleLoadError, ServerBundle};

/// A per-request application instance.
#[derive(Debug)]
pub struct App {
	/// The root component; route output renders into its outlet.
	pub root: Arc<dyn Component>,
	/// The request's router.
	pub router: Router,
	/// The request's store.
	pub store: Store,
}

/// Builds fresh application instances.
pub trait AppFactory: Send + Sync {
	/// Creates a new instance with its own router and store.
	fn create_app(&self) -> App;

	/// Every module identifier the application can render.
	fn module_ids(&self) -> Vec<String>;
}

/// [`AppFactory`] assembled from a root component, routes and a store.
#[derive(Debug, Clone)]
pub struct ApplicationFactory {
	root: Arc<dyn Component>,
	routes: Arc<RouteTable>,
	store: Arc<StoreDefinition>,
}

impl ApplicationFactory {
	/// Creates a factory.
	pub fn new(
		root: Arc<dyn Component>,
		routes: Arc<RouteTable>,
		store: Arc<StoreDefinition>,
	) -> Self {
		Self {
			root,
			routes,
			store,
		}
	}

	/// The shared route table.
	pub fn routes(&self) -> &Arc<RouteTable> {
		&self.routes
	}
}

impl AppFactory for ApplicationFactory {
	fn create_app(&self) -> App {
		App {
			root: Arc::clone(&self.root),
			router: Router::new(Arc::clone(&self.routes)),
			store: self.store.instantiate(),
		}
	}

	fn module_ids(&self) -> Vec<String> {
		let mut ids = vec![self.root.module_id().to_string()];
		for id in self.routes.module_ids() {
			if !ids.contains(&id) {
				ids.push(id);
			}
		}
		ids
	}
}
