//! Reinhardt SSR Core - per-request server-side rendering orchestration
//!
//! Renders an application to HTML on the server and prepares the document
//! for client-side hydration.
//!
//! ## Architecture
//!
//! - [`router`]: URL to component chain resolution with lazy components
//! - [`store`]: keyed state container with mutations and actions
//! - [`component`]: the component and data hook contract
//! - [`ssr`]: data preloading, state serialization and the bundle renderer
//! - [`bundle`]: server bundle and client manifest loading
//! - [`template`]: document templates and composition
//!
//! ## Request Flow
//!
//! ```text
//! URL -> fresh App -> resolve chain -> preload -> render -> snapshot -> compose
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_ssr_core::{BundleRenderer, RenderOptions, ServerBundle};
//! use std::sync::Arc;
//!
//! let bundle = Arc::new(ServerBundle::from_file("dist/server-bundle.json", factory)?);
//! let renderer = BundleRenderer::new(bundle, RenderOptions::new());
//!
//! match renderer.render_document("/").await {
//!     Ok(html) => respond(200, html),
//!     Err(err) => respond(err.status_code(), err.to_string()),
//! }
//! ```

#![warn(missing_docs)]

pub mod bundle;
pub mod component;
pub mod error;
pub mod router;
pub mod ssr;
pub mod store;
pub mod template;
pub mod view;

pub use bundle::{
	App, AppFactory, ApplicationFactory, AssetDescriptor, AssetKind, BundleDescriptor,
	BundleLoadError, ClientManifest, ServerBundle,
};
pub use component::{
	BoxError, Component, LoadContext, Loadable, RenderError, RenderScope,
};
pub use error::SsrError;
pub use router::{
	ComponentChain, ComponentRef, LazyComponent, ResolveError, RouteDescriptor, RouteTable, Router,
};
pub use ssr::{
	BundleRenderer, PreloadError, RenderContext, RenderOptions, RenderOutput, RequestPhase,
	StatePayload,
};
pub use store::{ActionContext, Store, StoreDefinition, StoreError};
pub use template::{ComposeOptions, Template, TemplateError};
pub use view::{IntoView, View};
