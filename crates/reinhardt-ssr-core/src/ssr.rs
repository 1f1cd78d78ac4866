//! Server-side rendering orchestration.
//!
//! For every request the [`BundleRenderer`] builds a fresh application
//! instance, resolves the URL to a component chain, runs the chain's data
//! hooks concurrently, snapshots the resulting state and renders markup.
//! [`BundleRenderer::render_document`] additionally merges the output into
//! the document template.
//!
//! ## Request lifecycle
//!
//! 1. `Received`: a [`RenderContext`] is created for the URL
//! 2. `Resolving`: the router loads any lazy components on the branch
//! 3. `NotFound` or `Preloading`: [`preload`] awaits every data hook
//! 4. `Failed` or `Rendered`: the chain renders innermost first
//! 5. `Composed`: the template compositor emits the document
//! 6. `Sent`: the transport has written the response

mod context;
mod preload;
pub mod renderer;
mod state;

pub use context::{RenderContext, RequestPhase};
pub use preload::{PreloadError, preload};
pub use renderer::{
	BundleRenderer, DEFAULT_PRELOAD_TIMEOUT, ModuleTracker, RenderOptions, RenderOutput,
};
pub use state::{DEFAULT_STATE_VARIABLE, StatePayload, serialize};
