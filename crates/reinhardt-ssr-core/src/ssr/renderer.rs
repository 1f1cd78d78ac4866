//! Bundle renderer driving a single request from URL to document.

use super::context::{RenderContext, RequestPhase};
use super::preload::preload;
use super::state::{self, StatePayload};
use crate::bundle::{App, ClientManifest, ServerBundle};
use crate::component::{Component, RenderError, RenderScope};
use crate::error::SsrError;
use crate::router::ComponentChain;
use crate::template::{ComposeOptions, Template, compose};
use crate::view::View;
use indexmap::IndexSet;
use std::sync::Arc;
use std::time::Duration;

/// Default preload timeout.
pub const DEFAULT_PRELOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Ordered, de-duplicated set of module identifiers used by a render.
#[derive(Debug, Clone, Default)]
pub struct ModuleTracker {
	modules: IndexSet<String>,
}

impl ModuleTracker {
	/// Creates an empty tracker.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a module, keeping first-use order.
	pub fn record(&mut self, module_id: &str) {
		if !self.modules.contains(module_id) {
			self.modules.insert(module_id.to_string());
		}
	}

	/// Returns true if the module has been recorded.
	pub fn contains(&self, module_id: &str) -> bool {
		self.modules.contains(module_id)
	}

	/// Number of recorded modules.
	pub fn len(&self) -> usize {
		self.modules.len()
	}

	/// Returns true if nothing has been recorded.
	pub fn is_empty(&self) -> bool {
		self.modules.is_empty()
	}

	/// Returns the modules in first-use order.
	pub fn into_vec(self) -> Vec<String> {
		self.modules.into_iter().collect()
	}
}

/// Options for rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
	/// Upper bound on the preload barrier; `None` waits indefinitely.
	pub preload_timeout: Option<Duration>,
	/// Options forwarded to the template compositor.
	pub compose: ComposeOptions,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self {
			preload_timeout: Some(DEFAULT_PRELOAD_TIMEOUT),
			compose: ComposeOptions::default(),
		}
	}
}

impl RenderOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the preload timeout.
	pub fn preload_timeout(mut self, timeout: Duration) -> Self {
		self.preload_timeout = Some(timeout);
		self
	}

	/// Disables the preload timeout.
	pub fn no_preload_timeout(mut self) -> Self {
		self.preload_timeout = None;
		self
	}

	/// Sets the global variable receiving the serialized state.
	pub fn state_variable(mut self, variable: impl Into<String>) -> Self {
		self.compose.state_variable = variable.into();
		self
	}

	/// Adds a script used when no client manifest is configured.
	pub fn static_script(mut self, src: impl Into<String>) -> Self {
		self.compose.static_scripts.push(src.into());
		self
	}

	/// Adds a stylesheet used when no client manifest is configured.
	pub fn static_style(mut self, href: impl Into<String>) -> Self {
		self.compose.static_styles.push(href.into());
		self
	}
}

/// Result of rendering one URL.
#[derive(Debug, Clone)]
pub struct RenderOutput {
	/// Rendered application markup.
	pub markup: String,
	/// State snapshot taken after preloading.
	pub state: StatePayload,
	/// Modules rendered, in first-use order.
	pub used_modules: Vec<String>,
}

/// Renders requests against an immutable server bundle.
///
/// The renderer is shared across requests; every call builds its own
/// application instance, so concurrent renders never share a store.
///
/// # Example
///
/// ```ignore
/// let renderer = BundleRenderer::new(bundle, RenderOptions::new())
///     .with_template(template)
///     .with_client_manifest(manifest);
///
/// let html = renderer.render_document("/").await?;
/// ```
#[derive(Debug, Clone)]
pub struct BundleRenderer {
	bundle: Arc<ServerBundle>,
	template: Arc<Template>,
	manifest: Option<Arc<ClientManifest>>,
	options: RenderOptions,
}

impl BundleRenderer {
	/// Creates a renderer with the default template and no client manifest.
	pub fn new(bundle: Arc<ServerBundle>, options: RenderOptions) -> Self {
		Self {
			bundle,
			template: Arc::new(Template::default()),
			manifest: None,
			options,
		}
	}

	/// Sets the document template.
	pub fn with_template(mut self, template: Arc<Template>) -> Self {
		self.template = template;
		self
	}

	/// Sets the client manifest used to compute asset tags.
	pub fn with_client_manifest(mut self, manifest: Arc<ClientManifest>) -> Self {
		self.manifest = Some(manifest);
		self
	}

	/// The server bundle.
	pub fn bundle(&self) -> &Arc<ServerBundle> {
		&self.bundle
	}

	/// The render options.
	pub fn options(&self) -> &RenderOptions {
		&self.options
	}

	/// Renders `url` to markup and state.
	pub async fn render(&self, url: &str) -> Result<RenderOutput, SsrError> {
		let mut ctx = RenderContext::new(url);
		self.render_with_context(&mut ctx).await
	}

	/// Renders the request described by `ctx`, recording phases on it.
	pub async fn render_with_context(
		&self,
		ctx: &mut RenderContext,
	) -> Result<RenderOutput, SsrError> {
		let mut app = self.bundle.create_app();
		let result = self.drive(&mut app, ctx).await;

		if let Ok(output) = &result {
			ctx.attach_state(output.state.clone());
		}
		ctx.attach_app(app);

		result
	}

	/// Renders `url` to a complete HTML document.
	pub async fn render_document(&self, url: &str) -> Result<String, SsrError> {
		let mut ctx = RenderContext::new(url);
		self.render_document_with_context(&mut ctx).await
	}

	/// Renders and composes the request described by `ctx`.
	pub async fn render_document_with_context(
		&self,
		ctx: &mut RenderContext,
	) -> Result<String, SsrError> {
		let output = self.render_with_context(ctx).await?;

		let composed = compose(
			&self.template,
			&output.markup,
			&output.state,
			&output.used_modules,
			self.manifest.as_deref(),
			&self.options.compose,
		);

		match composed {
			Ok(document) => {
				ctx.advance(RequestPhase::Composed);
				Ok(document)
			}
			Err(err) => {
				ctx.advance(RequestPhase::Failed);
				tracing::error!(url = %ctx.url(), error = %err, "Template composition failed");
				Err(err.into())
			}
		}
	}

	async fn drive(&self, app: &mut App, ctx: &mut RenderContext) -> Result<RenderOutput, SsrError> {
		ctx.advance(RequestPhase::Resolving);
		app.router.push(ctx.url());

		let chain = match app.router.ready().await {
			Ok(chain) => chain,
			Err(err) => {
				ctx.advance(RequestPhase::Failed);
				tracing::error!(url = %ctx.url(), error = %err, "Route resolution failed");
				return Err(err.into());
			}
		};

		if chain.is_empty() {
			ctx.advance(RequestPhase::NotFound);
			tracing::info!(url = %ctx.url(), "No route matched");
			return Err(SsrError::NotFound(chain.path().to_string()));
		}

		ctx.advance(RequestPhase::Preloading);
		if let Err(err) = preload(&chain, &app.store, self.options.preload_timeout).await {
			ctx.advance(RequestPhase::Failed);
			return Err(err.into());
		}

		let state = state::serialize(&app.store);

		let mut modules = ModuleTracker::new();
		modules.record(app.root.module_id());
		for component in chain.iter() {
			modules.record(component.module_id());
		}

		let markup = match render_chain(app.root.as_ref(), &chain, &state, &mut modules) {
			Ok(markup) => markup,
			Err(err) => {
				ctx.advance(RequestPhase::Failed);
				tracing::error!(url = %ctx.url(), error = %err, "Render failed");
				return Err(err.into());
			}
		};

		ctx.advance(RequestPhase::Rendered);
		tracing::debug!(
			url = %ctx.url(),
			modules = modules.len(),
			bytes = markup.len(),
			"Render complete"
		);

		Ok(RenderOutput {
			markup,
			state,
			used_modules: modules.into_vec(),
		})
	}
}

/// Renders the chain innermost first, feeding each result to its parent's
/// outlet, and finally the root.
fn render_chain(
	root: &dyn Component,
	chain: &ComponentChain,
	state: &StatePayload,
	modules: &mut ModuleTracker,
) -> Result<String, RenderError> {
	let mut outlet = View::Empty;

	for component in chain.iter().rev() {
		let mut scope = RenderScope::new(state, chain.params(), outlet, modules);
		outlet = component.render(&mut scope)?;
	}

	let mut scope = RenderScope::new(state, chain.params(), outlet, modules);
	Ok(root.render(&mut scope)?.render_to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ssr::DEFAULT_STATE_VARIABLE;
	use rstest::rstest;

	#[rstest]
	fn test_module_tracker_keeps_first_use_order() {
		let mut tracker = ModuleTracker::new();
		tracker.record("app");
		tracker.record("foo");
		tracker.record("app");
		tracker.record("bar");

		assert_eq!(tracker.len(), 3);
		assert!(tracker.contains("foo"));
		assert_eq!(tracker.into_vec(), vec!["app", "foo", "bar"]);
	}

	#[rstest]
	fn test_render_options_builder() {
		let options = RenderOptions::new()
			.preload_timeout(Duration::from_millis(250))
			.state_variable("__STATE__")
			.static_script("/app.js")
			.static_style("/app.css");

		assert_eq!(options.preload_timeout, Some(Duration::from_millis(250)));
		assert_eq!(options.compose.state_variable, "__STATE__");
		assert_eq!(options.compose.static_scripts, vec!["/app.js"]);
		assert_eq!(options.compose.static_styles, vec!["/app.css"]);
		assert_eq!(RenderOptions::new().no_preload_timeout().preload_timeout, None);
	}

	#[rstest]
	fn test_default_options() {
		let options = RenderOptions::default();
		assert_eq!(options.preload_timeout, Some(DEFAULT_PRELOAD_TIMEOUT));
		assert_eq!(options.compose.state_variable, DEFAULT_STATE_VARIABLE);
	}
}
