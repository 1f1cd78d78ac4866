//! Startup wiring: settings to a ready renderer.

use crate::demo::demo_factory;
use crate::handler::SsrHandler;
use crate::settings::SsrSettings;
use reinhardt_ssr_core::router::RouteDefinitionError;
use reinhardt_ssr_core::{
	AppFactory, BundleLoadError, BundleRenderer, ClientManifest, ServerBundle, Template,
	TemplateError,
};
use std::sync::Arc;

/// Errors raised while preparing the renderer at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	/// The application routes are invalid.
	#[error("invalid application routes: {0}")]
	Routes(#[from] RouteDefinitionError),

	/// The server bundle or client manifest could not be loaded.
	#[error(transparent)]
	Bundle(#[from] BundleLoadError),

	/// The document template could not be loaded.
	#[error(transparent)]
	Template(#[from] TemplateError),
}

/// A fully initialized SSR application.
#[derive(Debug, Clone)]
pub struct SsrApplication {
	settings: SsrSettings,
	renderer: Arc<BundleRenderer>,
}

impl SsrApplication {
	/// Loads the demo application described by `settings`.
	pub fn from_settings(settings: SsrSettings) -> Result<Self, StartupError> {
		let factory = Arc::new(demo_factory()?);
		Self::with_factory(settings, factory)
	}

	/// Loads the bundle, manifest and template described by `settings` for
	/// the given application factory.
	pub fn with_factory(
		settings: SsrSettings,
		factory: Arc<dyn AppFactory>,
	) -> Result<Self, StartupError> {
		let bundle = Arc::new(ServerBundle::from_file(&settings.bundle_path, factory)?);

		let template = match &settings.template_path {
			Some(path) => Template::from_file(path)?,
			None => Template::default(),
		};

		let mut renderer = BundleRenderer::new(bundle, settings.render_options())
			.with_template(Arc::new(template));

		if let Some(path) = &settings.client_manifest_path {
			let manifest = ClientManifest::from_file(path)?;
			renderer = renderer.with_client_manifest(Arc::new(manifest));
		}

		tracing::info!(
			bundle = %settings.bundle_path.display(),
			manifest = settings.client_manifest_path.is_some(),
			custom_template = settings.template_path.is_some(),
			"SSR application initialized"
		);

		Ok(Self {
			settings,
			renderer: Arc::new(renderer),
		})
	}

	/// The settings the application was built from.
	pub fn settings(&self) -> &SsrSettings {
		&self.settings
	}

	/// The shared renderer.
	pub fn renderer(&self) -> &Arc<BundleRenderer> {
		&self.renderer
	}

	/// A request handler serving this application.
	pub fn handler(&self) -> SsrHandler {
		SsrHandler::new(Arc::clone(&self.renderer))
	}
}
