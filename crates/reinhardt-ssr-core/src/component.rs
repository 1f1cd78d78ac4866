//! View component contract.
//!
//! A [`Component`] renders a [`View`] for the current request. Components that
//! need data before rendering additionally expose the [`Loadable`] capability
//! through [`Component::as_loadable`]; the data preloader invokes every
//! loadable component of a matched chain through that single entry point.

use crate::router::RouteParams;
use crate::ssr::StatePayload;
use crate::ssr::renderer::ModuleTracker;
use crate::store::Store;
use crate::view::View;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Boxed error type used by data hooks, lazy loaders and actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised while rendering a component.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
	/// A component refused to render.
	#[error("component `{component}` failed to render: {message}")]
	Component {
		/// Component name.
		component: String,
		/// Failure description.
		message: String,
	},

	/// A component required a state key that the store does not hold.
	#[error("component `{component}` requires missing state key `{key}`")]
	MissingState {
		/// Component name.
		component: String,
		/// Missing key.
		key: String,
	},
}

impl RenderError {
	/// Creates a generic component failure.
	pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Component {
			component: component.into(),
			message: message.into(),
		}
	}
}

/// A server-renderable view component.
pub trait Component: Send + Sync {
	/// Human readable component name used in logs and errors.
	fn name(&self) -> &str;

	/// Identifier of the compiled module defining this component.
	///
	/// The client manifest is keyed by these identifiers.
	fn module_id(&self) -> &str;

	/// Renders the component.
	///
	/// Layout components place the nested route's output with
	/// [`RenderScope::take_outlet`].
	fn render(&self, scope: &mut RenderScope<'_>) -> Result<View, RenderError>;

	/// Returns the data loading capability, if this component has one.
	fn as_loadable(&self) -> Option<&dyn Loadable> {
		None
	}
}

impl std::fmt::Debug for dyn Component {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Component")
			.field("name", &self.name())
			.field("module_id", &self.module_id())
			.field("loadable", &self.as_loadable().is_some())
			.finish()
	}
}

/// Data dependency of a component, resolved before rendering.
#[async_trait]
pub trait Loadable: Send + Sync {
	/// Loads data into the request's store.
	async fn load(&self, ctx: LoadContext) -> Result<(), BoxError>;
}

/// Per-request input handed to [`Loadable::load`].
#[derive(Debug, Clone)]
pub struct LoadContext {
	store: Store,
	path: String,
	params: RouteParams,
	query: HashMap<String, String>,
}

impl LoadContext {
	/// Creates a load context.
	pub fn new(
		store: Store,
		path: impl Into<String>,
		params: RouteParams,
		query: HashMap<String, String>,
	) -> Self {
		Self {
			store,
			path: path.into(),
			params,
			query,
		}
	}

	/// The request's store.
	pub fn store(&self) -> &Store {
		&self.store
	}

	/// The matched path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// A path parameter by name.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// A query parameter by name.
	pub fn query(&self, name: &str) -> Option<&str> {
		self.query.get(name).map(String::as_str)
	}
}

/// Rendering environment of a single component.
pub struct RenderScope<'a> {
	state: &'a StatePayload,
	params: &'a RouteParams,
	outlet: View,
	modules: &'a mut ModuleTracker,
}

impl<'a> RenderScope<'a> {
	pub(crate) fn new(
		state: &'a StatePayload,
		params: &'a RouteParams,
		outlet: View,
		modules: &'a mut ModuleTracker,
	) -> Self {
		Self {
			state,
			params,
			outlet,
			modules,
		}
	}

	/// The state snapshot captured after preloading.
	pub fn state(&self) -> &StatePayload {
		self.state
	}

	/// Reads a state value.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.state.get(key)
	}

	/// Reads a string state value, failing the render when absent.
	pub fn require_str(&self, component: &str, key: &str) -> Result<&str, RenderError> {
		self.state
			.get(key)
			.and_then(Value::as_str)
			.ok_or_else(|| RenderError::MissingState {
				component: component.to_string(),
				key: key.to_string(),
			})
	}

	/// A path parameter by name.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// Takes the output of the nested route component.
	///
	/// Returns [`View::Empty`] for the innermost component or when called twice.
	pub fn take_outlet(&mut self) -> View {
		std::mem::take(&mut self.outlet)
	}

	/// Renders a child component and records its module as used.
	pub fn render_child(&mut self, component: &dyn Component) -> Result<View, RenderError> {
		self.modules.record(component.module_id());
		let mut scope =
			RenderScope::new(self.state, self.params, View::Empty, &mut *self.modules);
		component.render(&mut scope)
	}
}
