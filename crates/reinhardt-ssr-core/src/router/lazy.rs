//! Eager and lazily loaded route components.

use super::core::ResolveError;
use crate::component::{BoxError, Component};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Future produced by a lazy component loader.
pub type ComponentFuture = BoxFuture<'static, Result<Arc<dyn Component>, BoxError>>;

type Loader = Arc<dyn Fn() -> ComponentFuture + Send + Sync>;

/// A component whose module is loaded on first use.
///
/// The loaded component is cached for the lifetime of the route table, so
/// every request after the first resolves it without calling the loader.
/// A failed load is not cached and is retried by the next request.
pub struct LazyComponent {
	module_id: String,
	loader: Loader,
	loaded: OnceCell<Arc<dyn Component>>,
}

impl std::fmt::Debug for LazyComponent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LazyComponent")
			.field("module_id", &self.module_id)
			.field("loaded", &self.is_loaded())
			.finish()
	}
}

impl LazyComponent {
	/// Creates a lazy component for the given module.
	pub fn new<F, Fut>(module_id: impl Into<String>, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Arc<dyn Component>, BoxError>> + Send + 'static,
	{
		let loader: Loader = Arc::new(move || -> ComponentFuture { Box::pin(loader()) });
		Self {
			module_id: module_id.into(),
			loader,
			loaded: OnceCell::new(),
		}
	}

	/// The declared module identifier.
	pub fn module_id(&self) -> &str {
		&self.module_id
	}

	/// Returns true once the module has been loaded.
	pub fn is_loaded(&self) -> bool {
		self.loaded.initialized()
	}

	/// Loads the component, reusing the cached instance when present.
	pub async fn load(&self) -> Result<Arc<dyn Component>, ResolveError> {
		let component = self
			.loaded
			.get_or_try_init(|| async {
				tracing::debug!(module = %self.module_id, "Loading lazy component");
				(self.loader)()
					.await
					.map_err(|source| ResolveError::LazyLoad {
						module: self.module_id.clone(),
						source,
					})
			})
			.await?;

		if component.module_id() != self.module_id {
			return Err(ResolveError::ModuleMismatch {
				expected: self.module_id.clone(),
				found: component.module_id().to_string(),
			});
		}

		Ok(Arc::clone(component))
	}
}

/// A route's component, available immediately or loaded on demand.
#[derive(Debug, Clone)]
pub enum ComponentRef {
	/// A component linked into the bundle.
	Eager(Arc<dyn Component>),
	/// A component loaded the first time its route matches.
	Lazy(Arc<LazyComponent>),
}

impl ComponentRef {
	/// Wraps an eagerly available component.
	pub fn eager(component: impl Component + 'static) -> Self {
		Self::Eager(Arc::new(component))
	}

	/// Declares a lazily loaded component.
	pub fn lazy<F, Fut>(module_id: impl Into<String>, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Arc<dyn Component>, BoxError>> + Send + 'static,
	{
		Self::Lazy(Arc::new(LazyComponent::new(module_id, loader)))
	}

	/// The module identifier of the referenced component.
	pub fn module_id(&self) -> &str {
		match self {
			Self::Eager(component) => component.module_id(),
			Self::Lazy(lazy) => lazy.module_id(),
		}
	}

	/// Returns true if the component is available without loading.
	pub fn is_ready(&self) -> bool {
		match self {
			Self::Eager(_) => true,
			Self::Lazy(lazy) => lazy.is_loaded(),
		}
	}

	/// Resolves the component, loading it if necessary.
	pub async fn resolve(&self) -> Result<Arc<dyn Component>, ResolveError> {
		match self {
			Self::Eager(component) => Ok(Arc::clone(component)),
			Self::Lazy(lazy) => lazy.load().await,
		}
	}
}

impl From<Arc<dyn Component>> for ComponentRef {
	fn from(component: Arc<dyn Component>) -> Self {
		Self::Eager(component)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{RenderError, RenderScope};
	use crate::view::View;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct Named(&'static str);

	impl Component for Named {
		fn name(&self) -> &str {
			self.0
		}

		fn module_id(&self) -> &str {
			self.0
		}

		fn render(&self, _scope: &mut RenderScope<'_>) -> Result<View, RenderError> {
			Ok(View::text(self.0))
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_lazy_component_loads_once() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let lazy = LazyComponent::new("bar", move || {
			counter.fetch_add(1, Ordering::SeqCst);
			async { Ok(Arc::new(Named("bar")) as Arc<dyn Component>) }
		});

		assert!(!lazy.is_loaded());
		let first = lazy.load().await.unwrap();
		let second = lazy.load().await.unwrap();

		assert!(lazy.is_loaded());
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_lazy_failure_is_retried() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let lazy = LazyComponent::new("flaky", move || {
			let attempt = counter.fetch_add(1, Ordering::SeqCst);
			async move {
				if attempt == 0 {
					Err::<Arc<dyn Component>, BoxError>("chunk fetch failed".into())
				} else {
					Ok(Arc::new(Named("flaky")) as Arc<dyn Component>)
				}
			}
		});

		let err = lazy.load().await.unwrap_err();
		assert!(matches!(err, ResolveError::LazyLoad { ref module, .. } if module == "flaky"));
		assert!(!lazy.is_loaded());

		lazy.load().await.unwrap();
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_module_mismatch() {
		let component = ComponentRef::lazy("declared", || async {
			Ok(Arc::new(Named("other")) as Arc<dyn Component>)
		});

		let err = component.resolve().await.unwrap_err();
		assert!(matches!(
			err,
			ResolveError::ModuleMismatch { ref expected, ref found }
				if expected == "declared" && found == "other"
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_eager_component_is_ready() {
		let component = ComponentRef::eager(Named("foo"));
		assert!(component.is_ready());
		assert_eq!(component.module_id(), "foo");
		assert_eq!(component.resolve().await.unwrap().name(), "foo");
	}
}
