//! Built-in demo application.
//!
//! A root layout with two pages: `/` renders `Foo`, whose data hook
//! dispatches `changeName` before rendering the resulting username, and
//! `/bar` renders `Bar`, which is loaded lazily on first use.

use async_trait::async_trait;
use reinhardt_ssr_core::{
	ApplicationFactory, BoxError, Component, ComponentRef, IntoView, LoadContext, Loadable,
	RenderError, RenderScope, RouteDescriptor, RouteTable, StoreDefinition, View,
	router::RouteDefinitionError,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Simulated latency of the `changeName` action.
pub const CHANGE_NAME_DELAY: Duration = Duration::from_millis(50);

/// Root layout of the demo application.
pub struct DemoApp;

impl Component for DemoApp {
	fn name(&self) -> &str {
		"App"
	}

	fn module_id(&self) -> &str {
		"app"
	}

	fn render(&self, scope: &mut RenderScope<'_>) -> Result<View, RenderError> {
		Ok(View::element("div")
			.attr("id", "app")
			.child(
				View::element("nav").children([
					View::element("a").attr("href", "/").child("Foo"),
					View::element("a").attr("href", "/bar").child("Bar"),
				]),
			)
			.child(scope.take_outlet())
			.into_view())
	}
}

/// Page rendering the stored username.
pub struct Foo;

impl Component for Foo {
	fn name(&self) -> &str {
		"Foo"
	}

	fn module_id(&self) -> &str {
		"foo"
	}

	fn render(&self, scope: &mut RenderScope<'_>) -> Result<View, RenderError> {
		let username = scope.require_str(self.name(), "username")?;
		Ok(View::element("div")
			.attr("class", "foo")
			.child(View::element("h1").child("Foo"))
			.child(View::element("p").child(format!("Hello, {}", username)))
			.into_view())
	}

	fn as_loadable(&self) -> Option<&dyn Loadable> {
		Some(self)
	}
}

#[async_trait]
impl Loadable for Foo {
	async fn load(&self, ctx: LoadContext) -> Result<(), BoxError> {
		ctx.store().dispatch("changeName", Value::Null).await?;
		Ok(())
	}
}

/// Static page loaded on demand.
pub struct Bar;

impl Component for Bar {
	fn name(&self) -> &str {
		"Bar"
	}

	fn module_id(&self) -> &str {
		"bar"
	}

	fn render(&self, _scope: &mut RenderScope<'_>) -> Result<View, RenderError> {
		Ok(View::element("div")
			.attr("class", "bar")
			.child(View::element("h1").child("Bar"))
			.into_view())
	}
}

/// The demo store: `username` starts as `"jack"`.
pub fn demo_store() -> Arc<StoreDefinition> {
	StoreDefinition::builder()
		.state("username", json!("jack"))
		.mutation("changeName", |state, _payload| {
			state.insert("username".to_string(), json!("rose"));
		})
		.action("changeName", |ctx, payload| async move {
			tokio::time::sleep(CHANGE_NAME_DELAY).await;
			ctx.commit("changeName", payload)?;
			Ok::<(), BoxError>(())
		})
		.build()
}

/// The demo routes.
pub fn demo_routes() -> Result<RouteTable, RouteDefinitionError> {
	RouteTable::new([
		RouteDescriptor::new("/", ComponentRef::eager(Foo)).named("foo"),
		RouteDescriptor::new(
			"/bar",
			ComponentRef::lazy("bar", || async {
				tracing::debug!(module = "bar", "Loading lazy module");
				Ok(Arc::new(Bar) as Arc<dyn Component>)
			}),
		)
		.named("bar"),
	])
}

/// Factory for the demo application.
pub fn demo_factory() -> Result<ApplicationFactory, RouteDefinitionError> {
	Ok(ApplicationFactory::new(
		Arc::new(DemoApp),
		Arc::new(demo_routes()?),
		demo_store(),
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_ssr_core::AppFactory;
	use rstest::rstest;

	#[rstest]
	fn test_demo_module_ids() {
		let factory = demo_factory().unwrap();
		assert_eq!(factory.module_ids(), vec!["app", "foo", "bar"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_change_name_action() {
		let store = demo_store().instantiate();
		assert_eq!(store.get("username"), Some(json!("jack")));

		store.dispatch("changeName", Value::Null).await.unwrap();

		assert_eq!(store.get("username"), Some(json!("rose")));
	}

	#[rstest]
	fn test_demo_route_names() {
		let routes = demo_routes().unwrap();
		assert_eq!(routes.reverse("bar", &[]).unwrap(), "/bar");
		assert_eq!(routes.reverse("foo", &[]).unwrap(), "/");
	}
}
