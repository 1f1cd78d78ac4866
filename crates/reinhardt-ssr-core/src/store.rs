//! Keyed application state container.
//!
//! A [`StoreDefinition`] describes initial state, named mutations and named
//! actions. It is immutable and shared by every request; each request calls
//! [`StoreDefinition::instantiate`] to obtain its own [`Store`].
//!
//! State only changes through [`Store::commit`]. Actions run through
//! [`Store::dispatch`] may await before committing.
//!
//! ## Example
//!
//! ```
//! use reinhardt_ssr_core::store::StoreDefinition;
//! use serde_json::json;
//!
//! let definition = StoreDefinition::builder()
//!     .state("username", json!("jack"))
//!     .mutation("changeName", |state, payload| {
//!         state.insert("username".to_string(), payload);
//!     })
//!     .build();
//!
//! let store = definition.instantiate();
//! store.commit("changeName", json!("rose")).unwrap();
//! assert_eq!(store.get("username"), Some(json!("rose")));
//! ```

use crate::component::BoxError;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// The JSON object holding a store's state.
pub type StateMap = serde_json::Map<String, Value>;

type MutationFn = Arc<dyn Fn(&mut StateMap, Value) + Send + Sync>;
type ActionFn =
	Arc<dyn Fn(ActionContext, Value) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Errors raised by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	/// No mutation is registered under the given name.
	#[error("unknown mutation: {0}")]
	UnknownMutation(String),

	/// No action is registered under the given name.
	#[error("unknown action: {0}")]
	UnknownAction(String),

	/// An action returned an error.
	#[error("action `{name}` failed: {source}")]
	Action {
		/// Action name.
		name: String,
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
}

/// Immutable description of a store: initial state, mutations and actions.
pub struct StoreDefinition {
	initial: StateMap,
	mutations: HashMap<String, MutationFn>,
	actions: HashMap<String, ActionFn>,
}

impl std::fmt::Debug for StoreDefinition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StoreDefinition")
			.field("initial", &self.initial)
			.field("mutations", &self.mutations.keys().collect::<Vec<_>>())
			.field("actions", &self.actions.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl StoreDefinition {
	/// Starts building a definition.
	pub fn builder() -> StoreDefinitionBuilder {
		StoreDefinitionBuilder::default()
	}

	/// Returns the initial state.
	pub fn initial_state(&self) -> &StateMap {
		&self.initial
	}

	/// Creates a fresh store with its own copy of the initial state.
	pub fn instantiate(self: &Arc<Self>) -> Store {
		Store {
			inner: Arc::new(StoreInner {
				definition: Arc::clone(self),
				state: RwLock::new(self.initial.clone()),
			}),
		}
	}
}

/// Builder for [`StoreDefinition`].
#[derive(Default)]
pub struct StoreDefinitionBuilder {
	initial: StateMap,
	mutations: HashMap<String, MutationFn>,
	actions: HashMap<String, ActionFn>,
}

impl StoreDefinitionBuilder {
	/// Sets an initial state key.
	pub fn state(mut self, key: impl Into<String>, value: Value) -> Self {
		self.initial.insert(key.into(), value);
		self
	}

	/// Registers a named mutation.
	pub fn mutation<F>(mut self, name: impl Into<String>, mutation: F) -> Self
	where
		F: Fn(&mut StateMap, Value) + Send + Sync + 'static,
	{
		self.mutations.insert(name.into(), Arc::new(mutation));
		self
	}

	/// Registers a named asynchronous action.
	pub fn action<F, Fut>(mut self, name: impl Into<String>, action: F) -> Self
	where
		F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
	{
		self.actions.insert(
			name.into(),
			Arc::new(
				move |ctx: ActionContext, payload: Value| -> BoxFuture<'static, Result<(), BoxError>> {
					Box::pin(action(ctx, payload))
				},
			),
		);
		self
	}

	/// Finishes the definition.
	pub fn build(self) -> Arc<StoreDefinition> {
		Arc::new(StoreDefinition {
			initial: self.initial,
			mutations: self.mutations,
			actions: self.actions,
		})
	}
}

struct StoreInner {
	definition: Arc<StoreDefinition>,
	state: RwLock<StateMap>,
}

/// Handle to one request's store.
///
/// Cloning the handle shares the same state; separate requests obtain
/// separate stores from [`StoreDefinition::instantiate`].
#[derive(Clone)]
pub struct Store {
	inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Store")
			.field("state", &*self.inner.state.read())
			.finish()
	}
}

impl Store {
	/// Applies a named mutation with the given payload.
	pub fn commit(&self, name: &str, payload: Value) -> Result<(), StoreError> {
		let mutation = self
			.inner
			.definition
			.mutations
			.get(name)
			.ok_or_else(|| StoreError::UnknownMutation(name.to_string()))?;

		let mut state = self.inner.state.write();
		mutation(&mut state, payload);
		tracing::trace!(mutation = name, "store mutation committed");
		Ok(())
	}

	/// Runs a named action to completion.
	pub async fn dispatch(&self, name: &str, payload: Value) -> Result<(), StoreError> {
		let action = self
			.inner
			.definition
			.actions
			.get(name)
			.cloned()
			.ok_or_else(|| StoreError::UnknownAction(name.to_string()))?;

		let ctx = ActionContext {
			store: self.clone(),
		};
		action(ctx, payload).await.map_err(|source| StoreError::Action {
			name: name.to_string(),
			source,
		})
	}

	/// Returns a copy of the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.inner.state.read().get(key).cloned()
	}

	/// Returns a deep copy of the whole state.
	pub fn snapshot(&self) -> StateMap {
		self.inner.state.read().clone()
	}

	/// Replaces the whole state, as done when restoring a serialized payload.
	pub fn replace_state(&self, state: StateMap) {
		*self.inner.state.write() = state;
	}

	/// Returns true if both handles point at the same store.
	pub fn ptr_eq(&self, other: &Store) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

/// Context handed to actions.
#[derive(Clone, Debug)]
pub struct ActionContext {
	store: Store,
}

impl ActionContext {
	/// Commits a mutation on the owning store.
	pub fn commit(&self, name: &str, payload: Value) -> Result<(), StoreError> {
		self.store.commit(name, payload)
	}

	/// Dispatches another action on the owning store.
	pub async fn dispatch(&self, name: &str, payload: Value) -> Result<(), StoreError> {
		self.store.dispatch(name, payload).await
	}

	/// Reads a state value.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.store.get(key)
	}

	/// Returns the owning store.
	pub fn store(&self) -> &Store {
		&self.store
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn definition() -> Arc<StoreDefinition> {
		StoreDefinition::builder()
			.state("username", json!("jack"))
			.state("count", json!(0))
			.mutation("changeName", |state, payload| {
				state.insert("username".to_string(), payload);
			})
			.mutation("increment", |state, _| {
				let next = state.get("count").and_then(Value::as_i64).unwrap_or(0) + 1;
				state.insert("count".to_string(), json!(next));
			})
			.action("changeName", |ctx, payload| async move {
				tokio::task::yield_now().await;
				ctx.commit("changeName", payload)?;
				Ok::<(), BoxError>(())
			})
			.action("fail", |_ctx, _payload| async move {
				Err::<(), BoxError>("backend unavailable".into())
			})
			.build()
	}

	#[rstest]
	fn test_instantiate_copies_initial_state(definition: Arc<StoreDefinition>) {
		let store = definition.instantiate();
		assert_eq!(store.get("username"), Some(json!("jack")));
		assert_eq!(store.get("missing"), None);
	}

	#[rstest]
	fn test_commit_applies_mutation(definition: Arc<StoreDefinition>) {
		let store = definition.instantiate();
		store.commit("increment", Value::Null).unwrap();
		store.commit("increment", Value::Null).unwrap();
		assert_eq!(store.get("count"), Some(json!(2)));
	}

	#[rstest]
	fn test_commit_unknown_mutation(definition: Arc<StoreDefinition>) {
		let store = definition.instantiate();
		let err = store.commit("nope", Value::Null).unwrap_err();
		assert!(matches!(err, StoreError::UnknownMutation(name) if name == "nope"));
	}

	#[rstest]
	fn test_instances_are_isolated(definition: Arc<StoreDefinition>) {
		let first = definition.instantiate();
		let second = definition.instantiate();

		first.commit("changeName", json!("rose")).unwrap();

		assert_eq!(first.get("username"), Some(json!("rose")));
		assert_eq!(second.get("username"), Some(json!("jack")));
		assert_eq!(
			definition.initial_state().get("username"),
			Some(&json!("jack"))
		);
		assert!(!first.ptr_eq(&second));
		assert!(first.ptr_eq(&first.clone()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_dispatch_commits_after_await(definition: Arc<StoreDefinition>) {
		let store = definition.instantiate();
		store.dispatch("changeName", json!("rose")).await.unwrap();
		assert_eq!(store.get("username"), Some(json!("rose")));
	}

	#[rstest]
	#[tokio::test]
	async fn test_dispatch_errors(definition: Arc<StoreDefinition>) {
		let store = definition.instantiate();

		let unknown = store.dispatch("missing", Value::Null).await.unwrap_err();
		assert!(matches!(unknown, StoreError::UnknownAction(_)));

		let failed = store.dispatch("fail", Value::Null).await.unwrap_err();
		assert!(failed.to_string().contains("backend unavailable"));
	}

	#[rstest]
	fn test_replace_state(definition: Arc<StoreDefinition>) {
		let store = definition.instantiate();
		let mut restored = StateMap::new();
		restored.insert("username".to_string(), json!("restored"));

		store.replace_state(restored);

		assert_eq!(store.get("username"), Some(json!("restored")));
		assert_eq!(store.get("count"), None);
	}
}
