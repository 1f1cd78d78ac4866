//! Concurrent data preloading for a matched component chain.

use crate::component::{BoxError, LoadContext};
use crate::router::ComponentChain;
use crate::store::Store;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::time::Duration;

/// Error raised when preloading fails.
#[derive(Debug, thiserror::Error)]
pub enum PreloadError {
	/// A data hook returned an error.
	#[error("data hook of `{component}` failed: {source}")]
	Hook {
		/// Component whose hook failed.
		component: String,
		/// Hook failure.
		#[source]
		source: BoxError,
	},

	/// A data hook panicked.
	#[error("data hook of `{component}` panicked: {message}")]
	Panicked {
		/// Component whose hook panicked.
		component: String,
		/// Panic description.
		message: String,
	},

	/// The hooks did not settle within the timeout.
	#[error("data hooks did not settle within {0:?}")]
	TimedOut(Duration),
}

/// Runs the data hook of every loadable component in `chain` against `store`.
///
/// Hooks run as independent tasks and the call completes once all of them
/// have finished. The first failure to arrive ends the wait; hooks still in
/// flight keep running detached and their outcome is discarded. Components
/// without a data hook are skipped.
pub async fn preload(
	chain: &ComponentChain,
	store: &Store,
	timeout: Option<Duration>,
) -> Result<(), PreloadError> {
	if chain.is_empty() {
		return Ok(());
	}

	let mut pending = FuturesUnordered::new();

	for component in chain.iter() {
		if component.as_loadable().is_none() {
			tracing::trace!(component = component.name(), "No data hook");
			continue;
		}

		let component = std::sync::Arc::clone(component);
		let name = component.name().to_string();
		let ctx = LoadContext::new(
			store.clone(),
			chain.path(),
			chain.params().clone(),
			chain.query().clone(),
		);

		let handle = tokio::spawn(async move {
			match component.as_loadable() {
				Some(loadable) => loadable.load(ctx).await,
				None => Ok(()),
			}
		});

		pending.push(async move { (name, handle.await) });
	}

	if pending.is_empty() {
		return Ok(());
	}

	let hooks = pending.len();
	let barrier = async move {
		while let Some((component, joined)) = pending.next().await {
			match joined {
				Ok(Ok(())) => {
					tracing::trace!(component = %component, "Data hook settled");
				}
				Ok(Err(source)) => return Err(PreloadError::Hook { component, source }),
				Err(join_error) => {
					return Err(PreloadError::Panicked {
						component,
						message: join_error.to_string(),
					});
				}
			}
		}
		Ok(())
	};

	let result = match timeout {
		Some(limit) => tokio::time::timeout(limit, barrier)
			.await
			.unwrap_or(Err(PreloadError::TimedOut(limit))),
		None => barrier.await,
	};

	match &result {
		Ok(()) => tracing::debug!(path = chain.path(), hooks, "Preload complete"),
		Err(err) => tracing::warn!(path = chain.path(), error = %err, "Preload failed"),
	}

	result
}
