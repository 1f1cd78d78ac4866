//! Graceful shutdown coordination.
//!
//! A [`ShutdownCoordinator`] broadcasts a single shutdown notification to
//! the accept loop and every connection task, then waits for in-flight
//! connections to report completion within a bounded window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};

struct Inner {
	sender: broadcast::Sender<()>,
	triggered: AtomicBool,
	active: AtomicUsize,
	drained: Notify,
	timeout: Duration,
}

/// Broadcasts shutdown to the server and tracks in-flight connections.
#[derive(Clone)]
pub struct ShutdownCoordinator {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for ShutdownCoordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ShutdownCoordinator")
			.field("shutting_down", &self.is_shutting_down())
			.field("active", &self.active_connections())
			.field("timeout", &self.inner.timeout)
			.finish()
	}
}

impl ShutdownCoordinator {
	/// Creates a coordinator granting `timeout` to in-flight connections.
	pub fn new(timeout: Duration) -> Self {
		let (sender, _) = broadcast::channel(1);
		Self {
			inner: Arc::new(Inner {
				sender,
				triggered: AtomicBool::new(false),
				active: AtomicUsize::new(0),
				drained: Notify::new(),
				timeout,
			}),
		}
	}

	/// Subscribes to the shutdown notification.
	pub fn subscribe(&self) -> broadcast::Receiver<()> {
		self.inner.sender.subscribe()
	}

	/// Triggers shutdown. Only the first call broadcasts.
	pub fn shutdown(&self) {
		if self.inner.triggered.swap(true, Ordering::SeqCst) {
			return;
		}
		tracing::info!("Shutdown requested");
		// No receivers simply means nothing is listening yet.
		let _ = self.inner.sender.send(());
	}

	/// Returns true once [`shutdown`](Self::shutdown) has been called.
	pub fn is_shutting_down(&self) -> bool {
		self.inner.triggered.load(Ordering::SeqCst)
	}

	/// The graceful shutdown window.
	pub fn shutdown_timeout(&self) -> Duration {
		self.inner.timeout
	}

	/// Registers an in-flight connection.
	pub fn connection_started(&self) {
		self.inner.active.fetch_add(1, Ordering::SeqCst);
	}

	/// Marks an in-flight connection as finished.
	pub fn notify_shutdown_complete(&self) {
		let previous = self.inner.active.fetch_sub(1, Ordering::SeqCst);
		if previous <= 1 {
			self.inner.drained.notify_waiters();
		}
	}

	/// Number of in-flight connections.
	pub fn active_connections(&self) -> usize {
		self.inner.active.load(Ordering::SeqCst)
	}

	/// Waits until every in-flight connection has finished or the shutdown
	/// window elapses. Returns false on timeout.
	pub async fn wait_for_connections(&self) -> bool {
		let drained = async {
			loop {
				let notified = self.inner.drained.notified();
				if self.active_connections() == 0 {
					return;
				}
				notified.await;
			}
		};

		match tokio::time::timeout(self.inner.timeout, drained).await {
			Ok(()) => true,
			Err(_) => {
				tracing::warn!(
					remaining = self.active_connections(),
					timeout = ?self.inner.timeout,
					"Shutdown window elapsed with connections still open"
				);
				false
			}
		}
	}
}

/// Completes when the process receives Ctrl-C.
pub async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("Received Ctrl-C"),
		Err(err) => {
			tracing::error!(error = %err, "Failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_shutdown_reaches_every_subscriber() {
		let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
		let mut first = coordinator.subscribe();
		let mut second = coordinator.clone().subscribe();

		coordinator.shutdown();
		coordinator.shutdown();

		assert!(first.recv().await.is_ok());
		assert!(second.recv().await.is_ok());
		assert!(coordinator.is_shutting_down());
	}

	#[rstest]
	#[tokio::test]
	async fn test_wait_returns_when_connections_drain() {
		let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
		coordinator.connection_started();

		let finisher = coordinator.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			finisher.notify_shutdown_complete();
		});

		assert!(coordinator.wait_for_connections().await);
		assert_eq!(coordinator.active_connections(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_wait_times_out() {
		let coordinator = ShutdownCoordinator::new(Duration::from_millis(20));
		coordinator.connection_started();

		assert!(!coordinator.wait_for_connections().await);
	}
}
