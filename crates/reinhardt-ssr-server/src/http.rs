//! HTTP/1 server loop.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

use crate::handler::Handler;
use crate::shutdown::{ShutdownCoordinator, shutdown_signal};

/// Error type returned by the server loop.
pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP/1 server dispatching every request to one [`Handler`].
pub struct HttpServer {
	handler: Arc<dyn Handler>,
}

impl HttpServer {
	/// Create a new server with the given handler
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use bytes::Bytes;
	/// use reinhardt_ssr_server::{Handler, HttpServer};
	///
	/// struct Hello;
	///
	/// #[async_trait::async_trait]
	/// impl Handler for Hello {
	///     async fn handle(&self, _req: http::Request<Bytes>) -> http::Response<Bytes> {
	///         http::Response::new(Bytes::from_static(b"Hello"))
	///     }
	/// }
	///
	/// let server = HttpServer::new(Arc::new(Hello));
	/// ```
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self { handler }
	}

	/// Start the server and listen on the given address
	///
	/// Runs until accepting a connection fails.
	pub async fn listen(self, addr: SocketAddr) -> Result<(), ServerError> {
		let listener = TcpListener::bind(addr).await?;
		tracing::info!(address = %listener.local_addr()?, "Server listening");

		loop {
			let (stream, socket_addr) = listener.accept().await?;
			let handler = self.handler.clone();

			tokio::task::spawn(async move {
				if let Err(err) = Self::handle_connection(stream, socket_addr, handler).await {
					tracing::warn!(peer = %socket_addr, error = %err, "Error handling connection");
				}
			});
		}
	}

	/// Start the server with graceful shutdown support
	///
	/// When the coordinator fires, the server stops accepting connections,
	/// lets in-flight requests finish and returns once every connection has
	/// closed or the shutdown window has elapsed.
	///
	/// # Examples
	///
	/// ```no_run
	/// use std::sync::Arc;
	/// use std::time::Duration;
	/// use reinhardt_ssr_server::{HttpServer, ShutdownCoordinator, SsrHandler};
	/// # async fn example(handler: SsrHandler) -> Result<(), reinhardt_ssr_server::http::ServerError> {
	/// let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
	/// HttpServer::new(Arc::new(handler))
	///     .listen_with_shutdown("127.0.0.1:3000".parse()?, coordinator)
	///     .await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn listen_with_shutdown(
		self,
		addr: SocketAddr,
		coordinator: ShutdownCoordinator,
	) -> Result<(), ServerError> {
		let listener = TcpListener::bind(addr).await?;
		self.serve_listener(listener, coordinator).await
	}

	/// Serve connections from an already bound listener until shutdown.
	pub async fn serve_listener(
		self,
		listener: TcpListener,
		coordinator: ShutdownCoordinator,
	) -> Result<(), ServerError> {
		tracing::info!(address = %listener.local_addr()?, "Server listening");

		let mut shutdown_rx = coordinator.subscribe();
		if coordinator.is_shutting_down() {
			return Ok(());
		}

		loop {
			tokio::select! {
				biased;

				_ = shutdown_rx.recv() => {
					tracing::info!("Shutdown signal received, stopping server");
					break;
				}
				result = listener.accept() => {
					let (stream, socket_addr) = match result {
						Ok(accepted) => accepted,
						Err(err) => {
							tracing::warn!(error = %err, "Failed to accept connection");
							continue;
						}
					};
					let handler = self.handler.clone();
					let conn_shutdown = coordinator.subscribe();
					let conn_coordinator = coordinator.clone();
					conn_coordinator.connection_started();

					tokio::task::spawn(async move {
						let result =
							Self::serve_connection(stream, socket_addr, handler, conn_shutdown).await;
						if let Err(err) = result {
							tracing::warn!(peer = %socket_addr, error = %err, "Error handling connection");
						}
						conn_coordinator.notify_shutdown_complete();
					});
				}
			}
		}

		drop(listener);
		if coordinator.wait_for_connections().await {
			tracing::info!("All connections closed");
		}

		Ok(())
	}

	/// Handle a single TCP connection by processing HTTP requests
	pub async fn handle_connection(
		stream: TcpStream,
		socket_addr: SocketAddr,
		handler: Arc<dyn Handler>,
	) -> Result<(), ServerError> {
		let io = TokioIo::new(stream);
		let service = RequestService {
			handler,
			remote_addr: socket_addr,
		};

		http1::Builder::new().serve_connection(io, service).await?;

		Ok(())
	}

	async fn serve_connection(
		stream: TcpStream,
		socket_addr: SocketAddr,
		handler: Arc<dyn Handler>,
		mut shutdown: tokio::sync::broadcast::Receiver<()>,
	) -> Result<(), ServerError> {
		let io = TokioIo::new(stream);
		let service = RequestService {
			handler,
			remote_addr: socket_addr,
		};

		let connection = http1::Builder::new().serve_connection(io, service);
		tokio::pin!(connection);

		tokio::select! {
			result = connection.as_mut() => result?,
			_ = shutdown.recv() => {
				// Finish the in-flight request, then close.
				connection.as_mut().graceful_shutdown();
				connection.await?;
			}
		}

		Ok(())
	}
}

/// Service implementation for hyper
struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = ServerError;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;

		Box::pin(async move {
			let (parts, body) = req.into_parts();
			let body_bytes = body.collect().await?.to_bytes();

			tracing::trace!(
				peer = %remote_addr,
				method = %parts.method,
				uri = %parts.uri,
				"Request received"
			);

			let request = http::Request::from_parts(parts, body_bytes);
			let response = handler.handle(request).await;

			let (parts, body) = response.into_parts();
			Ok(hyper::Response::from_parts(parts, Full::new(body)))
		})
	}
}

/// Helper function to create and run a server
pub async fn serve(addr: SocketAddr, handler: Arc<dyn Handler>) -> Result<(), ServerError> {
	HttpServer::new(handler).listen(addr).await
}

/// Helper function to run a server until Ctrl-C
///
/// The coordinator is triggered by Ctrl-C; callers may also trigger it
/// themselves.
pub async fn serve_with_shutdown(
	addr: SocketAddr,
	handler: Arc<dyn Handler>,
	coordinator: ShutdownCoordinator,
) -> Result<(), ServerError> {
	let signal_coordinator = coordinator.clone();
	let signal_task = tokio::spawn(async move {
		shutdown_signal().await;
		signal_coordinator.shutdown();
	});

	let result = HttpServer::new(handler)
		.listen_with_shutdown(addr, coordinator)
		.await;
	signal_task.abort();
	result
}
