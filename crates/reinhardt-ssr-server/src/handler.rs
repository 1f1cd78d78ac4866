//! Request handlers.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use reinhardt_ssr_core::ssr::{RenderContext, RequestPhase};
use reinhardt_ssr_core::view::html_escape;
use reinhardt_ssr_core::{BundleRenderer, SsrError};
use std::sync::Arc;
use std::time::Instant;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Handles one HTTP request.
#[async_trait]
pub trait Handler: Send + Sync {
	/// Produces the response for `request`.
	async fn handle(&self, request: Request<Bytes>) -> Response<Bytes>;
}

/// Serves server-rendered documents for GET and HEAD requests.
#[derive(Debug, Clone)]
pub struct SsrHandler {
	renderer: Arc<BundleRenderer>,
}

impl SsrHandler {
	/// Creates a handler around a shared renderer.
	pub fn new(renderer: Arc<BundleRenderer>) -> Self {
		Self { renderer }
	}

	/// The shared renderer.
	pub fn renderer(&self) -> &Arc<BundleRenderer> {
		&self.renderer
	}
}

#[async_trait]
impl Handler for SsrHandler {
	async fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
		let method = request.method().clone();
		if method != Method::GET && method != Method::HEAD {
			return method_not_allowed();
		}

		let url = request
			.uri()
			.path_and_query()
			.map(|pq| pq.as_str().to_string())
			.unwrap_or_else(|| "/".to_string());

		let started = Instant::now();
		let mut ctx = RenderContext::new(url.as_str());
		let response = match self.renderer.render_document_with_context(&mut ctx).await {
			Ok(document) => html_response(StatusCode::OK, document),
			Err(err) => error_response(&url, &err),
		};
		ctx.advance(RequestPhase::Sent);

		tracing::info!(
			method = %method,
			url = %url,
			status = response.status().as_u16(),
			phase = %ctx.phase(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Request served"
		);

		if method == Method::HEAD {
			strip_body(response)
		} else {
			response
		}
	}
}

fn html_response(status: StatusCode, body: String) -> Response<Bytes> {
	let mut response = Response::new(Bytes::from(body));
	*response.status_mut() = status;
	response
		.headers_mut()
		.insert(CONTENT_TYPE, http::HeaderValue::from_static(HTML_CONTENT_TYPE));
	response
}

fn error_response(url: &str, err: &SsrError) -> Response<Bytes> {
	let status =
		StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

	if err.is_not_found() {
		tracing::debug!(url = %url, "No route matched");
		html_response(
			status,
			format!(
				"<!DOCTYPE html><html><head><title>404 Not Found</title></head><body><h1>Not Found</h1><p>{}</p></body></html>",
				html_escape(url)
			),
		)
	} else {
		tracing::error!(url = %url, error = %err, "Render failed");
		html_response(
			status,
			"<!DOCTYPE html><html><head><title>500 Internal Server Error</title></head><body><h1>Internal Server Error</h1></body></html>"
				.to_string(),
		)
	}
}

fn method_not_allowed() -> Response<Bytes> {
	let mut response = Response::new(Bytes::new());
	*response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
	response
		.headers_mut()
		.insert(ALLOW, http::HeaderValue::from_static("GET, HEAD"));
	response
}

/// Drops the body of a HEAD response while keeping its length.
fn strip_body(response: Response<Bytes>) -> Response<Bytes> {
	let (mut parts, body) = response.into_parts();
	parts.headers.insert(CONTENT_LENGTH, http::HeaderValue::from(body.len()));
	Response::from_parts(parts, Bytes::new())
}
