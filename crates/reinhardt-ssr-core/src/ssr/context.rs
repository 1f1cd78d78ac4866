//! Per-request render context and lifecycle phases.

use super::state::StatePayload;
use crate::bundle::App;
use std::fmt;

/// Lifecycle phase of one request.
///
/// ```text
/// Received -> Resolving -> NotFound --------------------------> Sent
///                       \-> Preloading -> Rendered -> Composed -> Sent
///                                     \-> Failed -------------> Sent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPhase {
	/// The request has been accepted.
	Received,
	/// The URL is being resolved to a component chain.
	Resolving,
	/// No route matched.
	NotFound,
	/// Data hooks are running.
	Preloading,
	/// Resolution, preloading, rendering or composition failed.
	Failed,
	/// Markup and state are available.
	Rendered,
	/// The response document has been composed.
	Composed,
	/// The response has been handed to the transport.
	Sent,
}

impl RequestPhase {
	/// Returns the phase name used in logs.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Received => "received",
			Self::Resolving => "resolving",
			Self::NotFound => "not_found",
			Self::Preloading => "preloading",
			Self::Failed => "failed",
			Self::Rendered => "rendered",
			Self::Composed => "composed",
			Self::Sent => "sent",
		}
	}

	/// Returns true if `next` may follow this phase.
	pub fn can_advance_to(&self, next: RequestPhase) -> bool {
		use RequestPhase::*;
		matches!(
			(self, next),
			(Received, Resolving)
				| (Resolving, NotFound | Preloading | Failed)
				| (Preloading, Rendered | Failed)
				| (Rendered, Composed | Failed | Sent)
				| (NotFound | Failed | Composed, Sent)
		)
	}

	/// Returns true once no further phase can follow.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Sent)
	}
}

impl fmt::Display for RequestPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Per-request rendering state.
///
/// Carries the URL, the application instance once created, the state
/// snapshot once preloading has finished and the current phase.
#[derive(Debug)]
pub struct RenderContext {
	url: String,
	app: Option<App>,
	state: Option<StatePayload>,
	phase: RequestPhase,
}

impl RenderContext {
	/// Creates a context for a freshly received request.
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			app: None,
			state: None,
			phase: RequestPhase::Received,
		}
	}

	/// The request URL.
	pub fn url(&self) -> &str {
		&self.url
	}

	/// The current phase.
	pub fn phase(&self) -> RequestPhase {
		self.phase
	}

	/// The application instance built for this request.
	pub fn app(&self) -> Option<&App> {
		self.app.as_ref()
	}

	/// The state snapshot captured after preloading.
	pub fn state(&self) -> Option<&StatePayload> {
		self.state.as_ref()
	}

	pub(crate) fn attach_app(&mut self, app: App) {
		self.app = Some(app);
	}

	pub(crate) fn attach_state(&mut self, state: StatePayload) {
		self.state = Some(state);
	}

	/// Moves to `next`, returning false and keeping the current phase if the
	/// transition is not allowed.
	pub fn advance(&mut self, next: RequestPhase) -> bool {
		if !self.phase.can_advance_to(next) {
			tracing::warn!(
				url = %self.url,
				from = %self.phase,
				to = %next,
				"Ignoring invalid request phase transition"
			);
			return false;
		}

		tracing::debug!(url = %self.url, from = %self.phase, to = %next, "Request phase");
		self.phase = next;
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(&[RequestPhase::Resolving, RequestPhase::NotFound, RequestPhase::Sent])]
	#[case(&[
		RequestPhase::Resolving,
		RequestPhase::Preloading,
		RequestPhase::Rendered,
		RequestPhase::Composed,
		RequestPhase::Sent,
	])]
	#[case(&[
		RequestPhase::Resolving,
		RequestPhase::Preloading,
		RequestPhase::Failed,
		RequestPhase::Sent,
	])]
	fn test_valid_paths(#[case] phases: &[RequestPhase]) {
		let mut ctx = RenderContext::new("/");
		for phase in phases {
			assert!(ctx.advance(*phase), "transition to {}", phase);
		}
		assert!(ctx.phase().is_terminal());
	}

	#[rstest]
	#[case(RequestPhase::Received, RequestPhase::Rendered)]
	#[case(RequestPhase::Received, RequestPhase::Sent)]
	#[case(RequestPhase::Sent, RequestPhase::Received)]
	fn test_invalid_transition_is_ignored(#[case] from: RequestPhase, #[case] to: RequestPhase) {
		assert!(!from.can_advance_to(to));

		let mut ctx = RenderContext::new("/");
		assert!(!ctx.advance(RequestPhase::Rendered));
		assert_eq!(ctx.phase(), RequestPhase::Received);
	}

	#[rstest]
	fn test_new_context_is_empty() {
		let ctx = RenderContext::new("/bar");
		assert_eq!(ctx.url(), "/bar");
		assert!(ctx.app().is_none());
		assert!(ctx.state().is_none());
		assert_eq!(ctx.phase().to_string(), "received");
	}
}
