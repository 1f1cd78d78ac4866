//! Aggregated rendering error.

use crate::component::RenderError;
use crate::router::ResolveError;
use crate::ssr::PreloadError;
use crate::template::TemplateError;

/// Outcome of a failed request render.
#[derive(Debug, thiserror::Error)]
pub enum SsrError {
	/// No route matched the path.
	#[error("no route matches `{0}`")]
	NotFound(String),

	/// Route resolution failed.
	#[error(transparent)]
	Resolve(#[from] ResolveError),

	/// A data hook failed, panicked or timed out.
	#[error(transparent)]
	Preload(#[from] PreloadError),

	/// A component failed to render.
	#[error(transparent)]
	Render(#[from] RenderError),

	/// The document could not be composed.
	#[error(transparent)]
	Template(#[from] TemplateError),
}

impl SsrError {
	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::NotFound(_) => 404,
			_ => 500,
		}
	}

	/// Returns true for [`SsrError::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::time::Duration;

	#[rstest]
	#[case(SsrError::NotFound("/missing".to_string()), 404)]
	#[case(SsrError::Resolve(ResolveError::NoNavigation), 500)]
	#[case(SsrError::Preload(PreloadError::TimedOut(Duration::from_secs(1))), 500)]
	#[case(SsrError::Render(RenderError::component("Foo", "boom")), 500)]
	#[case(SsrError::Template(TemplateError::MissingOutlet), 500)]
	fn test_status_codes(#[case] error: SsrError, #[case] status: u16) {
		assert_eq!(error.status_code(), status);
		assert_eq!(error.is_not_found(), status == 404);
	}

	#[rstest]
	fn test_display() {
		assert_eq!(
			SsrError::NotFound("/missing".to_string()).to_string(),
			"no route matches `/missing`"
		);
	}
}
