//! Per-attempt generation outcome.

use crate::ImageFormat;
use drawplus_error::{GenerationError, GenerationErrorKind};

/// What a single provider exchange produced.
///
/// Exactly one variant per attempt. The orchestrator decides, per variant,
/// whether to persist, rotate credentials, or stop.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum GenerationOutcome {
    /// An image was extracted from the response
    #[display("success ({} bytes of {})", image_bytes.len(), format)]
    Success {
        /// Decoded image bytes
        image_bytes: Vec<u8>,
        /// Format named by the provider
        format: ImageFormat,
    },
    /// The provider answered with text only
    #[display("no image found")]
    NoImageFound,
    /// The provider refused the prompt
    #[display("content filtered: {}", reason)]
    ContentFiltered {
        /// Provider-supplied reason
        reason: String,
    },
    /// The credential hit its quota or rate limit
    #[display("quota exceeded: {}", message)]
    QuotaExceeded {
        /// Provider error message
        message: String,
    },
    /// The request never completed
    #[display("transient network error: {}", message)]
    TransientNetworkError {
        /// Transport error description
        message: String,
    },
    /// The response could not be understood
    #[display("malformed response: {}", message)]
    MalformedResponse {
        /// Provider error message or parse failure
        message: String,
    },
}

impl GenerationOutcome {
    /// Build a success outcome. Persisting it yields a `StoredImage`.
    pub fn success(image_bytes: Vec<u8>, format: ImageFormat) -> Self {
        GenerationOutcome::Success {
            image_bytes,
            format,
        }
    }

    /// Whether trying the next credential could change this outcome.
    pub fn should_rotate(&self) -> bool {
        matches!(
            self,
            GenerationOutcome::QuotaExceeded { .. } | GenerationOutcome::TransientNetworkError { .. }
        )
    }

    /// Convert a failed outcome into the error surfaced to callers.
    ///
    /// Returns `None` for `Success`.
    #[track_caller]
    pub fn into_error(self) -> Option<GenerationError> {
        let kind = match self {
            GenerationOutcome::Success { .. } => return None,
            GenerationOutcome::NoImageFound => GenerationErrorKind::NoImageFound,
            GenerationOutcome::ContentFiltered { reason } => {
                GenerationErrorKind::ContentFiltered(reason)
            }
            GenerationOutcome::QuotaExceeded { message } => {
                GenerationErrorKind::QuotaExceeded(message)
            }
            GenerationOutcome::TransientNetworkError { message } => {
                GenerationErrorKind::TransientNetwork(message)
            }
            GenerationOutcome::MalformedResponse { message } => {
                GenerationErrorKind::MalformedResponse(message)
            }
        };
        Some(GenerationError::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_only_for_credential_failures() {
        assert!(
            GenerationOutcome::QuotaExceeded {
                message: "429".into()
            }
            .should_rotate()
        );
        assert!(
            GenerationOutcome::TransientNetworkError {
                message: "timeout".into()
            }
            .should_rotate()
        );
        assert!(
            !GenerationOutcome::ContentFiltered {
                reason: "policy".into()
            }
            .should_rotate()
        );
        assert!(!GenerationOutcome::NoImageFound.should_rotate());
        assert!(!GenerationOutcome::success(vec![1], ImageFormat::Png).should_rotate());
    }

    #[test]
    fn test_success_carries_bytes_and_format() {
        assert_eq!(
            GenerationOutcome::success(vec![1, 2], ImageFormat::Webp),
            GenerationOutcome::Success {
                image_bytes: vec![1, 2],
                format: ImageFormat::Webp,
            }
        );
    }

    #[test]
    fn test_into_error_preserves_reason() {
        let err = GenerationOutcome::ContentFiltered {
            reason: "SAFETY".into(),
        }
        .into_error()
        .unwrap();
        assert_eq!(err.kind, GenerationErrorKind::ContentFiltered("SAFETY".into()));
        assert!(
            GenerationOutcome::success(vec![], ImageFormat::Png)
                .into_error()
                .is_none()
        );
    }
}
