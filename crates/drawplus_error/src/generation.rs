//! Image generation error types and retry classification.

use crate::{HttpError, StorageError, StorageErrorKind};

/// Why an image generation request failed.
///
/// This is the error kind surfaced to the chat layer. Each variant maps to a
/// distinct message the end user can act on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Credential pool is empty or contains blank entries
    #[display("Invalid credential pool: {}", _0)]
    InvalidPool(String),
    /// Every credential in the pool hit its quota or rate limit
    #[display("All API keys exhausted their quota: {}", _0)]
    QuotaExceeded(String),
    /// Provider refused the prompt on policy grounds
    #[display("Content filtered: {}", _0)]
    ContentFiltered(String),
    /// Transport failure or timeout on the last available credential
    #[display("Network error: {}", _0)]
    TransientNetwork(String),
    /// Provider answered but the response was unusable
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
    /// Provider answered with text only
    #[display("No image found in provider response")]
    NoImageFound,
    /// Image payload could not be decoded
    #[display("Image decode failed: {}", _0)]
    Decode(String),
    /// Image could not be written to disk
    #[display("Storage failure: {}", _0)]
    Storage(String),
    /// Caller exceeded its request allowance
    #[display("Rate limited, retry after {} seconds", retry_after_secs)]
    RateLimited {
        /// Seconds until the caller may try again
        retry_after_secs: u64,
    },
}

impl GenerationErrorKind {
    /// Check if this failure can be fixed by trying another credential.
    ///
    /// Content filtering and malformed responses are never retried: switching
    /// keys does not change what the provider thinks of the prompt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationErrorKind::QuotaExceeded(_) | GenerationErrorKind::TransientNetwork(_)
        )
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            GenerationErrorKind::QuotaExceeded(_) => (5000, 3, 40),
            GenerationErrorKind::TransientNetwork(_) => (2000, 10, 60),
            _ => (2000, 5, 60),
        }
    }

    /// A message suitable for showing to the person who asked for the image.
    pub fn user_message(&self) -> String {
        match self {
            GenerationErrorKind::InvalidPool(_) => {
                "Image generation is not configured: no usable API keys.".to_string()
            }
            GenerationErrorKind::QuotaExceeded(_) => {
                "All API keys have reached their limit. Please try again later.".to_string()
            }
            GenerationErrorKind::ContentFiltered(reason) => format!(
                "The content filter blocked this image ({}). Try rewording the prompt or using a different reference image.",
                reason
            ),
            GenerationErrorKind::TransientNetwork(_) => {
                "Could not reach the image service. Please try again shortly.".to_string()
            }
            GenerationErrorKind::MalformedResponse(msg) => {
                format!("The image service returned an error: {}", msg)
            }
            GenerationErrorKind::NoImageFound => {
                "The model replied with text instead of an image. Try rephrasing the request."
                    .to_string()
            }
            GenerationErrorKind::Decode(_) => {
                "The image service returned an image that could not be decoded.".to_string()
            }
            GenerationErrorKind::Storage(_) => {
                "The generated image could not be saved.".to_string()
            }
            GenerationErrorKind::RateLimited { retry_after_secs } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after_secs
            ),
        }
    }
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use drawplus_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::NoImageFound);
/// assert!(format!("{}", err).contains("No image found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &GenerationErrorKind {
        &self.kind
    }
}

impl From<StorageError> for GenerationError {
    #[track_caller]
    fn from(err: StorageError) -> Self {
        let kind = match err.kind {
            StorageErrorKind::Decode(msg) => GenerationErrorKind::Decode(msg),
            other => GenerationErrorKind::Storage(other.to_string()),
        };
        Self::new(kind)
    }
}

impl From<HttpError> for GenerationError {
    #[track_caller]
    fn from(err: HttpError) -> Self {
        Self::new(GenerationErrorKind::TransientNetwork(err.message))
    }
}

/// Trait for errors that support retry logic.
///
/// This trait allows error types to specify whether they should trigger a retry
/// and what retry strategy parameters to use.
///
/// # Examples
///
/// ```
/// use drawplus_error::{GenerationError, GenerationErrorKind, RetryableError};
///
/// let err = GenerationError::new(GenerationErrorKind::TransientNetwork(
///     "connection reset".to_string(),
/// ));
///
/// assert!(err.is_retryable());
/// let (backoff, retries, _max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 2000);
/// assert_eq!(retries, 10);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (2000, 5, 60)
    }
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        self.kind.retry_strategy_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_credential_failures_are_retryable() {
        assert!(GenerationErrorKind::QuotaExceeded("429".into()).is_retryable());
        assert!(GenerationErrorKind::TransientNetwork("timeout".into()).is_retryable());
        assert!(!GenerationErrorKind::ContentFiltered("policy".into()).is_retryable());
        assert!(!GenerationErrorKind::MalformedResponse("HTTP 400".into()).is_retryable());
        assert!(!GenerationErrorKind::NoImageFound.is_retryable());
        assert!(!GenerationErrorKind::InvalidPool("empty".into()).is_retryable());
    }

    #[test]
    fn test_storage_decode_maps_to_decode_kind() {
        let err: GenerationError =
            StorageError::new(StorageErrorKind::Decode("invalid byte".into())).into();
        assert_eq!(err.kind, GenerationErrorKind::Decode("invalid byte".into()));

        let err: GenerationError =
            StorageError::new(StorageErrorKind::Io("disk full".into())).into();
        assert!(matches!(err.kind, GenerationErrorKind::Storage(_)));
    }

    #[test]
    fn test_user_message_mentions_filter_reason() {
        let msg = GenerationErrorKind::ContentFiltered("SAFETY".into()).user_message();
        assert!(msg.contains("SAFETY"));
        assert!(msg.contains("rewording"));
    }
}
