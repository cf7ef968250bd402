//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Image payload was not valid base64
    #[display("Base64 decode failed: {}", _0)]
    Decode(String),
    /// Image payload was empty
    #[display("Refusing to store an empty image")]
    EmptyImage,
    /// Permission denied when accessing storage
    #[display("Permission denied: {}", _0)]
    PermissionDenied(String),
    /// I/O error during storage operation
    #[display("I/O error: {}", _0)]
    Io(String),
    /// Invalid storage configuration
    #[display("Invalid configuration: {}", _0)]
    InvalidConfig(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use drawplus_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::Decode("bad padding".to_string()));
/// assert!(format!("{}", err).contains("Base64 decode failed"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Wrap an I/O error, mapping permission failures to their own kind.
    #[track_caller]
    pub fn from_io(err: &std::io::Error, context: &str) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                StorageErrorKind::PermissionDenied(format!("{}: {}", context, err))
            }
            _ => StorageErrorKind::Io(format!("{}: {}", context, err)),
        };
        Self::new(kind)
    }
}
