//! Error types for the drawplus library.
//!
//! This crate provides the foundation error types used throughout the drawplus
//! workspace. Every error records the source location where it was created.

mod config;
mod generation;
mod http;
mod storage;

pub use config::ConfigError;
pub use generation::{GenerationError, GenerationErrorKind, RetryableError};
pub use http::HttpError;
pub use storage::{StorageError, StorageErrorKind};

/// Crate-level error aggregating every domain error.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum DrawPlusError {
    /// HTTP transport error
    #[display("{}", _0)]
    Http(HttpError),
    /// Configuration error
    #[display("{}", _0)]
    Config(ConfigError),
    /// Storage error
    #[display("{}", _0)]
    Storage(StorageError),
    /// Generation error
    #[display("{}", _0)]
    Generation(GenerationError),
}

/// Result type for drawplus operations.
pub type DrawPlusResult<T> = Result<T, DrawPlusError>;
