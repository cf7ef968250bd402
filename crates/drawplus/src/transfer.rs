//! Handing stored images to the chat host.

use async_trait::async_trait;
use drawplus_error::HttpError;
use std::path::Path;
use tracing::{debug, instrument};

/// Makes a locally stored image reachable by the chat host.
///
/// Implementations return the path or URL the host should load. When the
/// host runs on another machine this usually means uploading the file.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Deliver the file at `path`.
    async fn send(&self, path: &Path) -> Result<String, HttpError>;
}

/// Pass-through transfer for a chat host sharing this filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransfer;

#[async_trait]
impl FileTransfer for LocalTransfer {
    #[instrument(skip(self))]
    async fn send(&self, path: &Path) -> Result<String, HttpError> {
        debug!("Image already local, no transfer needed");
        Ok(path.display().to_string())
    }
}
