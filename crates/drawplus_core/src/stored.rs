//! Persisted image handle.

use crate::ImageFormat;
use chrono::{DateTime, Local};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An image that has been fully written to the managed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StoredImage {
    /// `file://` URL of the absolute path
    url: String,
    /// Location on disk
    path: PathBuf,
    /// Encoded format
    format: ImageFormat,
    /// Number of bytes written
    size_bytes: u64,
    /// When the file was written; used only for expiry
    created_at: DateTime<Local>,
}

impl StoredImage {
    /// Describe an image written to `path`.
    ///
    /// `path` should be absolute so the URL is usable by other processes.
    pub fn new(path: PathBuf, format: ImageFormat, size_bytes: u64) -> Self {
        Self {
            url: file_url(&path),
            path,
            format,
            size_bytes,
            created_at: Local::now(),
        }
    }
}

/// Build a `file://` URL for a local path.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
