//! Expiring image store.
//!
//! Generated images are only needed long enough for the chat layer to pick
//! them up, so every save first deletes this store's files older than the TTL.
//! Files are written under a hidden temporary name and renamed into place, so a
//! crash mid-write never leaves a half-written image under a real name.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use drawplus_core::{ImageFormat, StoredImage};
use drawplus_error::{StorageError, StorageErrorKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};

/// Default lifetime of a stored image.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Extensions the sweep is allowed to delete.
const MANAGED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Where and how long images are kept.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct ImageStoreConfig {
    /// Managed directory, created on demand
    #[serde(default = "default_directory")]
    directory: PathBuf,
    /// Seconds before a stored image becomes eligible for deletion
    #[serde(default = "default_ttl_secs")]
    ttl_secs: u64,
    /// Filename prefix; the sweep only touches files carrying it
    #[serde(default = "default_prefix")]
    prefix: String,
}

impl ImageStoreConfig {
    /// Store images under `directory` with the default TTL and prefix.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ttl_secs: default_ttl_secs(),
            prefix: default_prefix(),
        }
    }

    /// The TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self::new(default_directory())
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("images")
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_prefix() -> String {
    "gemini_image".to_string()
}

/// Writes decoded images to disk and remembers the most recent one.
///
/// The "last saved" reference is a single slot owned by this instance: each
/// successful save overwrites it, and nothing older is kept.
#[derive(Debug)]
pub struct ImageStore {
    config: ImageStoreConfig,
    sweep_lock: tokio::sync::Mutex<()>,
    last_saved: Mutex<Option<StoredImage>>,
}

impl ImageStore {
    /// Create a store. Nothing touches the filesystem until the first save.
    pub fn new(config: ImageStoreConfig) -> Self {
        debug!(
            directory = %config.directory.display(),
            ttl_secs = config.ttl_secs,
            prefix = %config.prefix,
            "Creating image store"
        );
        Self {
            config,
            sweep_lock: tokio::sync::Mutex::new(()),
            last_saved: Mutex::new(None),
        }
    }

    /// The store configuration.
    pub fn config(&self) -> &ImageStoreConfig {
        &self.config
    }

    /// The managed directory as configured.
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Decode a base64 payload and save it.
    ///
    /// # Errors
    ///
    /// Returns `Decode` if the payload is not valid base64, otherwise whatever
    /// [`save`](Self::save) returns.
    #[instrument(skip(self, encoded), fields(encoded_len = encoded.len()))]
    pub async fn save_base64(
        &self,
        encoded: &str,
        format: ImageFormat,
    ) -> Result<StoredImage, StorageError> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            tracing::error!(error = %e, "Base64 decode failed");
            StorageError::new(StorageErrorKind::Decode(e.to_string()))
        })?;
        self.save(&bytes, format).await
    }

    /// Persist image bytes under a fresh unique name.
    ///
    /// Expired files are swept first. The returned path only exists once the
    /// full write has completed.
    ///
    /// # Errors
    ///
    /// Returns `EmptyImage` for an empty buffer, or an I/O error if the
    /// directory cannot be created or the file cannot be written.
    #[instrument(skip(self, bytes), fields(size = bytes.len(), format = %format))]
    pub async fn save(&self, bytes: &[u8], format: ImageFormat) -> Result<StoredImage, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::new(StorageErrorKind::EmptyImage));
        }

        tokio::fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| StorageError::from_io(&e, "creating image directory"))?;

        if let Err(e) = self.sweep_expired().await {
            warn!(error = %e, "Expired image sweep failed, continuing with save");
        }

        let directory = tokio::fs::canonicalize(&self.config.directory)
            .await
            .map_err(|e| StorageError::from_io(&e, "resolving image directory"))?;

        let file_name = self.unique_name(format);
        let final_path = directory.join(&file_name);
        let temp_path = directory.join(format!(".{}.part", file_name));

        if let Err(e) = write_then_rename(&temp_path, &final_path, bytes).await {
            match tokio::fs::remove_file(&temp_path).await {
                Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                    warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove partial image");
                }
                _ => {}
            }
            return Err(e);
        }

        let stored = StoredImage::new(final_path, format, bytes.len() as u64);
        *self.last_saved.lock() = Some(stored.clone());

        info!(path = %stored.path().display(), "Image saved");
        debug!(size_bytes = stored.size_bytes(), "Saved image size");
        Ok(stored)
    }

    /// The most recent successful save, if any.
    pub fn last_saved(&self) -> Option<StoredImage> {
        self.last_saved.lock().clone()
    }

    /// Delete this store's images older than the TTL.
    ///
    /// Files that do not carry the store prefix or an image extension are left
    /// alone. Expired partial writes are removed too. Per-file failures are
    /// logged and skipped.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error only if the directory itself cannot be listed.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<usize, StorageError> {
        let _guard = self.sweep_lock.lock().await;

        let mut entries = match tokio::fs::read_dir(&self.config.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::from_io(&e, "listing image directory")),
        };

        let ttl = self.config.ttl();
        let now = SystemTime::now();
        let mut removed = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Stopped sweep on unreadable directory entry");
                    break;
                }
            };

            let path = entry.path();
            if !self.is_managed(&path) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read image age");
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age <= ttl {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    info!(path = %path.display(), age_secs = age.as_secs(), "Removed expired image");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove expired image"),
            }
        }

        Ok(removed)
    }

    /// `<prefix>_<YYYYmmdd_HHMMSS>_<8 hex>.<ext>`
    fn unique_name(&self, format: ImageFormat) -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let simple = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}_{}.{}",
            self.config.prefix,
            timestamp,
            &simple[..8],
            format.extension()
        )
    }

    /// Images carrying the store prefix, plus the `.<name>.part` files a
    /// crash between write and rename leaves behind.
    fn is_managed(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name
            .strip_prefix('.')
            .and_then(|partial| partial.strip_suffix(".part"))
            .unwrap_or(name);
        let Some(stem) = name.strip_prefix(&self.config.prefix) else {
            return false;
        };
        if !stem.starts_with('_') {
            return false;
        }
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                MANAGED_EXTENSIONS
                    .iter()
                    .any(|managed| managed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

async fn write_then_rename(temp: &Path, target: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    tokio::fs::write(temp, bytes)
        .await
        .map_err(|e| StorageError::from_io(&e, "writing image"))?;
    tokio::fs::rename(temp, target)
        .await
        .map_err(|e| StorageError::from_io(&e, "moving image into place"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name_shape() {
        let store = ImageStore::new(ImageStoreConfig::new("unused"));
        let name = store.unique_name(ImageFormat::Jpeg);
        assert!(name.starts_with("gemini_image_"));
        assert!(name.ends_with(".jpeg"));
        // prefix + '_' + 15-char timestamp + '_' + 8 hex + ".jpeg"
        assert_eq!(name.len(), "gemini_image".len() + 1 + 15 + 1 + 8 + 5);
    }

    #[test]
    fn test_is_managed_requires_prefix_and_extension() {
        let store = ImageStore::new(ImageStoreConfig::new("unused"));
        assert!(store.is_managed(Path::new("/x/gemini_image_20250101_000000_abcd1234.png")));
        assert!(store.is_managed(Path::new("/x/gemini_image_20250101_000000_abcd1234.JPG")));
        assert!(!store.is_managed(Path::new("/x/gemini_image_20250101_000000_abcd1234.txt")));
        assert!(store.is_managed(Path::new("/x/.gemini_image_20250101_000000_abcd1234.png.part")));
        assert!(!store.is_managed(Path::new("/x/.gemini_image_20250101_000000_abcd1234.png")));
        assert!(!store.is_managed(Path::new("/x/.siliconflow_image_20250101_000000_abcd1234.png.part")));
        assert!(!store.is_managed(Path::new("/x/siliconflow_image_20250101_000000_abcd1234.png")));
        assert!(!store.is_managed(Path::new("/x/gemini_imagery.png")));
    }
}
