//! Test utilities for service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drawplus::drawplus_error::HttpError;
use drawplus::drawplus_models::openrouter::{ChatRequest, ImageApi, RawResponse};
use drawplus::drawplus_rate_limit::Credential;
use drawplus::drawplus_storage::ImageStoreConfig;
use drawplus::{DrawPlusConfig, FileTransfer, ProviderConfig};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Smallest PNG header that sniffs as PNG.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Transport that answers every call with the same response.
#[derive(Debug)]
pub struct FixedApi {
    response: RawResponse,
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
    bodies: Mutex<Vec<ChatRequest>>,
}

impl FixedApi {
    /// Always answer with `response`.
    pub fn new(response: RawResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with a valid image.
    pub fn with_image() -> Self {
        Self::new(image_response())
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Credentials used, in call order.
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }

    /// Request bodies, in call order.
    pub fn bodies(&self) -> Vec<ChatRequest> {
        self.bodies.lock().clone()
    }
}

#[async_trait]
impl ImageApi for FixedApi {
    async fn send(
        &self,
        _endpoint: &str,
        credential: &Credential,
        body: &ChatRequest,
    ) -> Result<RawResponse, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().push(credential.key().to_string());
        self.bodies.lock().push(body.clone());
        Ok(self.response.clone())
    }
}

/// Transfer that records paths and answers with a fake remote URL.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    sent: Mutex<Vec<PathBuf>>,
}

impl RecordingTransfer {
    /// Paths handed to the transfer so far.
    pub fn sent(&self) -> Vec<PathBuf> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl FileTransfer for RecordingTransfer {
    async fn send(&self, path: &Path) -> Result<String, HttpError> {
        self.sent.lock().push(path.to_path_buf());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("http://chat-host:3658/images/{}", name))
    }
}

/// Transfer that always fails.
#[derive(Debug, Default)]
pub struct BrokenTransfer;

#[async_trait]
impl FileTransfer for BrokenTransfer {
    async fn send(&self, _path: &Path) -> Result<String, HttpError> {
        Err(HttpError::new("receiver unreachable"))
    }
}

/// 200 response carrying one inline PNG.
pub fn image_response() -> RawResponse {
    let uri = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES));
    RawResponse::new(
        200,
        serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "images": [{"type": "image_url", "image_url": {"url": uri}}]
                },
                "finish_reason": "stop"
            }]
        })
        .to_string(),
    )
}

/// 429 response.
pub fn quota_response() -> RawResponse {
    RawResponse::new(429, r#"{"error":{"message":"Rate limit exceeded","code":429}}"#)
}

/// Configuration with `keys`, storing images under `directory`.
pub fn config_with_keys(keys: &[&str], directory: &Path) -> DrawPlusConfig {
    DrawPlusConfig::default()
        .with_provider(ProviderConfig::new(
            keys.iter().map(|k| k.to_string()).collect(),
        ))
        .with_storage(ImageStoreConfig::new(directory))
}

