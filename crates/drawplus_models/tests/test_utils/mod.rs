//! Test utilities for provider tests.
//!
//! Provides a scripted [`ImageApi`] and canned provider responses.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drawplus_error::HttpError;
use drawplus_models::openrouter::{ChatRequest, ImageApi, RawResponse};
use drawplus_rate_limit::Credential;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Smallest PNG header that sniffs as PNG.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// What the mock does for one call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response
    Respond(RawResponse),
    /// Fail at the transport level
    NetworkError(String),
}

/// One recorded call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Endpoint the request was sent to
    pub endpoint: String,
    /// Pool index of the credential used
    pub credential_index: usize,
    /// The credential itself
    pub credential_key: String,
    /// Request body
    pub body: ChatRequest,
}

/// Transport that replays a fixed script and records every call.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedApi {
    /// Replay `replies` in order; extra calls fail with a network error.
    pub fn new(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ImageApi for ScriptedApi {
    async fn send(
        &self,
        endpoint: &str,
        credential: &Credential,
        body: &ChatRequest,
    ) -> Result<RawResponse, HttpError> {
        self.calls.lock().push(RecordedCall {
            endpoint: endpoint.to_string(),
            credential_index: credential.index(),
            credential_key: credential.key().to_string(),
            body: body.clone(),
        });

        match self.replies.lock().pop_front() {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::NetworkError(message)) => Err(HttpError::new(message)),
            None => Err(HttpError::new("script exhausted")),
        }
    }
}

/// A data URI wrapping [`PNG_BYTES`].
pub fn png_data_uri() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES))
}

/// 200 response carrying one inline image.
pub fn image_response(data_uri: &str) -> RawResponse {
    RawResponse::new(
        200,
        serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "images": [{"type": "image_url", "image_url": {"url": data_uri}}]
                },
                "finish_reason": "stop"
            }]
        })
        .to_string(),
    )
}

/// 200 response with prose only.
pub fn text_response(text: &str) -> RawResponse {
    RawResponse::new(
        200,
        serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
        .to_string(),
    )
}

/// 429 response.
pub fn quota_response() -> RawResponse {
    RawResponse::new(
        429,
        r#"{"error":{"message":"Rate limit exceeded: free-models-per-day","code":429}}"#,
    )
}

/// 200 response refused by the content filter.
pub fn filtered_response(with_image: bool) -> RawResponse {
    let images = if with_image {
        serde_json::json!([{"image_url": {"url": png_data_uri()}}])
    } else {
        serde_json::json!([])
    };
    RawResponse::new(
        200,
        serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": null, "images": images},
                "finish_reason": "content-filtered",
                "native_finish_reason": "IMAGE_SAFETY"
            }]
        })
        .to_string(),
    )
}
