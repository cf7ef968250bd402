//! Classify a provider response into a [`GenerationOutcome`].
//!
//! Checks run in a fixed order and the first match wins:
//!
//! 1. 429, or 402 whose body mentions "insufficient" → `QuotaExceeded`
//! 2. any other non-2xx → `MalformedResponse` with the provider message
//! 3. body without a choice, message or `content` field → `MalformedResponse`
//! 4. content-filter finish reason → `ContentFiltered`, even if an image is present
//! 5. first decodable entry in `message.images` → `Success`; entries of any
//!    other shape are skipped
//! 6. first data URI embedded in the message text → `Success`
//! 7. otherwise `NoImageFound`

use crate::openrouter::{ChatChoice, ChatResponse, RawResponse};
use drawplus_core::{DataUri, GenerationOutcome};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

const FILTERED_REASONS: &[&str] = &["content-filtered", "content_filter"];
const TEXT_EXCERPT_CHARS: usize = 200;

/// Stateless response classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseInterpreter;

impl ResponseInterpreter {
    /// Create an interpreter.
    pub fn new() -> Self {
        Self
    }

    /// Decide what one provider exchange produced.
    #[instrument(skip(self, response), fields(status = response.status(), body_len = response.body().len()))]
    pub fn interpret(&self, response: &RawResponse) -> GenerationOutcome {
        let status = *response.status();
        let parsed: Option<Value> = serde_json::from_str(response.body()).ok();

        if is_quota_status(status, response.body()) {
            let message = error_detail(parsed.as_ref(), status);
            warn!(status, %message, "Credential quota exhausted");
            return GenerationOutcome::QuotaExceeded { message };
        }

        if !response.is_success() {
            let message = error_detail(parsed.as_ref(), status);
            warn!(status, %message, "Provider returned an error");
            return GenerationOutcome::MalformedResponse { message };
        }

        let Some(body) = parsed else {
            return GenerationOutcome::MalformedResponse {
                message: "response body is not JSON".to_string(),
            };
        };

        let chat = match ChatResponse::deserialize(&body) {
            Ok(chat) => chat,
            Err(e) => {
                return GenerationOutcome::MalformedResponse {
                    message: format!("unexpected response shape: {}", e),
                };
            }
        };

        let Some(choice) = chat.choices.into_iter().next() else {
            return GenerationOutcome::MalformedResponse {
                message: "response has no choices".to_string(),
            };
        };

        if !has_content_field(&body) {
            return GenerationOutcome::MalformedResponse {
                message: "response message has no content field".to_string(),
            };
        }

        if let Some(reason) = filtered_reason(&choice) {
            warn!(%reason, "Provider filtered the request");
            return GenerationOutcome::ContentFiltered { reason };
        }

        match choice.finish_reason.as_deref() {
            None | Some("stop") => {}
            Some(other) => warn!(finish_reason = other, "Unexpected finish reason"),
        }

        extract_image(&choice)
    }
}

fn is_quota_status(status: u16, body: &str) -> bool {
    status == 429 || (status == 402 && body.to_lowercase().contains("insufficient"))
}

/// `error.message`, a bare `error` string, or the status code.
fn error_detail(body: Option<&Value>, status: u16) -> String {
    let error = body.and_then(|b| b.get("error"));
    match error {
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
        Some(Value::String(message)) => message.clone(),
        _ => format!("HTTP {}", status),
    }
}

/// `content` may be `null`, but the key must be there.
fn has_content_field(body: &Value) -> bool {
    body.pointer("/choices/0/message")
        .and_then(Value::as_object)
        .is_some_and(|message| message.contains_key("content"))
}

/// `image_url.url` of one image entry, if the entry has that shape.
fn entry_url(entry: &Value) -> Option<&str> {
    entry.get("image_url")?.get("url")?.as_str()
}

fn filtered_reason(choice: &ChatChoice) -> Option<String> {
    let finish = choice.finish_reason.as_deref()?;
    if !FILTERED_REASONS.contains(&finish) {
        return None;
    }
    Some(
        choice
            .native_finish_reason
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| finish.to_string()),
    )
}

fn extract_image(choice: &ChatChoice) -> GenerationOutcome {
    let mut last_decode_failure = None;

    for (index, entry) in choice.message.images().iter().enumerate() {
        let Some(url) = entry_url(entry) else {
            warn!(index, "Image entry has no URL, skipping");
            continue;
        };
        match DataUri::parse(url).and_then(|uri| Ok((uri.decode()?, *uri.format()))) {
            Ok((bytes, format)) => {
                debug!(index, %format, size = bytes.len(), "Found inline image");
                return GenerationOutcome::success(bytes, format);
            }
            Err(e) => {
                warn!(index, error = %e.kind, "Skipping unreadable image entry");
                last_decode_failure = Some(e.kind.to_string());
            }
        }
    }

    let text = choice.message.text();
    if let Some(uri) = DataUri::find_in_text(&text) {
        match uri.decode() {
            Ok(bytes) => {
                debug!(format = %uri.format(), size = bytes.len(), "Found data URI in text");
                return GenerationOutcome::success(bytes, *uri.format());
            }
            Err(e) => {
                warn!(error = %e.kind, "Skipping unreadable data URI in text");
                last_decode_failure = Some(e.kind.to_string());
            }
        }
    }

    if let Some(message) = last_decode_failure {
        return GenerationOutcome::MalformedResponse {
            message: format!("no decodable image: {}", message),
        };
    }

    let excerpt: String = text.chars().take(TEXT_EXCERPT_CHARS).collect();
    warn!(excerpt = %excerpt, "Model replied without an image");
    GenerationOutcome::NoImageFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_detection() {
        assert!(is_quota_status(429, ""));
        assert!(is_quota_status(402, r#"{"error":"Insufficient credits"}"#));
        assert!(!is_quota_status(402, r#"{"error":"payment required"}"#));
        assert!(!is_quota_status(500, "insufficient"));
    }

    #[test]
    fn test_error_detail_variants() {
        let nested = serde_json::json!({"error": {"message": "bad model", "code": 400}});
        assert_eq!(error_detail(Some(&nested), 400), "bad model");

        let flat = serde_json::json!({"error": "nope"});
        assert_eq!(error_detail(Some(&flat), 400), "nope");

        assert_eq!(error_detail(None, 503), "HTTP 503");
    }

    #[test]
    fn test_entry_url_shapes() {
        let good = serde_json::json!({"image_url": {"url": "data:image/png;base64,AA=="}});
        assert_eq!(entry_url(&good), Some("data:image/png;base64,AA=="));
        assert_eq!(entry_url(&serde_json::json!({"image_url": "flat"})), None);
        assert_eq!(entry_url(&serde_json::json!({"image_url": {"url": 7}})), None);
        assert_eq!(entry_url(&serde_json::json!("just a string")), None);
    }
}
