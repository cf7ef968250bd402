//! Transport for the chat-completions endpoint.

use crate::openrouter::ChatRequest;
use async_trait::async_trait;
use derive_getters::Getters;
use drawplus_error::HttpError;
use drawplus_rate_limit::Credential;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Default OpenRouter chat-completions URL.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Overall timeout for one provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const REFERER: &str = "https://github.com/astrbot";
const TITLE: &str = "AstrBot LLM Draw Plus";

/// Resolve the chat-completions URL for an optional custom API base.
pub fn chat_completions_url(api_base: Option<&str>) -> String {
    match api_base.map(|base| base.trim().trim_end_matches('/')) {
        Some(base) if !base.is_empty() => format!("{}/v1/chat/completions", base),
        _ => DEFAULT_ENDPOINT.to_string(),
    }
}

/// Status and body of a provider response, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct RawResponse {
    /// HTTP status code
    status: u16,
    /// Response body as text
    body: String,
}

impl RawResponse {
    /// Wrap a status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one chat request on behalf of one credential.
///
/// Any response the server produced, whatever its status, is `Ok`. `Err` is
/// reserved for transport failures and timeouts.
#[async_trait]
pub trait ImageApi: Send + Sync {
    /// POST `body` to `endpoint` authenticated with `credential`.
    async fn send(
        &self,
        endpoint: &str,
        credential: &Credential,
        body: &ChatRequest,
    ) -> Result<RawResponse, HttpError>;
}

/// reqwest-backed [`ImageApi`].
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
}

impl OpenRouterClient {
    /// Create a client whose calls give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageApi for OpenRouterClient {
    #[instrument(skip(self, credential, body), fields(credential_index = credential.index(), model = %body.model()))]
    async fn send(
        &self,
        endpoint: &str,
        credential: &Credential,
        body: &ChatRequest,
    ) -> Result<RawResponse, HttpError> {
        debug!(endpoint, "Sending image generation request");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(credential.key())
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "HTTP request failed");
                HttpError::new(format!("Request failed: {}", e))
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            error!(status, error = %e, "Failed to read response body");
            HttpError::with_status(status, format!("Failed to read response body: {}", e))
        })?;

        debug!(status, body_len = text.len(), "Received response");
        Ok(RawResponse::new(status, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        assert_eq!(chat_completions_url(None), DEFAULT_ENDPOINT);
        assert_eq!(chat_completions_url(Some("  ")), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_custom_base_trailing_slash_trimmed() {
        assert_eq!(
            chat_completions_url(Some("https://proxy.example.com/api/")),
            "https://proxy.example.com/api/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url(Some("http://localhost:8080")),
            "http://localhost:8080/v1/chat/completions"
        );
    }
}
