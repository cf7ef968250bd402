//! SiliconFlow image generation wire types and settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Default image generation endpoint.
pub const SILICONFLOW_ENDPOINT: &str = "https://api.siliconflow.cn/v1/images/generations";

/// Response code SiliconFlow uses for "system busy, try again".
pub const BUSY_CODE: i64 = 50603;

/// Largest seed SiliconFlow accepts.
pub const MAX_SEED: u64 = 9_999_999_999;

/// SiliconFlow provider settings.
#[derive(
    Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct SiliconFlowConfig {
    /// Bearer token
    #[serde(default)]
    api_key: String,
    /// Model identifier
    #[serde(default = "default_model")]
    model: String,
    /// `<width>x<height>`
    #[serde(default = "default_image_size")]
    image_size: String,
    /// Retries for busy responses and transport failures
    #[serde(default = "default_max_retries")]
    max_retries: usize,
    /// Generation endpoint
    #[serde(default = "default_endpoint")]
    endpoint: String,
}

impl SiliconFlowConfig {
    /// Settings for `api_key` with every other field defaulted.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            image_size: default_image_size(),
            max_retries: default_max_retries(),
            endpoint: default_endpoint(),
        }
    }
}

impl Default for SiliconFlowConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl std::fmt::Debug for SiliconFlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiliconFlowConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("image_size", &self.image_size)
            .field("max_retries", &self.max_retries)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn default_model() -> String {
    "stabilityai/stable-diffusion-3-5-large".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_max_retries() -> usize {
    10
}

fn default_endpoint() -> String {
    SILICONFLOW_ENDPOINT.to_string()
}

/// Generation request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiliconFlowRequest {
    /// Model identifier
    pub model: String,
    /// Image description
    pub prompt: String,
    /// `<width>x<height>`
    pub image_size: String,
    /// Sampling seed
    pub seed: u64,
}

/// A generated image reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiliconFlowImage {
    /// Download URL
    pub url: String,
}

/// Generation response body; error replies carry `code` and `message` instead
/// of `images`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SiliconFlowResponse {
    /// Provider status code on failure
    #[serde(default)]
    pub code: Option<i64>,
    /// Provider message on failure
    #[serde(default)]
    pub message: Option<String>,
    /// Generated images
    #[serde(default)]
    pub images: Option<Vec<SiliconFlowImage>>,
    /// Seed actually used
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SiliconFlowResponse {
    /// Whether the provider asked us to come back later.
    pub fn is_busy(&self) -> bool {
        self.code == Some(BUSY_CODE)
    }

    /// URL of the first generated image.
    pub fn first_image_url(&self) -> Option<&str> {
        self.images
            .as_ref()
            .and_then(|images| images.first())
            .map(|image| image.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_response() {
        let response: SiliconFlowResponse = serde_json::from_str(
            r#"{"code": 50603, "message": "System is too busy now. Please try again later.", "data": null}"#,
        )
        .unwrap();
        assert!(response.is_busy());
        assert!(response.first_image_url().is_none());
    }

    #[test]
    fn test_image_response() {
        let response: SiliconFlowResponse = serde_json::from_str(
            r#"{"images": [{"url": "https://cdn.example.com/a.png"}, {"url": "https://cdn.example.com/b.png"}], "seed": 42, "timings": {"inference": 1.2}}"#,
        )
        .unwrap();
        assert!(!response.is_busy());
        assert_eq!(response.first_image_url(), Some("https://cdn.example.com/a.png"));
        assert_eq!(response.seed, Some(42));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: SiliconFlowConfig = serde_json::from_str(r#"{"api_key": "sk-1"}"#).unwrap();
        assert_eq!(config.model(), "stabilityai/stable-diffusion-3-5-large");
        assert_eq!(config.image_size(), "1024x1024");
        assert_eq!(*config.max_retries(), 10);
        assert_eq!(config.endpoint(), SILICONFLOW_ENDPOINT);
        assert!(!format!("{:?}", config).contains("sk-1"));
    }
}
