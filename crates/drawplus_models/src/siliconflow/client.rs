//! SiliconFlow text-to-image client.

use crate::openrouter::DEFAULT_TIMEOUT;
use crate::siliconflow::{MAX_SEED, SiliconFlowConfig, SiliconFlowRequest, SiliconFlowResponse};
use drawplus_core::{ImageFormat, StoredImage};
use drawplus_error::{GenerationError, GenerationErrorKind, HttpError, RetryableError};
use drawplus_storage::ImageStore;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry2::strategy::ExponentialBackoff;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, info, instrument, warn};

/// Pause requested when the provider reports it is busy.
const BUSY_PAUSE: Duration = Duration::from_secs(1);

/// Generates an image with SiliconFlow, downloads it, and stores it locally.
///
/// Busy replies and transport failures are retried with exponential backoff
/// (2, 4, 8, ... seconds) up to `max_retries` times per step. Everything else
/// fails immediately.
#[derive(Debug, Clone)]
pub struct SiliconFlowClient {
    http: Client,
    config: SiliconFlowConfig,
    store: Arc<ImageStore>,
}

impl SiliconFlowClient {
    /// Create a client that saves downloaded images into `store`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPool` if no API key is configured, or a network error
    /// if the HTTP client cannot be built.
    pub fn new(config: SiliconFlowConfig, store: Arc<ImageStore>) -> Result<Self, GenerationError> {
        if config.api_key().trim().is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::InvalidPool(
                "no SiliconFlow API key configured".to_string(),
            )));
        }

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            store,
        })
    }

    /// Provider settings.
    pub fn config(&self) -> &SiliconFlowConfig {
        &self.config
    }

    /// Generate an image for `prompt`, with a random seed unless one is given.
    ///
    /// # Errors
    ///
    /// - `NoImageFound` if the provider returned no images
    /// - `MalformedResponse` for provider errors and failed downloads
    /// - `TransientNetwork` once retries are exhausted
    /// - `Storage` if the image cannot be written
    #[instrument(skip(self, prompt), fields(model = %self.config.model(), prompt_len = prompt.len()))]
    pub async fn generate(
        &self,
        prompt: &str,
        seed: Option<u64>,
    ) -> Result<StoredImage, GenerationError> {
        let seed = seed.unwrap_or_else(|| rand::thread_rng().gen_range(0..=MAX_SEED));
        let body = SiliconFlowRequest {
            model: self.config.model().clone(),
            prompt: prompt.to_string(),
            image_size: self.config.image_size().clone(),
            seed,
        };
        debug!(seed, image_size = %body.image_size, "Requesting SiliconFlow image");

        let url = Retry::spawn(self.backoff(), || self.request_image_url(&body)).await?;
        info!(%url, "SiliconFlow image ready");

        let bytes = Retry::spawn(self.backoff(), || self.download(&url)).await?;
        let stored = self.store.save(&bytes, ImageFormat::Jpeg).await?;
        Ok(stored)
    }

    /// Doubling delays starting from the transient-network backoff, capped at
    /// its max delay. The attempt count comes from the configuration.
    fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        let (initial_ms, _, max_delay_secs) = GenerationError::new(
            GenerationErrorKind::TransientNetwork(String::new()),
        )
        .retry_strategy_params();
        ExponentialBackoff::from_millis(2)
            .factor(initial_ms / 2)
            .max_delay(Duration::from_secs(max_delay_secs))
            .take(*self.config.max_retries())
    }

    async fn request_image_url(
        &self,
        body: &SiliconFlowRequest,
    ) -> Result<String, RetryError<GenerationError>> {
        let response = self
            .http
            .post(self.config.endpoint())
            .bearer_auth(self.config.api_key())
            .json(body)
            .send()
            .await
            .map_err(|e| classify(network_error("SiliconFlow request failed", &e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify(network_error("Failed to read SiliconFlow response", &e)))?;

        let parsed: SiliconFlowResponse = serde_json::from_str(&text).map_err(|e| {
            RetryError::Permanent(GenerationError::new(
                GenerationErrorKind::MalformedResponse(format!(
                    "SiliconFlow returned HTTP {} with unreadable body: {}",
                    status.as_u16(),
                    e
                )),
            ))
        })?;

        if parsed.is_busy() {
            warn!("SiliconFlow is busy, retrying shortly");
            return Err(RetryError::Transient {
                err: GenerationError::new(GenerationErrorKind::TransientNetwork(
                    parsed
                        .message
                        .unwrap_or_else(|| "SiliconFlow is busy".to_string()),
                )),
                retry_after: Some(BUSY_PAUSE),
            });
        }

        if !status.is_success() {
            let message = parsed
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "SiliconFlow returned an error");
            return Err(RetryError::Permanent(GenerationError::new(
                GenerationErrorKind::MalformedResponse(message),
            )));
        }

        match parsed.first_image_url() {
            Some(url) => Ok(url.to_string()),
            None => {
                warn!("SiliconFlow response contained no images");
                Err(RetryError::Permanent(GenerationError::new(
                    GenerationErrorKind::NoImageFound,
                )))
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, RetryError<GenerationError>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| classify(network_error("Image download failed", &e)))?;

        if response.status() != StatusCode::OK {
            warn!(status = response.status().as_u16(), "Image download rejected");
            return Err(RetryError::Permanent(GenerationError::new(
                GenerationErrorKind::MalformedResponse(format!(
                    "image download returned HTTP {}",
                    response.status().as_u16()
                )),
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify(network_error("Image download interrupted", &e)))?;
        debug!(size = bytes.len(), "Downloaded image");
        Ok(bytes.to_vec())
    }
}

fn network_error(context: &str, err: &reqwest::Error) -> GenerationError {
    GenerationError::new(GenerationErrorKind::TransientNetwork(format!(
        "{}: {}",
        context, err
    )))
}

fn classify(err: GenerationError) -> RetryError<GenerationError> {
    if err.is_retryable() {
        warn!(error = %err.kind, "Transient SiliconFlow failure, will retry");
        RetryError::Transient {
            err,
            retry_after: None,
        }
    } else {
        RetryError::Permanent(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawplus_storage::ImageStoreConfig;

    #[test]
    fn test_missing_key_rejected() {
        let store = Arc::new(ImageStore::new(ImageStoreConfig::new("unused")));
        let err = SiliconFlowClient::new(SiliconFlowConfig::default(), store).unwrap_err();
        assert!(matches!(err.kind, GenerationErrorKind::InvalidPool(_)));
    }

    #[test]
    fn test_backoff_doubles_in_seconds() {
        let store = Arc::new(ImageStore::new(ImageStoreConfig::new("unused")));
        let client =
            SiliconFlowClient::new(SiliconFlowConfig::new("sk").with_max_retries(4), store)
                .unwrap();
        let delays: Vec<u64> = client.backoff().map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16]);
    }

    #[test]
    fn test_backoff_capped_by_retry_params() {
        let store = Arc::new(ImageStore::new(ImageStoreConfig::new("unused")));
        let client =
            SiliconFlowClient::new(SiliconFlowConfig::new("sk").with_max_retries(8), store)
                .unwrap();
        let (_, _, max_delay_secs) =
            GenerationError::new(GenerationErrorKind::TransientNetwork(String::new()))
                .retry_strategy_params();
        let delays: Vec<u64> = client.backoff().map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 60, 60, 60]);
        assert!(delays.iter().all(|d| *d <= max_delay_secs));
    }

    #[test]
    fn test_transport_errors_are_transient() {
        let err = GenerationError::new(GenerationErrorKind::TransientNetwork("reset".into()));
        assert!(matches!(classify(err), RetryError::Transient { .. }));

        let err = GenerationError::new(GenerationErrorKind::NoImageFound);
        assert!(matches!(classify(err), RetryError::Permanent(_)));
    }
}
