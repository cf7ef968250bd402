//! Caller-facing image generation service.

use crate::{DrawPlusConfig, FileTransfer, LocalTransfer, RateLimitSettings};
use derive_getters::Getters;
use drawplus_core::{GenerationRequest, ReferenceImage, StoredImage};
use drawplus_error::{DrawPlusError, GenerationError, GenerationErrorKind};
use drawplus_models::{GenerationOrchestrator, ImageApi, OpenRouterClient, SiliconFlowClient};
use drawplus_rate_limit::{
    CredentialPool, CredentialRotator, RateDecision, RateLimitError, RateLimiter,
};
use drawplus_storage::ImageStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Filename prefix for SiliconFlow images.
pub const SILICONFLOW_PREFIX: &str = "siliconflow_image";

/// A generated image, ready for the chat layer.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct GeneratedImage {
    /// `file://` URL of the stored image
    url: String,
    /// Path or URL the chat host should load
    path: String,
    /// The stored file
    stored: StoredImage,
}

/// Rate-limited, credential-rotating image generation.
///
/// Every entry point checks the caller against the rate limiter before any
/// provider traffic happens, so a throttled caller never consumes quota.
///
/// # Example
///
/// ```no_run
/// use drawplus::{DrawPlusConfig, ImageService, ProviderConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DrawPlusConfig::default()
///     .with_provider(ProviderConfig::new(vec!["sk-or-...".to_string()]));
/// let service = ImageService::from_config(config)?;
///
/// let image = service.generate("group-42", "a red panda", Vec::new()).await?;
/// println!("{}", image.path());
/// # Ok(())
/// # }
/// ```
pub struct ImageService<A: ImageApi = OpenRouterClient> {
    config: DrawPlusConfig,
    rate_limit_enabled: AtomicBool,
    limiter: RateLimiter,
    rotator: CredentialRotator,
    orchestrator: GenerationOrchestrator<A>,
    siliconflow: Option<SiliconFlowClient>,
    transfer: Arc<dyn FileTransfer>,
}

impl ImageService<OpenRouterClient> {
    /// Build a service talking to OpenRouter.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn from_config(config: DrawPlusConfig) -> Result<Self, DrawPlusError> {
        let api = OpenRouterClient::new(config.provider().timeout())?;
        Self::with_api(config, api)
    }
}

impl<A: ImageApi> ImageService<A> {
    /// Build a service around any transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    #[instrument(skip_all)]
    pub fn with_api(config: DrawPlusConfig, api: A) -> Result<Self, DrawPlusError> {
        config.validate()?;

        let rotator = CredentialRotator::new(CredentialPool::new(
            config.provider().api_keys().iter().cloned(),
        )?);
        let limiter = RateLimiter::new(config.rate_limit().limits());
        let store = Arc::new(ImageStore::new(config.storage().clone()));
        let orchestrator = GenerationOrchestrator::new(api, store);

        let siliconflow = match config.siliconflow() {
            Some(settings) if !settings.api_key().trim().is_empty() => {
                let store_config = config
                    .storage()
                    .clone()
                    .with_prefix(SILICONFLOW_PREFIX.to_string());
                let store = Arc::new(ImageStore::new(store_config));
                Some(SiliconFlowClient::new(settings.clone(), store)?)
            }
            Some(_) => {
                warn!("SiliconFlow section present without an API key, provider disabled");
                None
            }
            None => None,
        };

        info!(
            pool_size = rotator.pool_size(),
            model = %config.provider().model(),
            rate_limit = *config.rate_limit().enabled(),
            siliconflow = siliconflow.is_some(),
            "Image service ready"
        );

        Ok(Self {
            rate_limit_enabled: AtomicBool::new(*config.rate_limit().enabled()),
            config,
            limiter,
            rotator,
            orchestrator,
            siliconflow,
            transfer: Arc::new(LocalTransfer),
        })
    }

    /// Use `transfer` to deliver images when the chat host is remote.
    pub fn with_transfer(mut self, transfer: Arc<dyn FileTransfer>) -> Self {
        self.transfer = transfer;
        self
    }

    /// Check and record a request for `caller`.
    ///
    /// Always allowed while rate limiting is disabled.
    pub fn check_rate_limit(&self, caller: &str) -> RateDecision {
        if !self.rate_limit_enabled.load(Ordering::Relaxed) {
            return RateDecision::allow();
        }
        self.limiter.check_and_record(caller)
    }

    /// Generate an image with OpenRouter.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` before any provider call if `caller` is over its
    /// allowance, otherwise whatever the generation loop or delivery returns.
    #[instrument(skip(self, prompt, reference_images), fields(prompt_len = prompt.len(), reference_images = reference_images.len()))]
    pub async fn generate(
        &self,
        caller: &str,
        prompt: &str,
        reference_images: Vec<ReferenceImage>,
    ) -> Result<GeneratedImage, GenerationError> {
        self.admit(caller)?;

        let request = self.build_request(prompt, reference_images)?;
        let stored = self.orchestrator.generate(&request, &self.rotator).await?;
        self.deliver(stored).await
    }

    /// Generate an image with SiliconFlow.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPool` if SiliconFlow is not configured, `RateLimited`
    /// if `caller` is over its allowance, otherwise whatever the provider
    /// returns.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn generate_siliconflow(
        &self,
        caller: &str,
        prompt: &str,
        seed: Option<u64>,
    ) -> Result<GeneratedImage, GenerationError> {
        let client = self.siliconflow.as_ref().ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::InvalidPool(
                "SiliconFlow is not configured".to_string(),
            ))
        })?;
        self.admit(caller)?;

        let stored = client.generate(prompt, seed).await?;
        self.deliver(stored).await
    }

    /// Apply new rate limit settings without dropping caller history.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error and keeps the old limits if the new ones are
    /// invalid.
    #[instrument(skip(self))]
    pub fn update_rate_limit(&self, settings: &RateLimitSettings) -> Result<(), RateLimitError> {
        if *settings.enabled() {
            self.limiter.update_config(settings.limits())?;
        }
        self.rate_limit_enabled
            .store(*settings.enabled(), Ordering::Relaxed);
        info!(
            enabled = *settings.enabled(),
            max_requests = *settings.max_requests(),
            window_secs = *settings.window_secs(),
            "Rate limit updated"
        );
        Ok(())
    }

    /// Swap in a new credential pool, e.g. after reloading configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPool` if the keys are empty or blank.
    pub fn replace_api_keys<I, S>(&self, keys: I) -> Result<(), GenerationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = CredentialPool::new(keys)?;
        info!(pool_size = pool.len(), "Replacing API keys");
        self.rotator.replace_pool(pool);
        Ok(())
    }

    /// The most recent OpenRouter image, if any.
    pub fn last_saved(&self) -> Option<StoredImage> {
        self.orchestrator.store().last_saved()
    }

    /// Configuration the service was built from.
    pub fn config(&self) -> &DrawPlusConfig {
        &self.config
    }

    /// The per-caller rate limiter.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The credential rotator.
    pub fn rotator(&self) -> &CredentialRotator {
        &self.rotator
    }

    /// The generation loop.
    pub fn orchestrator(&self) -> &GenerationOrchestrator<A> {
        &self.orchestrator
    }

    fn admit(&self, caller: &str) -> Result<(), GenerationError> {
        let decision = self.check_rate_limit(caller);
        if decision.allowed() {
            return Ok(());
        }
        warn!(
            caller,
            retry_after_secs = decision.retry_after_secs(),
            "Caller rate limited"
        );
        Err(GenerationError::new(GenerationErrorKind::RateLimited {
            retry_after_secs: decision.retry_after_secs(),
        }))
    }

    fn build_request(
        &self,
        prompt: &str,
        reference_images: Vec<ReferenceImage>,
    ) -> Result<GenerationRequest, GenerationError> {
        let provider = self.config.provider();
        let mut builder = GenerationRequest::builder();
        builder
            .prompt(prompt)
            .reference_images(reference_images)
            .model(provider.model().clone())
            .max_tokens(*provider.max_tokens())
            .temperature(*provider.temperature());
        if let Some(base) = provider.api_base() {
            builder.api_base(base.clone());
        }
        builder.build().map_err(|e| {
            GenerationError::new(GenerationErrorKind::MalformedResponse(format!(
                "invalid generation request: {}",
                e
            )))
        })
    }

    async fn deliver(&self, stored: StoredImage) -> Result<GeneratedImage, GenerationError> {
        let path = if self.config.transfer().is_local() {
            stored.path().display().to_string()
        } else {
            debug!(
                host = %self.config.transfer().host(),
                port = *self.config.transfer().port(),
                "Transferring image to chat host"
            );
            self.transfer.send(stored.path()).await?
        };

        Ok(GeneratedImage {
            url: stored.url().clone(),
            path,
            stored,
        })
    }
}

impl<A: ImageApi> std::fmt::Debug for ImageService<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("rotator", &self.rotator)
            .field("limiter", &self.limiter)
            .field("siliconflow", &self.siliconflow.is_some())
            .finish_non_exhaustive()
    }
}
