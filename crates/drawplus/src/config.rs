//! Service configuration.
//!
//! Settings come from a TOML file, then `DRAWPLUS__<SECTION>__<KEY>`
//! environment variables on top:
//!
//! ```toml
//! [provider]
//! api_keys = ["sk-or-..."]
//! model = "google/gemini-2.5-flash-image-preview:free"
//!
//! [rate_limit]
//! max_requests = 5
//! window_secs = 60
//!
//! [storage]
//! directory = "./images"
//!
//! [transfer]
//! host = "localhost"
//! port = 3658
//! ```

use derive_getters::Getters;
use drawplus_core::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use drawplus_error::ConfigError;
use drawplus_models::SiliconFlowConfig;
use drawplus_rate_limit::RateLimitConfig;
use drawplus_storage::ImageStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DRAWPLUS";

/// Top-level configuration.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct DrawPlusConfig {
    /// OpenRouter provider settings
    #[serde(default)]
    provider: ProviderConfig,
    /// Per-caller throttling
    #[serde(default)]
    rate_limit: RateLimitSettings,
    /// Where generated images live
    #[serde(default)]
    storage: ImageStoreConfig,
    /// Delivery of stored images to the chat host
    #[serde(default)]
    transfer: TransferConfig,
    /// Optional secondary provider
    #[serde(default)]
    siliconflow: Option<SiliconFlowConfig>,
}

impl DrawPlusConfig {
    /// Load from an optional TOML file plus environment overrides.
    ///
    /// Lists such as `provider.api_keys` may be given in the environment as
    /// comma-separated values. The result is not validated; call
    /// [`validate`](Self::validate) once any fallbacks have been applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or if a value
    /// has the wrong type.
    #[instrument(skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("provider.api_keys"),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::new(format!("Failed to load configuration: {}", e)))?;

        debug!(
            api_keys = config.provider.api_keys.len(),
            model = %config.provider.model,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a TOML file without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Check that the configuration can drive a service.
    ///
    /// # Errors
    ///
    /// Returns an error when there are no API keys, a key is blank, or the
    /// rate limit is enabled with zero limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_keys.is_empty() {
            return Err(ConfigError::new("provider.api_keys must not be empty"));
        }
        if let Some(position) = self.provider.api_keys.iter().position(|k| k.trim().is_empty()) {
            return Err(ConfigError::new(format!(
                "provider.api_keys[{}] is blank",
                position
            )));
        }
        if self.rate_limit.enabled {
            self.rate_limit
                .limits()
                .validate()
                .map_err(|e| ConfigError::new(format!("rate_limit: {}", e.kind())))?;
        }
        if *self.storage.ttl_secs() == 0 {
            return Err(ConfigError::new("storage.ttl_secs must be at least 1"));
        }
        Ok(())
    }

    /// Use `key` as the only API key when none is configured.
    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        if !self.provider.api_keys.is_empty() {
            return self;
        }
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            debug!("Using fallback API key");
            self.provider.api_keys.push(key);
        }
        self
    }
}

/// OpenRouter settings.
#[derive(Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ProviderConfig {
    /// Credential pool, tried in order
    #[serde(default)]
    api_keys: Vec<String>,
    /// Model identifier
    #[serde(default = "default_model")]
    model: String,
    /// Custom API base replacing `https://openrouter.ai/api`
    #[serde(default)]
    #[setters(strip_option)]
    api_base: Option<String>,
    /// Completion token budget
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    temperature: f32,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

impl ProviderConfig {
    /// Provider settings for `api_keys` with every other field defaulted.
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            api_keys,
            ..Self::default()
        }
    }

    /// The timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: default_model(),
            api_base: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_keys", &format!("<{} redacted>", self.api_keys.len()))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_timeout_secs() -> u64 {
    60
}

/// Rate limit section: an on/off switch plus the limiter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct RateLimitSettings {
    /// Whether callers are throttled at all
    #[serde(default = "default_enabled")]
    enabled: bool,
    /// Requests allowed per caller inside one window
    #[serde(default = "default_max_requests")]
    max_requests: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    window_secs: u64,
    /// Minimum seconds between sweeps of idle callers
    #[serde(default = "default_cleanup_interval_secs")]
    cleanup_interval_secs: u64,
}

impl RateLimitSettings {
    /// The limiter configuration these settings describe.
    pub fn limits(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.max_requests, self.window_secs)
            .with_cleanup_interval_secs(self.cleanup_interval_secs)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

/// Where the chat host picks images up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct TransferConfig {
    /// Host running the chat client; `localhost` means no transfer
    #[serde(default = "default_host")]
    host: String,
    /// Port of the file receiver on that host
    #[serde(default = "default_port")]
    port: u16,
}

impl TransferConfig {
    /// Whether stored images are already reachable by the chat host.
    pub fn is_local(&self) -> bool {
        self.host.eq_ignore_ascii_case("localhost")
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3658
}

/// Default configuration file name looked up by the CLI.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("drawplus.toml")
}
