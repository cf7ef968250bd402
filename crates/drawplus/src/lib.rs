//! Rate-limited AI image generation for chat bots.
//!
//! [`ImageService`] is the entry point the chat layer talks to. It checks the
//! caller against a sliding-window [`RateLimiter`](drawplus_rate_limit::RateLimiter),
//! runs the provider call across a rotating pool of API keys, stores the
//! result in an expiring image directory, and hands back a path the chat host
//! can load.
//!
//! The building blocks live in their own crates and are re-exported here:
//!
//! - [`drawplus_core`]: requests, outcomes, image formats
//! - [`drawplus_rate_limit`]: rate limiting and credential rotation
//! - [`drawplus_storage`]: the expiring image store
//! - [`drawplus_models`]: OpenRouter and SiliconFlow providers

mod config;
mod service;
mod transfer;

pub use config::{
    DrawPlusConfig, ENV_PREFIX, ProviderConfig, RateLimitSettings, TransferConfig,
    default_config_path,
};
pub use service::{GeneratedImage, ImageService, SILICONFLOW_PREFIX};
pub use transfer::{FileTransfer, LocalTransfer};

pub use drawplus_core;
pub use drawplus_error;
pub use drawplus_models;
pub use drawplus_rate_limit;
pub use drawplus_storage;
