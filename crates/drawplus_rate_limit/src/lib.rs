//! Rate limiting and credential rotation for drawplus.
//!
//! - [`RateLimiter`] throttles each chat caller with a sliding time window.
//! - [`CredentialRotator`] spreads provider traffic across a pool of API keys,
//!   moving to the next key only when the current one fails.

mod config;
mod credentials;
mod error;
mod limiter;

pub use config::RateLimitConfig;
pub use credentials::{Credential, CredentialPool, CredentialRotator};
pub use error::{RateLimitError, RateLimitErrorKind};
pub use limiter::{RateDecision, RateLimiter};
