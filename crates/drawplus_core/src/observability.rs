//! Tracing subscriber initialization.

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install a formatted tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise `default_filter`
/// (for example `"info"` or `"drawplus=debug"`). Calling this more than once
/// is harmless: later calls leave the first subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        Ok(()) => debug!("Tracing subscriber installed"),
        Err(_) => debug!("Tracing subscriber already installed"),
    }
}
