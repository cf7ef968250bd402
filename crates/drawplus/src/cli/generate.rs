//! Generation command handlers.

use drawplus::drawplus_core::ReferenceImage;
use drawplus::drawplus_error::ConfigError;
use drawplus::drawplus_models::SiliconFlowClient;
use drawplus::drawplus_storage::ImageStore;
use drawplus::{
    DrawPlusConfig, GeneratedImage, ImageService, SILICONFLOW_PREFIX, default_config_path,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Load configuration from `path`, or from `drawplus.toml` if it exists.
pub fn load_config(path: Option<&Path>) -> Result<DrawPlusConfig, ConfigError> {
    let fallback = default_config_path();
    let path = path.or_else(|| fallback.exists().then_some(fallback.as_path()));
    DrawPlusConfig::load(path)
}

/// Handles the generate command.
#[instrument(skip_all, fields(caller = %caller, images = images.len()))]
pub async fn handle_generate_command(
    config: DrawPlusConfig,
    caller: &str,
    prompt: &str,
    images: &[PathBuf],
    api_key: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.with_fallback_api_key(api_key);
    let service = ImageService::from_config(config)?;

    let mut references = Vec::with_capacity(images.len());
    for path in images {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        references.push(ReferenceImage::from_bytes(bytes));
    }

    info!("Generating image");
    match service.generate(caller, prompt, references).await {
        Ok(image) => {
            print_image(&image);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.kind.user_message());
            Err(e.into())
        }
    }
}

/// Handles the siliconflow command.
#[instrument(skip_all)]
pub async fn handle_siliconflow_command(
    config: DrawPlusConfig,
    prompt: &str,
    seed: Option<u64>,
    api_key: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config.siliconflow().clone().unwrap_or_default();
    if settings.api_key().trim().is_empty() {
        if let Some(key) = api_key {
            settings = settings.with_api_key(key);
        }
    }

    let store_config = config
        .storage()
        .clone()
        .with_prefix(SILICONFLOW_PREFIX.to_string());
    let client = SiliconFlowClient::new(settings, Arc::new(ImageStore::new(store_config)))?;

    info!("Generating image with SiliconFlow");
    match client.generate(prompt, seed).await {
        Ok(stored) => {
            println!("{}", stored.path().display());
            println!("{}", stored.url());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.kind.user_message());
            Err(e.into())
        }
    }
}

fn print_image(image: &GeneratedImage) {
    println!("{}", image.path());
    println!("{}", image.url());
}
