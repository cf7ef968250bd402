//! Generation request type.

use crate::ReferenceImage;
use derive_builder::Builder;
use derive_getters::Getters;

/// Default model for OpenRouter image generation.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-image-preview:free";

/// Default completion budget.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Everything needed to ask a provider for one image.
///
/// Immutable once built; the orchestrator reuses it across credential attempts.
///
/// # Examples
///
/// ```
/// use drawplus_core::GenerationRequest;
///
/// let request = GenerationRequest::builder()
///     .prompt("a red panda")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.prompt(), "a red panda");
/// assert!(request.reference_images().is_empty());
/// assert_eq!(*request.max_tokens(), 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Getters)]
#[builder(setter(into))]
pub struct GenerationRequest {
    /// Natural-language description of the image
    prompt: String,
    /// Images to edit or use as reference
    #[builder(default)]
    reference_images: Vec<ReferenceImage>,
    /// Provider model identifier
    #[builder(default = "DEFAULT_MODEL.to_string()")]
    model: String,
    /// Custom API base replacing the default OpenRouter endpoint
    #[builder(default, setter(strip_option))]
    api_base: Option<String>,
    /// Completion token budget
    #[builder(default = "DEFAULT_MAX_TOKENS")]
    max_tokens: u32,
    /// Sampling temperature
    #[builder(default = "DEFAULT_TEMPERATURE")]
    temperature: f32,
}

impl GenerationRequest {
    /// Creates a new builder for GenerationRequest.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }
}
