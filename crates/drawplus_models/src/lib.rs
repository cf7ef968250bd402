//! Image generation providers for drawplus.
//!
//! - [`openrouter`]: chat-completions image models with credential rotation
//! - [`siliconflow`]: text-to-image endpoint with download and busy retry

pub mod openrouter;
pub mod siliconflow;

pub use openrouter::{
    ChatRequest, GenerationOrchestrator, ImageApi, OpenRouterClient, RawResponse,
    ResponseInterpreter,
};
pub use siliconflow::{SiliconFlowClient, SiliconFlowConfig};
