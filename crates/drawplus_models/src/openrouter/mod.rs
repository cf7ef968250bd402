//! OpenRouter chat-completions image generation.
//!
//! Requests go through the [`ImageApi`] seam so the orchestrator can be
//! driven by a scripted transport in tests.

mod client;
mod dto;
mod interpreter;
mod orchestrator;

pub use client::{
    DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, ImageApi, OpenRouterClient, RawResponse,
    chat_completions_url,
};
pub use dto::{
    ChatChoice, ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, ContentPart,
    ImageUrl, MessageContent, ResponseMessage,
    image_instruction,
};
pub use interpreter::ResponseInterpreter;
pub use orchestrator::GenerationOrchestrator;
