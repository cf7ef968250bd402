//! Data transfer objects for the OpenRouter chat-completions API.

use derive_builder::Builder;
use derive_getters::Getters;
use drawplus_core::GenerationRequest;
use serde::{Deserialize, Serialize};

/// One block of a multipart message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text {
        /// The text itself
        text: String,
    },
    /// An image, inlined as a data URI
    ImageUrl {
        /// Image location
        image_url: ImageUrl,
    },
}

/// Image location wrapper used by both requests and responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// A `data:image/...` URI
    pub url: String,
}

/// Message content: a bare string when there is only text, parts otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Text-only message
    Text(String),
    /// Text followed by images
    Parts(Vec<ContentPart>),
}

/// A message in the chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Always `user` for image generation
    pub role: String,
    /// Message content
    pub content: MessageContent,
}

/// Chat completion request body.
#[derive(Debug, Clone, PartialEq, Serialize, Builder, Getters)]
#[builder(setter(into))]
pub struct ChatRequest {
    /// Model identifier
    model: String,
    /// Conversation messages
    messages: Vec<ChatMessage>,
    /// Completion token budget
    max_tokens: u32,
    /// Sampling temperature
    temperature: f32,
}

impl ChatRequest {
    /// Creates a new builder for ChatRequest.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }

    /// Build the provider payload for a generation request.
    ///
    /// The prompt is wrapped in an instruction that steers the model toward
    /// returning an image. Reference images follow as data URI blocks.
    pub fn for_generation(request: &GenerationRequest) -> Self {
        let instruction = image_instruction(request.prompt());

        let content = if request.reference_images().is_empty() {
            MessageContent::Text(instruction)
        } else {
            let mut parts = Vec::with_capacity(request.reference_images().len() + 1);
            parts.push(ContentPart::Text { text: instruction });
            parts.extend(request.reference_images().iter().map(|image| {
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.to_data_uri(),
                    },
                }
            }));
            MessageContent::Parts(parts)
        };

        Self {
            model: request.model().clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            max_tokens: *request.max_tokens(),
            temperature: *request.temperature(),
        }
    }
}

/// Wrap a user prompt so the model answers with an image instead of prose.
pub fn image_instruction(prompt: &str) -> String {
    format!(
        "Generate the image directly, do not reply with text: {}\n\n\
         Important: you must produce an image, not a written description. \
         Return a response that contains the image.",
        prompt
    )
}

/// The assistant message of a choice.
///
/// Image entries stay untyped so one malformed entry cannot reject the
/// whole response; the interpreter reads `image_url.url` from each.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    /// String or array of content parts
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    /// Inline generated images; `null` is read as none
    #[serde(default)]
    pub images: Option<Vec<serde_json::Value>>,
}

impl ResponseMessage {
    /// Image entries, empty when the field is missing or `null`.
    pub fn images(&self) -> &[serde_json::Value] {
        self.images.as_deref().unwrap_or_default()
    }

    /// All text carried by the message, joined with newlines.
    pub fn text(&self) -> String {
        match &self.content {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(serde_json::Value::Array(parts)) => parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }
}

/// One response choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The assistant message
    pub message: ResponseMessage,
    /// Normalised finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Finish reason as reported by the upstream model
    #[serde(default)]
    pub native_finish_reason: Option<String>,
}

/// Chat completion response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Response choices
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawplus_core::{ImageFormat, ReferenceImage};

    #[test]
    fn test_text_only_request_uses_plain_content() {
        let request = GenerationRequest::builder()
            .prompt("a red panda")
            .build()
            .unwrap();
        let body = serde_json::to_value(ChatRequest::for_generation(&request)).unwrap();

        let content = &body["messages"][0]["content"];
        assert!(content.is_string());
        assert!(content.as_str().unwrap().contains("a red panda"));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_reference_images_follow_text_block() {
        let request = GenerationRequest::builder()
            .prompt("make it blue")
            .reference_images(vec![
                ReferenceImage::new(vec![1, 2, 3], ImageFormat::Png),
                ReferenceImage::new(vec![4, 5, 6], ImageFormat::Jpeg),
            ])
            .build()
            .unwrap();
        let body = serde_json::to_value(ChatRequest::for_generation(&request)).unwrap();

        let parts = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AQID");
        assert!(
            parts[2]["image_url"]["url"]
                .as_str()
                .unwrap()
                .starts_with("data:image/jpeg;base64,")
        );
    }

    #[test]
    fn test_response_text_from_parts() {
        let message: ResponseMessage = serde_json::from_value(serde_json::json!({
            "content": [{"type": "text", "text": "one"}, {"type": "text", "text": "two"}]
        }))
        .unwrap();
        assert_eq!(message.text(), "one\ntwo");
    }

    #[test]
    fn test_null_images_read_as_empty() {
        let message: ResponseMessage = serde_json::from_value(serde_json::json!({
            "content": "hello",
            "images": null
        }))
        .unwrap();
        assert!(message.images().is_empty());
    }
}
