//! Wire types of the chat completion and render endpoints.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Getters, Builder)]
#[builder(setter(into))]
pub struct ChatRequest {
    /// Model name
    model: String,
    /// Conversation
    messages: Vec<ChatMessage>,
    /// Sampling temperature
    temperature: f32,
    /// Completion token limit
    max_tokens: u32,
}

impl ChatRequest {
    /// Create a builder.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }
}

/// One completion choice.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatChoice {
    /// Generated message
    pub message: ChatMessage,
    /// Why generation stopped (`stop`, `length`, ...)
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response of `POST /v1/chat/completions`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    /// Completion choices; the first one is used
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

/// Response of the render endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    /// Render succeeded
    pub ok: bool,
    /// Base64 PDF bytes
    #[serde(default)]
    pub pdf_data: Option<String>,
    /// Failure reason when `ok` is false
    #[serde(default)]
    pub error: Option<String>,
}
