//! Data models for completion requests and provider output.

use serde::{Deserialize, Serialize};

/// One part of a chat message: text or an inline image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessagePart {
    /// Plain text content
    Text(String),
    /// Inline image as a data URL
    ImageUrl(String),
}

/// A chat message sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message role (system, user, assistant)
    pub role: String,
    /// Message content parts
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// A system message with plain text content.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    /// A user message with plain text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![MessagePart::Text(text.into())],
        }
    }

    /// A user message carrying text plus one inline image.
    pub fn user_with_image(text: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![
                MessagePart::Text(text.into()),
                MessagePart::ImageUrl(data_url.into()),
            ],
        }
    }
}

/// A completion request.
///
/// Sampling is pinned to deterministic settings (`temperature = 0`,
/// `top_p = 1`); callers only choose the model, the messages, and whether to
/// ask for structured JSON output.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling parameter
    pub top_p: f32,
    /// Whether to request structured JSON output from the provider
    pub structured_json: bool,
}

impl CompletionRequest {
    /// Create a request with deterministic sampling defaults.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.0,
            top_p: 1.0,
            structured_json: false,
        }
    }

    /// Toggle the structured JSON output flag.
    pub fn with_structured_json(mut self, structured: bool) -> Self {
        self.structured_json = structured;
        self
    }
}

/// One fragment of a multi-part provider output.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPart {
    /// Plain text fragment
    Text(String),
    /// Mapping fragment, typically `{"type": "text", "text": ...}`
    Fragment(serde_json::Map<String, serde_json::Value>),
}

/// Output of a completion call.
///
/// The provider contract does not guarantee a single shape: content may be a
/// string, a sequence of mixed fragments, an already-parsed mapping, or
/// absent entirely. Downstream normalization is total over all variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    /// No content returned
    Absent,
    /// A single text payload
    Text(String),
    /// A sequence of text/mapping fragments
    Parts(Vec<RawPart>),
    /// An already-parsed JSON object
    Object(serde_json::Map<String, serde_json::Value>),
}

impl RawOutput {
    /// Build from the `content` field of a chat completion message.
    pub fn from_content(content: Option<serde_json::Value>) -> Self {
        match content {
            None | Some(serde_json::Value::Null) => RawOutput::Absent,
            Some(serde_json::Value::String(text)) => RawOutput::Text(text),
            Some(serde_json::Value::Array(items)) => {
                let parts = items
                    .into_iter()
                    .map(|item| match item {
                        serde_json::Value::String(text) => RawPart::Text(text),
                        serde_json::Value::Object(map) => RawPart::Fragment(map),
                        other => RawPart::Text(other.to_string()),
                    })
                    .collect();
                RawOutput::Parts(parts)
            }
            Some(serde_json::Value::Object(map)) => RawOutput::Object(map),
            Some(other) => RawOutput::Text(other.to_string()),
        }
    }
}
