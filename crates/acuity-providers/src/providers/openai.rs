//! OpenAI-compatible provider implementation.
//!
//! Speaks the chat-completions dialect shared by OpenAI and the many
//! compatible gateways, including inline images as data URLs and the
//! `response_format` knob for structured JSON output.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::error::ProviderError;
use crate::models::{CompletionRequest, Message, MessagePart, RawOutput};
use crate::provider::Provider;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatProvider {
    api_key: String,
    client: Client,
    base_url: String,
}

impl OpenAiCompatProvider {
    /// Create a provider against the default OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a provider against a custom base URL (self-hosted or proxy).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ProviderError::Config("API key is required".to_string()));
        }

        Ok(Self {
            api_key,
            client: Client::new(),
            base_url: base_url.into(),
        })
    }

    fn wire_message(message: &Message) -> WireMessage {
        // A single text part collapses to a plain string; anything else is
        // sent as a content-part array.
        let content = match message.parts.as_slice() {
            [MessagePart::Text(text)] => json!(text),
            parts => json!(parts
                .iter()
                .map(|part| match part {
                    MessagePart::Text(text) => json!({"type": "text", "text": text}),
                    MessagePart::ImageUrl(url) =>
                        json!({"type": "image_url", "image_url": {"url": url}}),
                })
                .collect::<Vec<_>>()),
        };

        WireMessage {
            role: message.role.clone(),
            content,
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        "openai-compat"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<RawOutput, ProviderError> {
        let wire_request = WireRequest {
            model: &request.model,
            messages: request.messages.iter().map(Self::wire_message).collect(),
            temperature: request.temperature,
            top_p: request.top_p,
            response_format: request
                .structured_json
                .then(|| ResponseFormat { kind: "json_object" }),
        };

        debug!(
            model = %request.model,
            structured = request.structured_json,
            "sending completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&wire_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "completion request failed");

            return match status.as_u16() {
                401 => Err(ProviderError::Auth),
                429 => Err(ProviderError::RateLimited(60)),
                _ => Err(ProviderError::Api {
                    status: status.as_u16(),
                    message: format!("{status}: {body}"),
                }),
            };
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Serialization(e.to_string()))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(RawOutput::from_content(message.content))
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: Option<WireResponseMessage>,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: Option<serde_json::Value>,
}
