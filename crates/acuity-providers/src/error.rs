//! Error types for provider interactions.

use thiserror::Error;

/// Substrings that mark a provider error as a structured-output rejection.
const REJECTION_VOCABULARY: [&str; 4] =
    ["response_format", "unsupported", "bad request", "invalid_request"];

/// Errors that can occur when calling an inference provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider signalled that structured JSON output is not supported.
    #[error("Provider does not support structured output")]
    StructuredOutputUnsupported,

    /// Authentication failed (never includes key details).
    #[error("Authentication failed")]
    Auth,

    /// Rate limited by provider.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider returned a non-success HTTP status.
    #[error("Provider API error: {message}")]
    Api { status: u16, message: String },

    /// Provider returned no completion choices.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProviderError {
    /// Whether this error means "retry once without structured output".
    ///
    /// Either the dedicated variant, or a generic error whose message matches
    /// the rejection vocabulary (case-insensitive substrings). Anything else
    /// is fatal for the request.
    pub fn is_structured_output_rejection(&self) -> bool {
        match self {
            ProviderError::StructuredOutputUnsupported => true,
            other => {
                let message = other.to_string().to_lowercase();
                REJECTION_VOCABULARY.iter().any(|k| message.contains(k))
            }
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}
