//! Vision completion providers for the analysis pipeline.
//!
//! This crate abstracts the inference collaborator behind a single
//! [`Provider`] trait: a blocking completion call over text-and-image
//! messages whose output may arrive in any of several shapes. It ships an
//! OpenAI-compatible implementation over HTTP and the structured-output
//! fallback policy shared by all providers.

pub mod error;
pub mod fallback;
pub mod models;
pub mod provider;
pub mod providers;

pub use error::ProviderError;
pub use fallback::complete_with_structured_fallback;
pub use models::{CompletionRequest, Message, MessagePart, RawOutput, RawPart};
pub use provider::Provider;
pub use providers::openai::OpenAiCompatProvider;
