//! Error types for the analysis pipeline.

use acuity_images::ImageError;
use acuity_providers::ProviderError;
use thiserror::Error;

/// Errors that can end an analysis request.
///
/// These never escape the orchestrator: every variant is converted into a
/// `{"error": ..., "path": ...}` envelope at the top boundary. JSON repair
/// failure is deliberately absent; it degrades to a sentinel content object
/// instead of failing the request.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Mode string is not one of the recognized values.
    #[error("Invalid mode '{0}'. Allowed: general, ocr, query, ui")]
    InvalidMode(String),

    /// Query mode requires a non-empty question.
    #[error("Parameter 'question' is required when mode='query'")]
    MissingQuestion,

    /// Path validation or preprocessing failed.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The inference provider failed fatally.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Filesystem metadata could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
