//! Caller-facing request model.

use serde::{Deserialize, Serialize};

fn default_mode() -> String {
    "general".to_string()
}

/// One analysis request.
///
/// The mode arrives as a raw string so that an unrecognized value can be
/// answered with a well-formed error envelope instead of a deserialization
/// failure; the orchestrator resolves it to an
/// [`AnalysisMode`](crate::AnalysisMode) before touching the filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Path to the image, resolved against the confinement root
    pub path: String,
    /// Analysis mode tag: "ui", "ocr", "general", or "query"
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Question to answer; required when mode is "query"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Optional `[x1, y1, x2, y2]` crop in original-image pixel coordinates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<[i64; 4]>,
}

impl AnalysisRequest {
    /// A request with no question and no region.
    pub fn new(path: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: mode.into(),
            question: None,
            region: None,
        }
    }

    /// Attach a question.
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Attach a crop region.
    pub fn with_region(mut self, region: [i64; 4]) -> Self {
        self.region = Some(region);
        self
    }
}
