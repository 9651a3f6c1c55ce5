//! Analysis modes and their rendering limits.

use acuity_images::{Encoding, RenderPlan};
use serde::{Deserialize, Serialize};

/// What kind of answer the caller wants from the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Interactive UI elements with bounding boxes
    Ui,
    /// Text blocks with bounding boxes
    Ocr,
    /// Free-form description of the scene
    General,
    /// Answer a caller-supplied question about the image
    Query,
}

impl AnalysisMode {
    /// Parse a lowercase mode tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "ui" => Some(AnalysisMode::Ui),
            "ocr" => Some(AnalysisMode::Ocr),
            "general" => Some(AnalysisMode::General),
            "query" => Some(AnalysisMode::Query),
            _ => None,
        }
    }

    /// The mode's lowercase tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Ui => "ui",
            AnalysisMode::Ocr => "ocr",
            AnalysisMode::General => "general",
            AnalysisMode::Query => "query",
        }
    }

    /// Per-mode preprocessing limits.
    ///
    /// UI and OCR need exact pixel boundaries for small glyphs, so they get
    /// the larger dimension cap and lossless encoding. General and query
    /// tolerate lossy encoding at a smaller cap.
    pub fn render_plan(&self) -> RenderPlan {
        match self {
            AnalysisMode::Ui | AnalysisMode::Ocr => RenderPlan {
                max_dimension: 2560,
                encoding: Encoding::Png,
            },
            AnalysisMode::General | AnalysisMode::Query => RenderPlan {
                max_dimension: 1536,
                encoding: Encoding::Jpeg { quality: 85 },
            },
        }
    }
}
