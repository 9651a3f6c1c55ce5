//! Mode-specific prompt construction.

use crate::modes::AnalysisMode;

/// Version tag for the prompt/schema pair.
///
/// Participates in the cache fingerprint, so bumping it invalidates every
/// previously cached result.
pub const PROMPT_VERSION: &str = "v1.5";

/// Builds the instruction text sent to the inference provider.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the (system, user) instruction pair for one request.
    ///
    /// The system prompt states the sent image's dimensions and requires the
    /// model to express bounding boxes relative to that size; the coordinate
    /// mapper depends on that contract.
    pub fn build(
        mode: AnalysisMode,
        question: Option<&str>,
        sent_size: (u32, u32),
    ) -> (String, String) {
        let (sent_w, sent_h) = sent_size;
        let system = format!(
            "You are a machine vision engine. Output strict JSON only. Mode: {}. {} \
             Image is {}x{}. Coordinates must be relative to this size.",
            mode.as_str().to_uppercase(),
            Self::schema_line(mode, question),
            sent_w,
            sent_h,
        );

        let user = match (mode, question) {
            (AnalysisMode::Query, Some(q)) => {
                format!("Answer this question strictly based on the image: {q}")
            }
            _ => "Analyze.".to_string(),
        };

        (system, user)
    }

    fn schema_line(mode: AnalysisMode, question: Option<&str>) -> String {
        match mode {
            AnalysisMode::Ui => concat!(
                "JSON: { \"elements\": [ { \"type\": \"button|input\", \"label\": string, ",
                "\"bbox\": [x1,y1,x2,y2] } ], \"uncertainties\": [string] }"
            )
            .to_string(),
            AnalysisMode::Ocr => concat!(
                "JSON: { \"text_blocks\": [ { \"text\": string, ",
                "\"bbox\": [x1,y1,x2,y2] } ], \"uncertainties\": [string] }"
            )
            .to_string(),
            AnalysisMode::General => concat!(
                "JSON: { \"description\": string, \"main_objects\": [string], ",
                "\"uncertainties\": [string] }"
            )
            .to_string(),
            AnalysisMode::Query => format!(
                "Question: {}. JSON: {{ \"answer\": string, \"evidence\": [string], \
                 \"uncertainties\": [string] }}",
                question.unwrap_or_default()
            ),
        }
    }
}
