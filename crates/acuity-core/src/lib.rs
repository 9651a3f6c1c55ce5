//! Analysis pipeline for deterministic, coordinate-accurate image analysis.
//!
//! The pipeline turns "a local image, an analysis mode, maybe a sub-region"
//! into strict structured JSON with bounding boxes in original-image pixel
//! coordinates: path confinement, preprocessing, prompt construction,
//! inference with structured-output fallback, response normalization and
//! repair, coordinate remapping, and a bounded time-expiring result cache.

pub mod analyzer;
pub mod config;
pub mod coords;
pub mod error;
pub mod models;
pub mod modes;
pub mod prompt;
pub mod repair;

pub use analyzer::Analyzer;
pub use config::AcuityConfig;
pub use error::AnalysisError;
pub use models::AnalysisRequest;
pub use modes::AnalysisMode;
pub use prompt::{PromptBuilder, PROMPT_VERSION};
