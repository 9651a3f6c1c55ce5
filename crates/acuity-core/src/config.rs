//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the analysis pipeline.
///
/// Owned by the host that constructs the [`Analyzer`](crate::Analyzer);
/// there is no ambient process-level state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcuityConfig {
    /// Directory all requested paths must resolve inside
    pub base_dir: PathBuf,
    /// Model used for vision completions
    pub vision_model: String,
    /// Model used for JSON repair completions
    pub repair_model: String,
    /// Maximum accepted image file size in MB
    pub max_file_size_mb: u64,
    /// Result cache time-to-live in seconds
    pub cache_ttl_secs: u64,
    /// Result cache capacity in entries
    pub cache_capacity: usize,
}

impl Default for AcuityConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            vision_model: "gpt-4o".to_string(),
            repair_model: "gpt-4o".to_string(),
            max_file_size_mb: 20,
            cache_ttl_secs: 300,
            cache_capacity: 100,
        }
    }
}

impl AcuityConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// Recognized variables: `ACUITY_BASE_DIR`, `ACUITY_VISION_MODEL`,
    /// `ACUITY_REPAIR_MODEL` (defaults to the vision model),
    /// `ACUITY_MAX_FILE_SIZE_MB`, `ACUITY_CACHE_TTL_SECS`,
    /// `ACUITY_CACHE_CAPACITY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let vision_model =
            std::env::var("ACUITY_VISION_MODEL").unwrap_or(defaults.vision_model);
        let repair_model =
            std::env::var("ACUITY_REPAIR_MODEL").unwrap_or_else(|_| vision_model.clone());

        Self {
            base_dir: std::env::var("ACUITY_BASE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.base_dir),
            vision_model,
            repair_model,
            max_file_size_mb: env_parse("ACUITY_MAX_FILE_SIZE_MB", defaults.max_file_size_mb),
            cache_ttl_secs: env_parse("ACUITY_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            cache_capacity: env_parse("ACUITY_CACHE_CAPACITY", defaults.cache_capacity),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
