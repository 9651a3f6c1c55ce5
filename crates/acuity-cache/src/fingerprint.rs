//! Cache key fingerprinting.

use sha2::{Digest, Sha256};

/// Inputs that determine whether two analysis requests are interchangeable.
///
/// The digest covers the canonical path, the file's modification time, the
/// analysis mode, the question, the normalized region, and the prompt
/// version tag. Bumping the version tag therefore invalidates every prior
/// cache entry without any explicit flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Canonical filesystem path of the image
    pub canonical_path: String,
    /// File modification time, nanoseconds since the Unix epoch
    pub mtime_nanos: u128,
    /// Analysis mode tag
    pub mode: String,
    /// Caller question, when present
    pub question: Option<String>,
    /// Normalized crop region, when present
    pub region: Option<[i64; 4]>,
    /// Prompt/schema version tag
    pub prompt_version: String,
}

impl Fingerprint {
    /// SHA-256 digest of the composite key, hex encoded.
    pub fn digest(&self) -> String {
        let question = serde_json::to_string(&self.question).unwrap_or_default();
        let region = serde_json::to_string(&self.region).unwrap_or_default();
        let composite = format!(
            "{}|{}|{}|{}|{}|{}",
            self.canonical_path, self.mtime_nanos, self.mode, question, region, self.prompt_version
        );

        let mut hasher = Sha256::new();
        hasher.update(composite.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
