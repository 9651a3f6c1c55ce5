//! Error types for path and image operations.

use thiserror::Error;

/// Result type for image operations.
pub type ImageResult<T> = Result<T, ImageError>;

/// Errors that can occur while validating paths or preprocessing images.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Path resolves outside the configured base directory.
    #[error("Access denied: path outside base directory")]
    AccessDenied,

    /// File does not exist after resolution.
    #[error("File not found: {0}")]
    NotFound(String),

    /// File exceeds the configured maximum size.
    #[error("File too large (> {max_mb}MB)")]
    FileTooLarge { max_mb: u64 },

    /// File header does not match any supported image format.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Crop region is empty after clamping to the image bounds.
    #[error("Invalid region {region:?} for image size {width}x{height}")]
    InvalidRegion {
        region: [i64; 4],
        width: u32,
        height: u32,
    },

    /// Image data could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Image could not be encoded for transmission.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::Decode(err.to_string())
    }
}
