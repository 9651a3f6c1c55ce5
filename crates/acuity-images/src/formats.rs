//! Source image format detection from magic bytes.

use crate::error::{ImageError, ImageResult};

/// Image formats accepted as analysis input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// PNG format
    Png,
    /// JPEG format
    Jpeg,
    /// GIF format
    Gif,
    /// WebP format
    WebP,
}

impl SourceFormat {
    /// Detect the format from a file's leading bytes.
    ///
    /// Detection looks only at the header; a truncated or corrupt body is
    /// caught later by the decoder.
    pub fn detect(bytes: &[u8]) -> ImageResult<Self> {
        if bytes.len() < 4 {
            return Err(ImageError::UnsupportedFormat(
                "file too small to be an image".to_string(),
            ));
        }

        // PNG: 89 50 4E 47
        if bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47]) {
            return Ok(SourceFormat::Png);
        }

        // JPEG: FF D8 FF
        if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            return Ok(SourceFormat::Jpeg);
        }

        // GIF87a or GIF89a
        if bytes.starts_with(b"GIF") {
            return Ok(SourceFormat::Gif);
        }

        // WebP: RIFF ... WEBP
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && bytes[8..12] == *b"WEBP" {
            return Ok(SourceFormat::WebP);
        }

        Err(ImageError::UnsupportedFormat(
            "unrecognized file header".to_string(),
        ))
    }

    /// Short lowercase name for the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Png => "png",
            SourceFormat::Jpeg => "jpg",
            SourceFormat::Gif => "gif",
            SourceFormat::WebP => "webp",
        }
    }

    /// MIME type of the source file.
    pub fn mime_type(&self) -> &'static str {
        match self {
            SourceFormat::Png => "image/png",
            SourceFormat::Jpeg => "image/jpeg",
            SourceFormat::Gif => "image/gif",
            SourceFormat::WebP => "image/webp",
        }
    }
}
