//! Data models for preprocessed images.

use serde::{Deserialize, Serialize};

/// An image prepared for transmission to an inference provider.
///
/// Carries everything the pipeline needs downstream: the encoded payload and
/// the geometry required to map provider coordinates back into the original
/// image's pixel space. Scoped to a single analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedImage {
    /// Base64-encoded payload actually sent to the provider
    pub payload_base64: String,
    /// MIME type of the encoded payload
    pub mime_type: String,
    /// Original image dimensions (width, height), after EXIF normalization
    pub original_size: (u32, u32),
    /// Region of the original image selected before resizing, in original
    /// pixel coordinates; the full image when no region was requested
    pub crop_bbox: [u32; 4],
    /// Dimensions (width, height) of the payload after resizing
    pub sent_size: (u32, u32),
}

impl ProcessedImage {
    /// Data URL form of the payload, for providers that accept inline images.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.payload_base64)
    }

    /// Width and height of the crop region.
    pub fn crop_size(&self) -> (u32, u32) {
        let [x1, y1, x2, y2] = self.crop_bbox;
        (x2 - x1, y2 - y1)
    }
}
