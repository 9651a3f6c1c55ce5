//! Image loading, cropping, resizing, and encoding.
//!
//! The preprocessor reads the file once into memory, normalizes EXIF
//! orientation so all downstream geometry is in upright pixel space, applies
//! an optional crop, downscales to a per-mode cap, and encodes the result for
//! transmission. No file handles or buffers outlive the call.

use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tracing::debug;

use crate::error::{ImageError, ImageResult};
use crate::formats::SourceFormat;
use crate::models::ProcessedImage;

/// How to encode the image for transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Lossless PNG, preserving exact pixel boundaries
    Png,
    /// Lossy JPEG at the given quality
    Jpeg { quality: u8 },
}

impl Encoding {
    /// MIME type produced by this encoding.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Encoding::Png => "image/png",
            Encoding::Jpeg { .. } => "image/jpeg",
        }
    }
}

/// Per-mode rendering limits: dimension cap and output encoding.
#[derive(Debug, Clone, Copy)]
pub struct RenderPlan {
    /// Maximum allowed value for the larger image dimension
    pub max_dimension: u32,
    /// Output encoding
    pub encoding: Encoding,
}

/// Loads, crops, resizes, and encodes images for analysis.
pub struct Preprocessor;

impl Preprocessor {
    /// Prepare the image at `path` for transmission.
    ///
    /// `region` is an optional `[x1, y1, x2, y2]` crop in original-image
    /// pixel coordinates; it is clamped to the image bounds and rejected with
    /// `InvalidRegion` if empty after clamping.
    pub fn process(
        path: &Path,
        region: Option<[i64; 4]>,
        plan: &RenderPlan,
    ) -> ImageResult<ProcessedImage> {
        let bytes = std::fs::read(path)?;
        let format = SourceFormat::detect(&bytes)?;

        let decoded = image::load_from_memory(&bytes)?;
        let upright = apply_orientation(decoded, read_orientation(&bytes));
        let (orig_w, orig_h) = upright.dimensions();

        let (image, crop_bbox) = match region {
            Some(requested) => {
                let [x1, y1, x2, y2] = requested;
                let x1 = x1.max(0) as u32;
                let y1 = y1.max(0) as u32;
                let x2 = x2.min(orig_w as i64).max(0) as u32;
                let y2 = y2.min(orig_h as i64).max(0) as u32;
                if x2 <= x1 || y2 <= y1 {
                    return Err(ImageError::InvalidRegion {
                        region: requested,
                        width: orig_w,
                        height: orig_h,
                    });
                }
                let cropped = upright.crop_imm(x1, y1, x2 - x1, y2 - y1);
                (cropped, [x1, y1, x2, y2])
            }
            None => (upright, [0, 0, orig_w, orig_h]),
        };

        let (w, h) = image.dimensions();
        let image = if w.max(h) > plan.max_dimension {
            let (fit_w, fit_h) = fit_dimensions(w, h, plan.max_dimension);
            image.resize_exact(fit_w, fit_h, image::imageops::FilterType::Lanczos3)
        } else {
            image
        };
        let sent_size = image.dimensions();

        let payload = encode(&image, plan.encoding)?;

        debug!(
            source = format.as_str(),
            original = format!("{orig_w}x{orig_h}"),
            sent = format!("{}x{}", sent_size.0, sent_size.1),
            mime = plan.encoding.mime_type(),
            payload_bytes = payload.len(),
            "image preprocessed"
        );

        Ok(ProcessedImage {
            payload_base64: BASE64.encode(&payload),
            mime_type: plan.encoding.mime_type().to_string(),
            original_size: (orig_w, orig_h),
            crop_bbox,
            sent_size,
        })
    }
}

/// Compute aspect-ratio-preserving dimensions fitting within a square cap.
fn fit_dimensions(w: u32, h: u32, cap: u32) -> (u32, u32) {
    if w >= h {
        (cap, ((h as u64 * cap as u64) / w as u64).max(1) as u32)
    } else {
        (((w as u64 * cap as u64) / h as u64).max(1) as u32, cap)
    }
}

/// Read the EXIF orientation tag (0x0112) from raw file bytes.
///
/// Returns 1 (upright) when there is no EXIF segment or no orientation tag.
pub fn read_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation transform.
///
/// Orientation values: 1 = upright, 2 = mirrored, 3 = 180°, 4 = flipped
/// vertically, 5–8 = the rotated/mirrored combinations.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Encode the image, flattening alpha onto white for lossy output.
fn encode(image: &DynamicImage, encoding: Encoding) -> ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    match encoding {
        Encoding::Png => {
            image
                .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
                .map_err(|e| ImageError::Encode(e.to_string()))?;
        }
        Encoding::Jpeg { quality } => {
            let rgb = if image.color().has_alpha() {
                flatten_onto_white(image)
            } else {
                image.to_rgb8()
            };
            let mut cursor = Cursor::new(&mut buffer);
            let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| ImageError::Encode(e.to_string()))?;
        }
    }
    Ok(buffer)
}

/// Composite an image with alpha onto an opaque white background.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    out
}
