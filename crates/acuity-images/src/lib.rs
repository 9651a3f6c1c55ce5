//! Path confinement and image preprocessing for vision analysis.
//!
//! This crate owns everything that happens to an image before it is sent to
//! an inference provider:
//! - Confinement of caller-supplied paths to a configured base directory
//! - Format validation from magic bytes (PNG, JPG, GIF, WebP)
//! - EXIF orientation normalization
//! - Optional region cropping, aspect-preserving downscaling, and encoding

pub mod error;
pub mod formats;
pub mod models;
pub mod preprocess;
pub mod validator;

pub use error::{ImageError, ImageResult};
pub use formats::SourceFormat;
pub use models::ProcessedImage;
pub use preprocess::{Encoding, Preprocessor, RenderPlan};
pub use validator::PathValidator;
