//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the three operations that touch encoded
//! bytes: decode, read EXIF, and encode to JPEG. Pixel transforms between
//! decode and encode are plain functions in [`operations`](super::operations)
//! and friends; they work on in-memory buffers and need no backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording `MockBackend` in this module.

use crate::orientation::Orientation;
use image::{DynamicImage, RgbImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// What the renderer needs from a file's EXIF block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExifData {
    pub orientation: Orientation,
    /// Capture date already formatted for captions (`03 Feb 2019`).
    pub date: Option<String>,
}

impl Default for ExifData {
    fn default() -> Self {
        Self {
            orientation: Orientation::None,
            date: None,
        }
    }
}

/// Trait for image codec backends.
pub trait ImageBackend {
    /// Read orientation and capture date. A file without EXIF is not an
    /// error: it yields [`ExifData::default`].
    fn read_exif(&self, path: &Path) -> Result<ExifData, BackendError>;

    /// Decode the file into pixels, exactly as stored.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode RGB pixels as a baseline JPEG.
    fn encode_jpeg(&self, image: &RgbImage, quality: u8) -> Result<Vec<u8>, BackendError>;
}
