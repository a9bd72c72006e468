//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` (JPEG codec) |
//! | **EXIF** | `kamadak-exif` |
//! | **Rotate / mirror** | `DynamicImage::rotate90` etc. |
//! | **Enlarge** | `imageops::resize` with `Triangle` (bilinear) |
//! | **Border trim** | custom edge scan + `imageops::crop_imm` |
//! | **Annotation** | `ab_glyph` rasteriser, `fontdb` system font lookup |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations / border / annotate**: transforms on decoded pixels

pub mod annotate;
pub mod backend;
pub mod border;
mod calculations;
pub mod exif_reader;
pub mod operations;
pub mod rust_backend;

pub use annotate::{Annotation, load_system_font};
pub use backend::{BackendError, ExifData, ImageBackend};
pub use calculations::enlarged_dimensions;
pub use rust_backend::RustBackend;
