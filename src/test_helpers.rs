//! Shared test utilities for the framefill test suite.
//!
//! Builds small synthetic JPEG files and input trees so tests never depend
//! on checked-in photos.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_tree(tmp.path(), &["a.jpg", "holiday/b.jpg", "holiday/notes.txt"]);
//! write_jpeg_with_exif(&tmp.path().join("c.jpg"), 40, 30, &ExifSpec {
//!     orientation: Some(6),
//!     date: Some("2018:09:26 14:25:01"),
//! });
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::fs;
use std::path::Path;

// =========================================================================
// JPEG fixtures
// =========================================================================

/// Encode a gradient image of the given size as JPEG bytes.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Write a plain JPEG (no EXIF) to `path`, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// EXIF fields to embed in a fixture.
#[derive(Debug, Clone, Default)]
pub struct ExifSpec {
    /// Raw orientation code, written as a SHORT.
    pub orientation: Option<u16>,
    /// `YYYY:MM:DD HH:MM:SS`, written as DateTimeOriginal.
    pub date: Option<&'static str>,
}

/// Write a JPEG carrying a hand-assembled EXIF APP1 segment.
pub fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, exif: &ExifSpec) {
    let jpeg = jpeg_bytes(width, height);
    let tiff = tiff_block(exif);

    let mut app1 = Vec::new();
    app1.extend_from_slice(&[0xFF, 0xE1]);
    let length = (2 + 6 + tiff.len()) as u16;
    app1.extend_from_slice(&length.to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);

    // Splice right after SOI.
    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, out).unwrap();
}

/// Big-endian TIFF block: IFD0 with Orientation and an Exif sub-IFD pointer,
/// then the Exif IFD with DateTimeOriginal.
fn tiff_block(exif: &ExifSpec) -> Vec<u8> {
    let mut entries: Vec<[u8; 12]> = Vec::new();

    if let Some(orientation) = exif.orientation {
        entries.push(ifd_entry(0x0112, 3, 1, {
            let o = orientation.to_be_bytes();
            [o[0], o[1], 0, 0]
        }));
    }

    let ifd0_len = 2 + 12 * (entries.len() + usize::from(exif.date.is_some())) + 4;
    let exif_ifd_offset = (8 + ifd0_len) as u32;
    if exif.date.is_some() {
        entries.push(ifd_entry(0x8769, 4, 1, exif_ifd_offset.to_be_bytes()));
    }

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM");
    tiff.extend_from_slice(&0x002Au16.to_be_bytes());
    tiff.extend_from_slice(&8u32.to_be_bytes());

    tiff.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for entry in &entries {
        tiff.extend_from_slice(entry);
    }
    tiff.extend_from_slice(&0u32.to_be_bytes());

    if let Some(date) = exif.date {
        let mut ascii = date.as_bytes().to_vec();
        ascii.push(0);
        let data_offset = exif_ifd_offset + 2 + 12 + 4;

        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&ifd_entry(
            0x9003,
            2,
            ascii.len() as u32,
            data_offset.to_be_bytes(),
        ));
        tiff.extend_from_slice(&0u32.to_be_bytes());
        tiff.extend_from_slice(&ascii);
    }

    tiff
}

fn ifd_entry(tag: u16, kind: u16, count: u32, value: [u8; 4]) -> [u8; 12] {
    let mut entry = [0u8; 12];
    entry[0..2].copy_from_slice(&tag.to_be_bytes());
    entry[2..4].copy_from_slice(&kind.to_be_bytes());
    entry[4..8].copy_from_slice(&count.to_be_bytes());
    entry[8..12].copy_from_slice(&value);
    entry
}

// =========================================================================
// Input trees
// =========================================================================

/// Create every relative path under `root`. `.jpg` paths get a small JPEG,
/// anything else gets a few bytes of text.
pub fn write_tree(root: &Path, paths: &[&str]) {
    for rel in paths {
        let path = root.join(rel);
        if rel.to_ascii_lowercase().ends_with(".jpg") {
            write_jpeg(&path, 16, 12);
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, b"not an image").unwrap();
        }
    }
}

/// Mark `dir` (relative to `root`) as excluded with its whole subtree.
pub fn exclude_dir(root: &Path, dir: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join(crate::scan::EXCLUDE_DIRECTORY_MARKER), b"").unwrap();
}

/// Write an exclusion list in `dir` naming `files` (relative to `dir`).
pub fn exclude_files(root: &Path, dir: &str, files: &[&str]) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(
        path.join(crate::scan::EXCLUDE_LIST_MARKER),
        files.join("\n") + "\n",
    )
    .unwrap();
}

/// Every file under `root`, as sorted `/`-separated relative paths.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}
