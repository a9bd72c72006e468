//! White margin detection and removal.
//!
//! Scanned prints and some exports come with a white frame around the
//! picture. On a photo frame that reads as a second mat, so it can be
//! trimmed.
//!
//! A row or column *qualifies* as border when every pixel on it is whiteish
//! (all channels above [`WHITE_THRESHOLD`]) and the per-channel median is too.
//! A border is present when a horizontal edge (top or bottom) and a vertical
//! edge (left or right) both qualify. Trimming then walks each qualifying
//! edge inward while successive lines keep qualifying.
//!
//! ```text
//!   ┌──────────────┐      top qualifies, left qualifies
//!   │ ┌──────────┐ │  ->  border present
//!   │ │  photo   │ │  ->  trim rows from the top, columns from the left,
//!   │ └──────────┘ │      and likewise for bottom/right if they qualify
//!   └──────────────┘
//! ```

use image::{Rgb, RgbImage};

/// A channel value must exceed this to count as white.
pub const WHITE_THRESHOLD: u8 = 200;

/// Which edges of an image qualify as border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorderEdges {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl BorderEdges {
    pub fn present(&self) -> bool {
        (self.top || self.bottom) && (self.left || self.right)
    }
}

/// Check the four outermost lines.
pub fn detect_border(image: &RgbImage) -> BorderEdges {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return BorderEdges::default();
    }
    BorderEdges {
        top: row_qualifies(image, 0),
        bottom: row_qualifies(image, h - 1),
        left: column_qualifies(image, 0),
        right: column_qualifies(image, w - 1),
    }
}

/// Trim a detected white border. Images without one are returned as-is.
/// At least one pixel is always kept in each direction.
pub fn remove_border(image: RgbImage) -> RgbImage {
    let edges = detect_border(&image);
    if !edges.present() {
        return image;
    }

    let (w, h) = image.dimensions();

    let mut top = 0;
    if edges.top {
        while top + 1 < h && row_qualifies(&image, top) {
            top += 1;
        }
    }
    let mut bottom = 0;
    if edges.bottom {
        while top + bottom + 1 < h && row_qualifies(&image, h - 1 - bottom) {
            bottom += 1;
        }
    }
    let mut left = 0;
    if edges.left {
        while left + 1 < w && column_qualifies(&image, left) {
            left += 1;
        }
    }
    let mut right = 0;
    if edges.right {
        while left + right + 1 < w && column_qualifies(&image, w - 1 - right) {
            right += 1;
        }
    }

    if top + bottom + left + right == 0 {
        return image;
    }
    image::imageops::crop_imm(&image, left, top, w - left - right, h - top - bottom).to_image()
}

fn row_qualifies(image: &RgbImage, y: u32) -> bool {
    line_qualifies((0..image.width()).map(|x| image.get_pixel(x, y)))
}

fn column_qualifies(image: &RgbImage, x: u32) -> bool {
    line_qualifies((0..image.height()).map(|y| image.get_pixel(x, y)))
}

fn line_qualifies<'a>(pixels: impl Iterator<Item = &'a Rgb<u8>>) -> bool {
    let mut channels: [Vec<u8>; 3] = Default::default();
    for pixel in pixels {
        if !whiteish(pixel.0) {
            return false;
        }
        for (samples, value) in channels.iter_mut().zip(pixel.0) {
            samples.push(value);
        }
    }
    if channels[0].is_empty() {
        return false;
    }
    let median = channels.map(|mut samples| {
        samples.sort_unstable();
        samples[samples.len() / 2]
    });
    whiteish(median)
}

fn whiteish(rgb: [u8; 3]) -> bool {
    rgb.iter().all(|&c| c > WHITE_THRESHOLD)
}
