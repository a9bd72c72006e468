//! Pixel transforms applied between decode and encode.
//!
//! These work on in-memory buffers only. Geometry math lives in
//! [`calculations`](super::calculations) so it can be tested without pixels.

use super::calculations::enlarged_dimensions;
use crate::orientation::{Orientation, Step};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

/// Bring an image stored with `orientation` upright.
pub fn apply_orientation(image: DynamicImage, orientation: Orientation) -> DynamicImage {
    orientation
        .correction()
        .iter()
        .fold(image, |img, step| apply_step(&img, *step))
}

fn apply_step(image: &DynamicImage, step: Step) -> DynamicImage {
    match step {
        Step::Rotate90 => image.rotate90(),
        Step::Rotate180 => image.rotate180(),
        Step::Rotate270 => image.rotate270(),
        Step::MirrorHorizontal => image.fliph(),
    }
}

/// Normalise to 8-bit RGB. Alpha is dropped, grey is expanded.
pub fn to_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Upscale to exactly `minimum_width` if narrower, keeping aspect ratio.
/// Images already wide enough are returned untouched.
pub fn enlarge_to_width(image: RgbImage, minimum_width: u32) -> RgbImage {
    match enlarged_dimensions((image.width(), image.height()), minimum_width) {
        Some((width, height)) => imageops::resize(&image, width, height, FilterType::Triangle),
        None => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, Rgba, RgbaImage};

    /// 3x2 image where every pixel is distinct, so any transform is visible.
    fn marked() -> DynamicImage {
        let img = RgbImage::from_fn(3, 2, |x, y| Rgb([(x * 50) as u8, (y * 100) as u8, 7]));
        DynamicImage::ImageRgb8(img)
    }

    fn pixels(img: &DynamicImage) -> Vec<[u8; 4]> {
        img.pixels().map(|(_, _, p)| p.0).collect()
    }

    #[test]
    fn none_and_undefined_leave_pixels_alone() {
        let original = marked();
        for o in [Orientation::None, Orientation::Undefined] {
            let out = apply_orientation(original.clone(), o);
            assert_eq!(pixels(&out), pixels(&original));
        }
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        for o in [
            Orientation::Clockwise,
            Orientation::Anticlockwise,
            Orientation::ClockwiseAndMirror,
            Orientation::AnticlockwiseAndMirror,
        ] {
            let out = apply_orientation(marked(), o);
            assert_eq!((out.width(), out.height()), (2, 3), "{o}");
        }
    }

    #[test]
    fn anticlockwise_is_corrected_by_clockwise_quarter_turn() {
        let out = apply_orientation(marked(), Orientation::Anticlockwise);
        assert_eq!(pixels(&out), pixels(&marked().rotate90()));
    }

    #[test]
    fn clockwise_is_corrected_by_anticlockwise_quarter_turn() {
        let out = apply_orientation(marked(), Orientation::Clockwise);
        assert_eq!(pixels(&out), pixels(&marked().rotate270()));
    }

    #[test]
    fn mirror_top_bottom_equals_vertical_flip() {
        let out = apply_orientation(marked(), Orientation::MirrorTopBottom);
        assert_eq!((out.width(), out.height()), (3, 2));
        assert_eq!(pixels(&out), pixels(&marked().flipv()));
    }

    #[test]
    fn mirror_left_right_equals_horizontal_flip() {
        let out = apply_orientation(marked(), Orientation::MirrorLeftRight);
        assert_eq!((out.width(), out.height()), (3, 2));
        assert_eq!(pixels(&out), pixels(&marked().fliph()));
    }

    #[test]
    fn clockwise_and_mirror_is_a_transpose() {
        let out = apply_orientation(marked(), Orientation::ClockwiseAndMirror);
        assert_eq!(pixels(&out), pixels(&marked().rotate90().fliph()));
        // Transposing moves (x, y) to (y, x).
        let original = marked();
        assert_eq!(out.get_pixel(1, 2), original.get_pixel(2, 1));
        assert_eq!(out.get_pixel(0, 1), original.get_pixel(1, 0));
    }

    #[test]
    fn anticlockwise_and_mirror_is_a_transverse() {
        let out = apply_orientation(marked(), Orientation::AnticlockwiseAndMirror);
        assert_eq!(pixels(&out), pixels(&marked().rotate270().fliph()));
        // Transverse moves (x, y) to (h - 1 - y, w - 1 - x) for a w x h source.
        let original = marked();
        assert_eq!(out.get_pixel(1, 2), original.get_pixel(0, 0));
        assert_eq!(out.get_pixel(0, 0), original.get_pixel(2, 1));
    }

    #[test]
    fn upside_down_round_trips() {
        let once = apply_orientation(marked(), Orientation::UpsideDown);
        let twice = apply_orientation(once, Orientation::UpsideDown);
        assert_eq!(pixels(&twice), pixels(&marked()));
    }

    #[test]
    fn to_rgb_drops_alpha() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0]));
        let rgb = to_rgb(DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn narrow_image_is_enlarged_to_exact_width() {
        let out = enlarge_to_width(RgbImage::new(100, 50), 250);
        assert_eq!((out.width(), out.height()), (250, 125));
    }

    #[test]
    fn wide_image_is_untouched() {
        let out = enlarge_to_width(RgbImage::new(300, 200), 250);
        assert_eq!((out.width(), out.height()), (300, 200));
    }
}
