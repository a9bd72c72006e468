//! Pure calculation functions for output geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions after enlarging to `minimum_width`, or `None` if the source
/// is already at least that wide.
///
/// Height scales by the same factor and is rounded, never below 1.
///
/// ```
/// # use framefill::imaging::enlarged_dimensions;
/// assert_eq!(enlarged_dimensions((800, 600), 1024), Some((1024, 768)));
/// assert_eq!(enlarged_dimensions((2000, 1500), 1024), None);
/// ```
pub fn enlarged_dimensions(source: (u32, u32), minimum_width: u32) -> Option<(u32, u32)> {
    let (width, height) = source;
    if width == 0 || width >= minimum_width {
        return None;
    }
    let scaled = (height as f64 * minimum_width as f64 / width as f64).round() as u32;
    Some((minimum_width, scaled.max(1)))
}

/// Where and how large annotation text is drawn.
///
/// Positions are the left edge and the text baseline, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationLayout {
    pub heading_size: f32,
    pub heading_origin: (f32, f32),
    pub caption_size: f32,
    pub caption_origin: (f32, f32),
}

/// Lay out annotation text for an image of the given height.
///
/// The heading (directory name) is a twenty-fifth of the image height,
/// inset by its own size from the top-left corner. The caption is half that
/// size and sits one heading-size above the bottom edge.
pub fn annotation_layout(height: u32) -> AnnotationLayout {
    let heading = (height / 25).max(1) as f32;
    let caption = (heading / 2.0).max(1.0);
    AnnotationLayout {
        heading_size: heading,
        heading_origin: (heading, heading),
        caption_size: caption,
        caption_origin: (heading, (height as f32 - heading).max(caption)),
    }
}
