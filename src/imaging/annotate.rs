//! Text overlays: the directory heading and the caption line.
//!
//! Text is rasterised with `ab_glyph` straight into the RGB buffer, blending
//! each glyph pixel by its coverage. The font comes from the system font
//! database; serif faces are preferred because they survive JPEG
//! compression at small sizes.

use super::calculations::annotation_layout;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use fontdb::{Database, Family, Query, Source};
use image::{Rgb, RgbImage};
use tracing::{debug, warn};

/// Annotation colour.
pub const TEXT_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);

/// What to draw on one image. Empty strings draw nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub heading: Option<String>,
    pub caption: Option<String>,
}

impl Annotation {
    pub fn is_empty(&self) -> bool {
        self.heading.as_deref().is_none_or(str::is_empty)
            && self.caption.as_deref().is_none_or(str::is_empty)
    }
}

/// Draw `annotation` onto `image` with `font`.
pub fn annotate(image: &mut RgbImage, font: &FontArc, annotation: &Annotation) {
    let layout = annotation_layout(image.height());

    if let Some(heading) = annotation.heading.as_deref().filter(|s| !s.is_empty()) {
        let (x, baseline) = layout.heading_origin;
        draw_text(image, font, heading, layout.heading_size, x, baseline);
    }
    if let Some(caption) = annotation.caption.as_deref().filter(|s| !s.is_empty()) {
        let (x, baseline) = layout.caption_origin;
        draw_text(image, font, caption, layout.caption_size, x, baseline);
    }
}

/// Rasterise one line of text with its baseline at `baseline`.
pub fn draw_text(
    image: &mut RgbImage,
    font: &FontArc,
    text: &str,
    size: f32,
    left: f32,
    baseline: f32,
) {
    let scaled = font.as_scaled(PxScale::from(size));
    let (width, height) = image.dimensions();
    let mut cursor_x = left;
    let mut previous = None;

    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        let mut glyph = scaled.scaled_glyph(ch);
        glyph.position = point(cursor_x, baseline);

        if let Some(outline) = font.outline_glyph(glyph) {
            let bounds = outline.px_bounds();
            outline.draw(|x, y, coverage| {
                let px = bounds.min.x as i64 + x as i64;
                let py = bounds.min.y as i64 + y as i64;
                if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                    return;
                }
                let pixel = image.get_pixel_mut(px as u32, py as u32);
                blend(pixel, TEXT_COLOUR, coverage);
            });
        }

        cursor_x += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
}

fn blend(pixel: &mut Rgb<u8>, colour: Rgb<u8>, coverage: f32) {
    let alpha = coverage.clamp(0.0, 1.0);
    for (dst, src) in pixel.0.iter_mut().zip(colour.0) {
        let mixed = *dst as f32 * (1.0 - alpha) + src as f32 * alpha;
        *dst = mixed.round() as u8;
    }
}

/// Find a usable system font. Returns `None` (after logging) if the
/// machine has none, in which case annotation is skipped for the run.
pub fn load_system_font() -> Option<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();

    let preferred = [
        Family::Name("DejaVu Serif"),
        Family::Name("Liberation Serif"),
        Family::Name("Noto Serif"),
        Family::Serif,
        Family::SansSerif,
    ];

    for family in preferred {
        if let Some(id) = db.query(&Query {
            families: &[family],
            ..Default::default()
        }) && let Some(font) = load_face(&db, id)
        {
            return Some(font);
        }
    }

    for face in db.faces() {
        if let Some(font) = load_face(&db, face.id) {
            return Some(font);
        }
    }

    warn!("No usable system font found, annotations disabled");
    None
}

fn load_face(db: &Database, id: fontdb::ID) -> Option<FontArc> {
    let face = db.face(id)?;
    let data = match &face.source {
        Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        Source::File(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                debug!("Cannot read font {}: {e}", path.display());
                return None;
            }
        },
        Source::SharedFile(_, data) => data.as_ref().as_ref().to_vec(),
    };
    match FontArc::try_from_vec(data) {
        Ok(font) => {
            debug!("Using font {:?}", face.families.first().map(|(name, _)| name));
            Some(font)
        }
        Err(e) => {
            debug!("Cannot parse font face: {e}");
            None
        }
    }
}
