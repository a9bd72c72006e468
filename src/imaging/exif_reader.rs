//! EXIF orientation and capture-date extraction.
//!
//! Only two fields matter to the renderer:
//!
//! - `Orientation` (0x0112, IFD0) picks the rotation correction.
//! - `DateTimeOriginal` (0x9003), falling back to `DateTimeDigitized`
//!   (0x9004), becomes the date caption.
//!
//! Cameras write dates as `YYYY:MM:DD HH:MM:SS`. Captions show
//! `DD Mon YYYY`, so `2019:02:03 14:15:16` becomes `03 Feb 2019`.

use super::backend::{BackendError, ExifData};
use crate::orientation::Orientation;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Read EXIF from a JPEG on disk.
///
/// A file with no EXIF block yields the default (no rotation, no date).
/// Unreadable files and corrupt EXIF are errors; the caller decides how
/// to degrade.
pub fn read_exif(path: &Path) -> Result<ExifData, BackendError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            debug!("No EXIF data in {}", path.display());
            return Ok(ExifData::default());
        }
        Err(e) => {
            return Err(BackendError::ProcessingFailed(format!(
                "EXIF read error in {}: {e}",
                path.display()
            )));
        }
    };

    Ok(ExifData {
        orientation: orientation_of(&exif),
        date: date_of(&exif).map(|raw| format_exif_date(&raw)),
    })
}

fn orientation_of(exif: &Exif) -> Orientation {
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from_exif)
        .unwrap_or(Orientation::None)
}

fn date_of(exif: &Exif) -> Option<String> {
    [Tag::DateTimeOriginal, Tag::DateTimeDigitized]
        .into_iter()
        .find_map(|tag| {
            let field = exif.get_field(tag, In::PRIMARY)?;
            match &field.value {
                Value::Ascii(parts) => parts
                    .first()
                    .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
                    .filter(|s| !s.is_empty()),
                _ => None,
            }
        })
}

/// Turn `YYYY:MM:DD HH:MM:SS` into `DD Mon YYYY`.
///
/// Strings with fewer than three `:`-separated fields come back unchanged.
/// A missing day is left out rather than shown as a blank.
/// An unknown month is shown as `?MM?` so a bad value is visible on screen.
pub fn format_exif_date(raw: &str) -> String {
    let fields: Vec<&str> = raw.split(':').collect();
    if fields.len() < 3 {
        return raw.to_string();
    }

    let month = month_name(fields[1]);
    match fields[2].split_whitespace().next() {
        Some(day) => format!("{day} {month} {}", fields[0]),
        None => format!("{month} {}", fields[0]),
    }
}

fn month_name(field: &str) -> String {
    let trimmed = field.strip_prefix('0').unwrap_or(field);
    trimmed
        .parse::<usize>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .map(|m| MONTHS[m - 1].to_string())
        .unwrap_or_else(|| format!("?{trimmed}?"))
}
