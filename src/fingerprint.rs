//! Cache fingerprints.
//!
//! A fingerprint identifies "this input file, rendered under these
//! settings". It is a SHA-256 over, in order:
//!
//! 1. the file's bytes,
//! 2. its absolute path,
//! 3. the resolved orientation ordinal (4 bytes, big-endian),
//! 4. the effective minimum width (4 bytes, big-endian),
//! 5. the border removal flag (4 bytes, big-endian 0 or 1),
//! 6. the JPEG quality (4 bytes, big-endian).
//!
//! Only settings that change rendered pixels belong here. Text annotation
//! is left out, so toggling it reuses earlier renders. Annotating the
//! output index must never be folded in: the index is different on every
//! run, so every lookup would miss. That is why index annotation turns the
//! cache off (see [`FrameConfig::check_consistency`](crate::config::FrameConfig::check_consistency)).

use crate::orientation::Orientation;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("cannot fingerprint {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

const READ_BUFFER: usize = 8192;

/// The render settings that change the pixels written for an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSettings {
    pub minimum_width: u32,
    pub remove_border: bool,
    pub quality: u8,
}

/// Fingerprint `path` as it would be rendered with `orientation` and
/// `pixels`. Returns 64 lowercase hex characters.
pub fn fingerprint(
    path: &Path,
    orientation: Orientation,
    pixels: PixelSettings,
) -> Result<String, FingerprintError> {
    let wrap = |source: io::Error| FingerprintError::Io {
        path: path.display().to_string(),
        source,
    };

    let absolute = std::path::absolute(path).map_err(wrap)?;
    let mut file = File::open(&absolute).map_err(wrap)?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_BUFFER];
    loop {
        let read = file.read(&mut buffer).map_err(wrap)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    hasher.update(absolute.as_os_str().as_encoded_bytes());
    hasher.update(orientation.ordinal().to_be_bytes());
    hasher.update(pixels.minimum_width.to_be_bytes());
    hasher.update(u32::from(pixels.remove_border).to_be_bytes());
    hasher.update(u32::from(pixels.quality).to_be_bytes());

    Ok(format!("{:x}", hasher.finalize()))
}
