//! EXIF orientation model.
//!
//! Cameras store pixels in sensor order and record how the camera was held
//! in the EXIF `Orientation` tag (values 1–8). Each value names the transform
//! that was *applied* to the scene; rendering undoes it with a short
//! composition of quarter-turn rotations and mirrors.
//!
//! ```text
//!   1        2       3      4         5            6           7          8
//!
//! 888888  888888      88  88      8888888888  88                  88  8888888888
//! 88          88      88  88      88  88      88  88          88  88      88  88
//! 8888      8888    8888  8888    88          8888888888  8888888888          88
//! 88          88      88  88
//! 88          88  888888  888888
//! ```
//!
//! The ordinal of each variant is part of the cache fingerprint, so the
//! declaration order below is a persisted format. Do not reorder.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Orientation of a stored image, resolved from its raw EXIF code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    None,
    Clockwise,
    Anticlockwise,
    MirrorLeftRight,
    UpsideDown,
    MirrorTopBottom,
    ClockwiseAndMirror,
    AnticlockwiseAndMirror,
    Undefined,
}

/// A primitive pixel transform. Rotations are clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rotate90,
    Rotate180,
    Rotate270,
    MirrorHorizontal,
}

impl Orientation {
    pub const ALL: [Orientation; 9] = [
        Orientation::None,
        Orientation::Clockwise,
        Orientation::Anticlockwise,
        Orientation::MirrorLeftRight,
        Orientation::UpsideDown,
        Orientation::MirrorTopBottom,
        Orientation::ClockwiseAndMirror,
        Orientation::AnticlockwiseAndMirror,
        Orientation::Undefined,
    ];

    /// Map a raw EXIF orientation code. Anything outside 1–8 is `Undefined`.
    pub fn from_exif(value: u32) -> Self {
        match value {
            1 => Orientation::None,
            2 => Orientation::MirrorLeftRight,
            3 => Orientation::UpsideDown,
            4 => Orientation::MirrorTopBottom,
            5 => Orientation::ClockwiseAndMirror,
            6 => Orientation::Anticlockwise,
            7 => Orientation::AnticlockwiseAndMirror,
            8 => Orientation::Clockwise,
            _ => Orientation::Undefined,
        }
    }

    /// Position in declaration order, folded into fingerprints.
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    /// Steps that bring an image stored with this orientation upright,
    /// applied left to right.
    ///
    /// The mirrored cases are compositions of the plain ones: mirror first,
    /// then rotate. A top-to-bottom mirror is a left-right mirror conjugated
    /// by a quarter turn.
    pub fn correction(self) -> &'static [Step] {
        match self {
            Orientation::None | Orientation::Undefined => &[],
            Orientation::Clockwise => &[Step::Rotate270],
            Orientation::Anticlockwise => &[Step::Rotate90],
            Orientation::UpsideDown => &[Step::Rotate180],
            Orientation::MirrorLeftRight => &[Step::MirrorHorizontal],
            Orientation::MirrorTopBottom => {
                &[Step::Rotate90, Step::MirrorHorizontal, Step::Rotate270]
            }
            Orientation::ClockwiseAndMirror => &[Step::MirrorHorizontal, Step::Rotate270],
            Orientation::AnticlockwiseAndMirror => &[Step::MirrorHorizontal, Step::Rotate90],
        }
    }

    /// Lowercase name used in logs and the rotation summary.
    pub fn name(self) -> &'static str {
        match self {
            Orientation::None => "none",
            Orientation::Clockwise => "clockwise",
            Orientation::Anticlockwise => "anticlockwise",
            Orientation::MirrorLeftRight => "mirror_left_right",
            Orientation::UpsideDown => "upside_down",
            Orientation::MirrorTopBottom => "mirror_top_bottom",
            Orientation::ClockwiseAndMirror => "clockwise_and_mirror",
            Orientation::AnticlockwiseAndMirror => "anticlockwise_and_mirror",
            Orientation::Undefined => "undefined",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How many images were rendered with each orientation during a run.
///
/// Images served from the cache are never counted: they were not rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RotationTally {
    counts: BTreeMap<Orientation, u32>,
}

impl RotationTally {
    pub fn bump(&mut self, orientation: Orientation) {
        *self.counts.entry(orientation).or_insert(0) += 1;
    }

    pub fn count(&self, orientation: Orientation) -> u32 {
        self.counts.get(&orientation).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for RotationTally {
    /// `none 9 clockwise 0 anticlockwise 0 ...` over every orientation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Orientation::ALL
            .iter()
            .map(|o| format!("{} {}", o.name(), self.count(*o)))
            .collect();
        f.write_str(&parts.join(" "))
    }
}
