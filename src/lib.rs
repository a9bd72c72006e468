//! # Framefill
//!
//! Fills a digital photo frame from a tree of JPEGs. Every eligible image in
//! the input tree is copied into a flat, randomly ordered output tree that a
//! cheap frame can shuffle through, with each copy rotated upright, optionally
//! trimmed, enlarged and annotated on the way.
//!
//! # Architecture: Scan, Assign, Render
//!
//! ```text
//! 1. Scan     input/   →  eligible files    (exclusion markers honoured)
//! 2. Assign   files    →  random indices    (compacted to 0..N-1)
//! 3. Render   index N  →  output/<bucket>/<N>.jpg
//!                          ├── cache hit  → copy stored artifact
//!                          ├── render     → orient, trim, enlarge, annotate, encode
//!                          └── failure    → copy source unchanged
//! ```
//!
//! [`run`] wraps the three stages with the housekeeping a scheduled job
//! needs: a lock, a change check, clearing the previous output and
//! reconciling the cache afterwards.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`run`] | One complete run: lock, change check, clear, scan, render, reconcile |
//! | [`scan`] | Two-pass walk with exclusions, index assignment, dispatch to rendering |
//! | [`render`] | Per-file pipeline with cache short-circuit and byte-copy fallback |
//! | [`imaging`] | Pixel work: EXIF reading, orientation, border trim, resize, text |
//! | [`cache`] | SQLite-backed content cache of rendered images |
//! | [`fingerprint`] | SHA-256 identity of an input under the settings that change pixels |
//! | [`index`] | Collision-free random output positions |
//! | [`orientation`] | EXIF orientation codes and the steps that correct them |
//! | [`naming`] | Output tree layout and recognised output file names |
//! | [`tree`] | Validates and clears the previous output tree |
//! | [`check`] | File-count change detection between runs |
//! | [`lock`] | Advisory lock file with staleness takeover |
//! | [`config`] | `config.toml` loading, CLI overlays, validation |
//! | [`output`] | CLI output formatting of the run summary |
//!
//! # Design Decisions
//!
//! ## Random Order on Disk
//!
//! Most frames play files in name order. Assigning random indices and then
//! compacting them to `0..N-1` gives a shuffled slideshow with no gaps, and a
//! fresh order on every run.
//!
//! ## Rendering Never Loses a Photo
//!
//! Any failure while decoding, transforming or encoding falls back to copying
//! the source bytes unchanged. A photo the frame shows sideways beats one it
//! does not show at all.
//!
//! ## Text Is Not Part of the Cache Key
//!
//! The cache key covers file content, path, orientation, minimum width,
//! border trimming and JPEG quality. Text annotations are left out, so
//! toggling them serves earlier renders until the cache is reset. Index
//! annotation changes on every run and so turns the cache off.

pub mod cache;
pub mod check;
pub mod config;
pub mod fingerprint;
pub mod imaging;
pub mod index;
pub mod lock;
pub mod naming;
pub mod orientation;
pub mod output;
pub mod render;
pub mod run;
pub mod scan;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
