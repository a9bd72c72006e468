//! Output file naming.
//!
//! Frames play files in name order, and many choke on directories with
//! thousands of entries. Output index `N` is written as
//!
//! ```text
//! <output>/<bucket>/<N>.jpg      bucket = N rounded down to a multiple of 100
//!
//! output/
//! ├── 000000/
//! │   ├── 000000.jpg
//! │   ├── ...
//! │   └── 000099.jpg
//! ├── 000100/
//! │   └── 000100.jpg ...
//! ```
//!
//! Both parts are zero-padded to six digits so lexical order is numeric order.

use std::path::{Path, PathBuf};

/// Files per output directory.
pub const FILES_PER_DIRECTORY: usize = 100;

/// Windows thumbnail cache, tolerated inside an output tree.
pub const THUMBS_DB: &str = "Thumbs.db";

/// Six-digit label for an output index, as used in file names and captions.
pub fn index_label(index: usize) -> String {
    format!("{index:06}")
}

/// Where output index `index` is written under `root`.
pub fn output_path(root: &Path, index: usize) -> PathBuf {
    let bucket = index - index % FILES_PER_DIRECTORY;
    root.join(index_label(bucket))
        .join(format!("{}.jpg", index_label(index)))
}

/// True for names this program writes into an output tree: one or more
/// digits followed by `.jpg`. `Thumbs.db` is also accepted.
pub fn is_output_file_name(name: &str) -> bool {
    if name == THUMBS_DB {
        return true;
    }
    match name.strip_suffix(".jpg") {
        Some(stem) => !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// True when `path` ends in `.jpg`, ignoring case.
pub fn has_jpg_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg"))
}
