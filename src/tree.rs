//! Clearing the previous output tree.
//!
//! Each run replaces the frame's contents, so the old output is removed
//! first. Pointing the output at the wrong directory would be disastrous,
//! so the tree is only cleared when every file in it looks like something
//! this program writes: `<digits>.jpg`, or the `Thumbs.db` Windows leaves
//! behind. The output root itself is kept since it is often a mount point.

use crate::naming::is_output_file_name;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    /// Files and directories removed.
    Cleared { removed: usize },
    /// The tree holds files this program did not write; nothing was touched.
    Refused { foreign: Vec<PathBuf> },
}

/// Files under `root` whose names are not output names.
pub fn foreign_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| !e.file_type().is_dir())
        .filter(|e| !is_output_file_name(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

/// Empty `root` if it is a valid output tree.
pub fn clear_output_tree(root: &Path) -> io::Result<ClearOutcome> {
    let foreign = foreign_files(root);
    if !foreign.is_empty() {
        for path in &foreign {
            warn!("{} doesn't look like output", path.display());
        }
        warn!(
            "Not deleting {}: not certain it is a photo frame tree",
            root.display()
        );
        return Ok(ClearOutcome::Refused { foreign });
    }

    let mut removed = 0;
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            removed += WalkDir::new(&path).into_iter().filter_map(Result::ok).count();
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    info!("Deleted {removed} entries from {}", root.display());
    Ok(ClearOutcome::Cleared { removed })
}
