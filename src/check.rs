//! Cheap "has anything changed?" test for scheduled runs.
//!
//! The input tree's file count is compared with the count recorded after the
//! previous successful run. The record lives in the state directory as
//! `check_<sha256 of input path>.txt` containing a single `count = N` line,
//! so one state directory can serve several input trees.
//!
//! Counting misses edits that keep the number of files the same. It is meant
//! for a nightly job where adding or removing photos is the common change.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of comparing the input tree against the stored count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeCheck {
    path: PathBuf,
    record: String,
    changed: bool,
}

impl ChangeCheck {
    /// Count files under `input` and compare with the record in `state_dir`.
    pub fn evaluate(input: &Path, state_dir: &Path) -> Self {
        let path = state_dir.join(check_file_name(input));
        let record = format!("count = {}", count_files(input));

        let previous = match fs::read_to_string(&path) {
            Ok(text) => text.lines().collect::<String>(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Check file {} not found", path.display());
                String::new()
            }
            Err(e) => {
                warn!("Cannot read {}: {e}", path.display());
                String::new()
            }
        };

        let shown = if previous.is_empty() { "(blank)" } else { previous.as_str() };
        info!("Old {shown}, new {record}");

        let changed = previous != record;
        Self {
            path,
            record,
            changed,
        }
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Store the new count. Does nothing when the count was unchanged.
    pub fn update(&self) -> io::Result<()> {
        if self.changed {
            fs::write(&self.path, format!("{}\n", self.record))?;
        }
        Ok(())
    }
}

/// `check_<hex>.txt`, keyed by the absolute input path.
pub fn check_file_name(input: &Path) -> String {
    let absolute = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
    let digest = Sha256::digest(absolute.as_os_str().as_encoded_bytes());
    format!("check_{digest:x}.txt")
}

/// Every regular file under `root`, whatever its type.
pub fn count_files(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}
