//! Advisory lock preventing two runs over the same state directory.
//!
//! The lock is a file created with `create_new`, so exactly one process can
//! win. It is removed when the [`RunLock`] guard drops. A lock left behind by
//! a crash is taken over once it is older than [`STALE_AFTER`].

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, warn};

pub const LOCK_FILE: &str = "framefill.lock";

/// Locks older than this are assumed to belong to a dead process.
pub const STALE_AFTER: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Error, Debug)]
pub enum LockError {
    #[error("already running (lock file {0})")]
    Held(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Held for the duration of a run.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock in `state_dir`.
    pub fn acquire(state_dir: &Path) -> Result<Self, LockError> {
        let path = state_dir.join(LOCK_FILE);
        remove_if_stale(&path, STALE_AFTER)?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                debug!("Acquired {}", path.display());
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(LockError::Held(path)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Cannot remove lock {}: {e}", self.path.display());
        }
    }
}

fn remove_if_stale(path: &Path, max_age: Duration) -> io::Result<()> {
    let modified = match fs::metadata(path) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age > max_age {
        warn!(
            "Removing stale lock {} ({} days old)",
            path.display(),
            age.as_secs() / 86_400
        );
        fs::remove_file(path)?;
    }
    Ok(())
}
