//! Rendered-output cache for repeat runs.
//!
//! Decoding, rotating, enlarging and re-encoding a camera JPEG is the slow
//! part of a run. Most of a library does not change between runs, so the
//! rendered bytes are kept and reused whenever the same input is rendered
//! under the same settings again.
//!
//! # Design
//!
//! ## Keys
//!
//! Entries are keyed by input path and looked up by (input path,
//! [fingerprint](crate::fingerprint)). The fingerprint covers the file
//! content and every setting that changes pixels, so a hit means the cached
//! bytes are exactly what a fresh render would produce. There is at most one
//! entry per input path: storing a new rendering deletes the old artifact.
//!
//! ## Storage
//!
//! ```text
//! framefill-cache/
//! ├── cache.db                      # SQLite: cachedfiles(filename, sha256, cachedfile)
//! ├── 00/
//! │   └── 180926-142501-013-00000.jpg
//! ├── 01/
//! │   └── 180926-142501-020-00001.jpg
//! └── ...                           # 100 buckets, chosen by counter mod 100
//! ```
//!
//! Artifact names carry no trace of the input filename; they are a
//! timestamp plus a rolling counter, bucketed so no directory grows without
//! bound.
//!
//! ## Repair
//!
//! A run killed mid-way can leave rows pointing at artifacts that were never
//! written, or artifacts no row mentions. [`ContentCache::reconcile`] drops
//! the former and reports the latter; [`ContentCache::prune_unreferenced`]
//! deletes what was reported.
//!
//! ## Failure
//!
//! The cache is an optimisation. Lookups that fail are misses, and a cache
//! that cannot be opened means the run renders everything.

use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Name of the cache directory inside the state directory.
pub const CACHE_DIRECTORY: &str = "framefill-cache";

/// Name of the SQLite database inside the cache directory.
const DATABASE_FILENAME: &str = "cache.db";

/// Number of artifact bucket directories.
const BUCKETS: u32 = 100;

/// The rolling counter wraps after this value.
const COUNTER_LIMIT: u32 = 99_999;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Persistent map from (input path, fingerprint) to a rendered artifact.
pub struct ContentCache {
    conn: Connection,
    root: PathBuf,
    counter: u32,
}

/// Outcome of [`ContentCache::reconcile`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Artifact paths whose rows were deleted because the file was missing.
    pub removed_rows: Vec<String>,
    /// Artifact files on disk that no row refers to. Not deleted.
    pub unreferenced: Vec<PathBuf>,
}

impl ContentCache {
    /// Open (creating if needed) the cache rooted at `root`.
    ///
    /// A plain file sitting where the directory should be is replaced.
    pub fn open(root: &Path) -> Result<Self, CacheError> {
        let root = std::path::absolute(root)?;
        if root.is_file() {
            warn!("{} is a file, replacing it with a cache directory", root.display());
            fs::remove_file(&root)?;
        }
        if !root.exists() {
            fs::create_dir_all(&root)?;
            info!("Created cache directory {}", root.display());
        }

        let conn = Connection::open(root.join(DATABASE_FILENAME))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cachedfiles (
                filename TEXT NOT NULL PRIMARY KEY,
                sha256 TEXT NOT NULL,
                cachedfile TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn,
            root,
            counter: 0,
        })
    }

    /// Cache directory (absolute).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the artifact rendered for `input` with this `fingerprint`.
    ///
    /// Database errors are logged and reported as a miss.
    pub fn lookup(&self, input: &Path, fingerprint: &str) -> Option<PathBuf> {
        let result = self
            .conn
            .query_row(
                "SELECT cachedfile FROM cachedfiles WHERE filename = ?1 AND sha256 = ?2",
                params![key_for(input), fingerprint],
                |row| row.get::<_, String>(0),
            )
            .optional();
        match result {
            Ok(found) => found.map(PathBuf::from),
            Err(e) => {
                warn!("Cache lookup for {} failed: {e}", input.display());
                None
            }
        }
    }

    /// Record `bytes` as the rendering of `input` under `fingerprint`.
    ///
    /// Any artifact previously stored for `input` is deleted first. Returns
    /// the new artifact path.
    pub fn store(
        &mut self,
        input: &Path,
        fingerprint: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, CacheError> {
        let key = key_for(input);

        let previous: Option<String> = self
            .conn
            .query_row(
                "SELECT cachedfile FROM cachedfiles WHERE filename = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(previous) = previous {
            debug!("Delete old cached file {previous}");
            if let Err(e) = fs::remove_file(&previous)
                && e.kind() != io::ErrorKind::NotFound
            {
                warn!("Could not delete old cached file {previous}: {e}");
            }
        }

        let artifact = self.next_artifact_path();
        self.conn.execute(
            "INSERT OR REPLACE INTO cachedfiles (filename, sha256, cachedfile) VALUES (?1, ?2, ?3)",
            params![key, fingerprint, artifact.to_string_lossy()],
        )?;

        if let Some(parent) = artifact.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&artifact, bytes)?;
        Ok(artifact)
    }

    /// Drop rows whose artifact is gone and report artifacts no row uses.
    pub fn reconcile(&self) -> Result<ReconcileReport, CacheError> {
        let on_disk = self.artifacts_on_disk();

        let mut stmt = self
            .conn
            .prepare("SELECT cachedfile FROM cachedfiles ORDER BY cachedfile")?;
        let referenced: BTreeSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;

        let mut report = ReconcileReport::default();
        let mut delete = self
            .conn
            .prepare("DELETE FROM cachedfiles WHERE cachedfile = ?1")?;
        for artifact in referenced.difference(&on_disk) {
            info!("Delete cache entry for missing {artifact}");
            delete.execute(params![artifact])?;
            report.removed_rows.push(artifact.clone());
        }

        for orphan in on_disk.difference(&referenced) {
            info!("Unreferenced cache file {orphan}");
            report.unreferenced.push(PathBuf::from(orphan));
        }

        Ok(report)
    }

    /// Delete the unreferenced artifacts found by [`reconcile`](Self::reconcile).
    /// Returns how many were removed.
    pub fn prune_unreferenced(&self, report: &ReconcileReport) -> usize {
        let mut removed = 0;
        for path in &report.unreferenced {
            if !path.starts_with(&self.root) {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Could not delete {}: {e}", path.display()),
            }
        }
        removed
    }

    /// Every regular file under the root except the database and its journals.
    fn artifacts_on_disk(&self) -> BTreeSet<String> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("Cache scan: {e}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                !e.file_name()
                    .to_string_lossy()
                    .starts_with(DATABASE_FILENAME)
            })
            .map(|e| e.path().to_string_lossy().to_string())
            .collect()
    }

    /// `<root>/<bucket>/<ddmmyy-HHMMSS-mmm>-<counter>.jpg`
    fn next_artifact_path(&mut self) -> PathBuf {
        if self.counter > COUNTER_LIMIT {
            self.counter = 0;
        }
        let counter = self.counter;
        self.counter += 1;

        let stamp = Local::now().format("%d%m%y-%H%M%S-%3f");
        self.root
            .join(format!("{:02}", counter % BUCKETS))
            .join(format!("{stamp}-{counter:05}.jpg"))
    }
}

/// Rows are keyed by the absolute input path.
fn key_for(input: &Path) -> String {
    std::path::absolute(input)
        .unwrap_or_else(|_| input.to_path_buf())
        .to_string_lossy()
        .to_string()
}

/// Summary of cache behaviour for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Inputs copied unmodified because rendering failed.
    pub fallbacks: usize,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn fallback(&mut self) {
        self.fallbacks += 1;
    }

    pub fn total(&self) -> usize {
        self.hits + self.misses + self.fallbacks
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fallbacks > 0 {
            write!(
                f,
                "{} cached, {} rendered, {} copied unmodified ({} total)",
                self.hits,
                self.misses,
                self.fallbacks,
                self.total()
            )
        } else if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.misses)
        }
    }
}
