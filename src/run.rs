//! One complete run, from configuration to summary.
//!
//! ```text
//! validate config ─► lock state dir ─► change check ─┬─ unchanged ─► done
//!                                                    │
//!   clear old output ◄───────────────────────────────┘
//!        │
//!   open cache ─► scan (2 passes) ─► assign + render ─► reconcile cache
//!        │
//!   update change check ─► RunSummary
//! ```
//!
//! Per-file problems never abort a run; they show up as counts in the
//! [`RunSummary`]. Only bad configuration, missing directories, a held lock
//! and the file-count limit are fatal.

use crate::cache::{CACHE_DIRECTORY, CacheStats, ContentCache};
use crate::check::ChangeCheck;
use crate::config::{ConfigError, FrameConfig};
use crate::imaging::{ImageBackend, RustBackend, load_system_font};
use crate::index::IndexAssigner;
use crate::lock::{LockError, RunLock};
use crate::orientation::RotationTally;
use crate::render::{RenderSettings, Renderer};
use crate::scan::{ScanError, assign_and_process, scan};
use crate::tree::{ClearOutcome, clear_output_tree};
use chrono::Local;
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("input directory {0} does not exist")]
    InputMissing(PathBuf),
    #[error("output directory {0} does not exist")]
    OutputMissing(PathBuf),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a run reads, writes and keeps its bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Cache, lock, check file and run logs.
    pub state_dir: PathBuf,
}

/// Cache repair done after the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheRepair {
    pub removed_rows: usize,
    pub unreferenced: usize,
    pub pruned: usize,
}

/// Everything a caller needs to report on a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// The change check found nothing new, so no files were touched.
    pub up_to_date: bool,
    pub copied: usize,
    pub skipped_files: usize,
    pub skipped_dirs: usize,
    pub failed: usize,
    pub cache_enabled: bool,
    pub cache: CacheStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_repair: Option<CacheRepair>,
    pub rotations: RotationTally,
    /// The previous output could not be cleared because it held foreign files.
    pub output_refused: bool,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Run with the production backend and an OS-seeded shuffle.
pub fn run(config: &FrameConfig, paths: &RunPaths) -> Result<RunSummary, RunError> {
    run_with_backend(&RustBackend::new(), &mut IndexAssigner::new(), config, paths)
}

/// Run with an explicit backend and index source (allows testing with mock).
pub fn run_with_backend<B: ImageBackend, R: Rng>(
    backend: &B,
    assigner: &mut IndexAssigner<R>,
    config: &FrameConfig,
    paths: &RunPaths,
) -> Result<RunSummary, RunError> {
    let started = Instant::now();
    info!("Starting at {}", Local::now().format("%d %b %Y %H:%M:%S"));

    config.validate()?;
    let mut config = config.clone();
    config.check_consistency();

    if !paths.input.is_dir() {
        return Err(RunError::InputMissing(paths.input.clone()));
    }
    if !paths.output.is_dir() {
        return Err(RunError::OutputMissing(paths.output.clone()));
    }
    fs::create_dir_all(&paths.state_dir)?;
    let _lock = RunLock::acquire(&paths.state_dir)?;

    let mut summary = RunSummary {
        cache_enabled: config.cache,
        ..RunSummary::default()
    };

    let check = config
        .check
        .then(|| ChangeCheck::evaluate(&paths.input, &paths.state_dir));
    if let Some(check) = &check
        && !check.changed()
    {
        info!("Output files do not need to be regenerated");
        summary.up_to_date = true;
        summary.elapsed_secs = started.elapsed().as_secs_f64();
        return Ok(summary);
    }

    if let ClearOutcome::Refused { .. } = clear_output_tree(&paths.output)? {
        summary.output_refused = true;
    }

    let settings = RenderSettings::from_config(&config);
    let mut renderer = Renderer::new(backend, settings.clone());
    if config.cache {
        match ContentCache::open(&paths.state_dir.join(CACHE_DIRECTORY)) {
            Ok(cache) => renderer = renderer.with_cache(cache),
            Err(e) => {
                warn!("Cache unavailable, rendering everything: {e}");
                summary.cache_enabled = false;
            }
        }
    }
    if settings.wants_annotation()
        && let Some(font) = load_system_font()
    {
        renderer = renderer.with_font(font);
    }

    let (collected, _exclusions) = scan(&paths.input, &paths.state_dir);
    summary.skipped_files = collected.skipped_files;
    summary.skipped_dirs = collected.skipped_dirs;
    info!("{} files to process", collected.eligible.len());

    let report = assign_and_process(
        collected.eligible,
        assigner,
        &mut renderer,
        &paths.output,
        config.copy_log.then_some(paths.state_dir.as_path()),
    )?;
    summary.copied = report.copied;
    summary.failed = report.failed;
    summary.rotations = report.rotations;
    summary.cache = renderer.stats();

    if let Some(cache) = renderer.into_cache() {
        summary.cache_repair = Some(repair_cache(&cache, config.cache_settings.prune_unreferenced));
    }

    if let Some(check) = &check
        && let Err(e) = check.update()
    {
        warn!("Cannot update check file: {e}");
    }

    summary.elapsed_secs = started.elapsed().as_secs_f64();
    info!("Finishing at {}", Local::now().format("%d %b %Y %H:%M:%S"));
    Ok(summary)
}

fn repair_cache(cache: &ContentCache, prune: bool) -> CacheRepair {
    match cache.reconcile() {
        Ok(report) => CacheRepair {
            removed_rows: report.removed_rows.len(),
            unreferenced: report.unreferenced.len(),
            pruned: if prune {
                cache.prune_unreferenced(&report)
            } else {
                0
            },
        },
        Err(e) => {
            warn!("Cache reconcile failed: {e}");
            CacheRepair::default()
        }
    }
}
