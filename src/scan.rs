//! Input tree walking, exclusions and dispatch.
//!
//! The input tree is walked twice:
//!
//! 1. **Exclusions** ([`find_exclusions`]). Two marker files are honoured:
//!    - `_photoframe_exclude.txt` excludes the directory it sits in and
//!      everything beneath it.
//!    - `_photoframe_exclude_list.txt` lists file names, one per line,
//!      relative to the directory it sits in.
//! 2. **Collection** ([`collect_eligible`]). Excluded subtrees are not
//!    entered, listed files are skipped, and every remaining `.jpg` is
//!    eligible.
//!
//! ```text
//! photos/
//! ├── 2019/
//! │   ├── a.jpg                        eligible
//! │   ├── b.jpg                        skipped (listed)
//! │   └── _photoframe_exclude_list.txt    "b.jpg"
//! └── private/                         skipped subtree
//!     ├── _photoframe_exclude.txt
//!     └── c.jpg                        skipped
//! ```
//!
//! Eligible files then get a random output position ([`IndexAssigner`]),
//! are sorted by it and renumbered `0..N`, and are rendered in that order
//! ([`assign_and_process`]). The frame sees a gap-free, shuffled sequence.

use crate::imaging::ImageBackend;
use crate::index::{CapacityError, IndexAssigner};
use crate::naming::{has_jpg_extension, output_path};
use crate::orientation::RotationTally;
use crate::render::{RenderOutcome, Renderer};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Marker excluding its directory and the whole subtree below.
pub const EXCLUDE_DIRECTORY_MARKER: &str = "_photoframe_exclude.txt";
/// Marker listing individual files to exclude.
pub const EXCLUDE_LIST_MARKER: &str = "_photoframe_exclude_list.txt";
/// Exclusions found in pass 1, written to the state directory.
pub const EXCLUSION_MANIFEST: &str = "exclusion_list.txt";
/// Optional record of every source/destination pair.
pub const COPY_LOG: &str = "copy_list.txt";

const PROGRESS_EVERY: usize = 100;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

/// Directories and files to leave out of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Exclusions {
    pub directories: BTreeSet<PathBuf>,
    pub files: BTreeSet<PathBuf>,
}

/// Result of the collection pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collected {
    /// Eligible inputs in traversal order.
    pub eligible: Vec<PathBuf>,
    /// Listed files plus `.jpg` files inside skipped subtrees.
    pub skipped_files: usize,
    /// Excluded subtrees not entered. Each counts once.
    pub skipped_dirs: usize,
}

/// An input and its final output position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub index: usize,
    pub source: PathBuf,
}

/// Totals from rendering every assignment.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    /// Output files written (rendered, cached or copied).
    pub copied: usize,
    /// Inputs for which nothing could be written.
    pub failed: usize,
    pub rotations: RotationTally,
}

// ============================================================================
// Pass 1: exclusions
// ============================================================================

/// Walk the whole tree and gather exclusion markers.
pub fn find_exclusions(root: &Path) -> Exclusions {
    let mut exclusions = Exclusions::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Cannot read {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };

        if entry.file_name() == EXCLUDE_DIRECTORY_MARKER {
            debug!("Exclude subtree {}", dir.display());
            exclusions.directories.extend(
                WalkDir::new(dir)
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_dir())
                    .map(|e| e.into_path()),
            );
        } else if entry.file_name() == EXCLUDE_LIST_MARKER {
            match fs::read_to_string(entry.path()) {
                Ok(list) => {
                    for name in list.lines().map(str::trim).filter(|l| !l.is_empty()) {
                        debug!("Exclude file {name} in {}", dir.display());
                        exclusions.files.insert(dir.join(name));
                    }
                }
                Err(e) => warn!("Cannot read {}: {e}", entry.path().display()),
            }
        }
    }

    exclusions
}

/// Write `exclusion_list.txt`: `directory <path>` lines, then `file <path>`
/// lines, each group sorted.
pub fn write_exclusion_manifest(
    state_dir: &Path,
    exclusions: &Exclusions,
) -> Result<PathBuf, io::Error> {
    let path = state_dir.join(EXCLUSION_MANIFEST);
    let mut out = BufWriter::new(File::create(&path)?);
    for dir in &exclusions.directories {
        writeln!(out, "directory {}", dir.display())?;
    }
    for file in &exclusions.files {
        writeln!(out, "file {}", file.display())?;
    }
    out.flush()?;
    Ok(path)
}

// ============================================================================
// Pass 2: collection
// ============================================================================

/// Walk the tree again, honouring `exclusions`.
pub fn collect_eligible(root: &Path, exclusions: &Exclusions) -> Collected {
    let mut collected = Collected::default();
    let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Cannot read {e}");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if exclusions.directories.contains(entry.path()) {
                let hidden = count_jpgs(entry.path());
                info!(
                    "Skipping directory {} ({hidden} photos)",
                    entry.path().display()
                );
                collected.skipped_dirs += 1;
                collected.skipped_files += hidden;
                walker.skip_current_dir();
            }
            continue;
        }

        if !entry.file_type().is_file() || !has_jpg_extension(entry.path()) {
            continue;
        }
        if exclusions.files.contains(entry.path()) {
            info!("Skipping file {}", entry.path().display());
            collected.skipped_files += 1;
            continue;
        }
        collected.eligible.push(entry.into_path());
    }

    collected
}

fn count_jpgs(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && has_jpg_extension(e.path()))
        .count()
}

/// Both passes. The exclusion manifest is written to `state_dir` in between;
/// failing to write it is logged and the walk goes on.
pub fn scan(root: &Path, state_dir: &Path) -> (Collected, Exclusions) {
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let exclusions = find_exclusions(&root);
    match write_exclusion_manifest(state_dir, &exclusions) {
        Ok(manifest) => debug!("Wrote {}", manifest.display()),
        Err(e) => warn!("Cannot write exclusion list in {}: {e}", state_dir.display()),
    }
    let collected = collect_eligible(&root, &exclusions);
    (collected, exclusions)
}

// ============================================================================
// Assignment and dispatch
// ============================================================================

/// Give every input a random position, then renumber densely in that order.
pub fn assign_indices<R: Rng>(
    eligible: Vec<PathBuf>,
    assigner: &mut IndexAssigner<R>,
) -> Result<Vec<Assignment>, CapacityError> {
    let mut drawn = eligible
        .into_iter()
        .map(|source| Ok((assigner.next_index()?, source)))
        .collect::<Result<Vec<_>, CapacityError>>()?;
    drawn.sort_unstable_by_key(|(index, _)| *index);

    Ok(drawn
        .into_iter()
        .enumerate()
        .map(|(index, (_, source))| Assignment { index, source })
        .collect())
}

/// Assign positions to `eligible` and render each into `output_root`.
///
/// When `copy_log_dir` is set, `copy_list.txt` there records every pair.
/// A copy log that cannot be created is skipped with a warning.
pub fn assign_and_process<B: ImageBackend, R: Rng>(
    eligible: Vec<PathBuf>,
    assigner: &mut IndexAssigner<R>,
    renderer: &mut Renderer<'_, B>,
    output_root: &Path,
    copy_log_dir: Option<&Path>,
) -> Result<ProcessReport, ScanError> {
    let assignments = assign_indices(eligible, assigner)?;
    let total = assignments.len();

    let mut copy_log = copy_log_dir.and_then(|dir| {
        let path = dir.join(COPY_LOG);
        match File::create(&path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                warn!("Cannot create {}: {e}", path.display());
                None
            }
        }
    });

    let mut report = ProcessReport::default();
    for (done, Assignment { index, source }) in assignments.into_iter().enumerate() {
        let destination = output_path(output_root, index);

        if let Some(log) = copy_log.as_mut()
            && let Err(e) = writeln!(log, "Copy {} to {}", source.display(), destination.display())
        {
            warn!("Cannot write copy log: {e}");
        }

        let outcome = renderer.render(&source, &destination, index);
        if outcome.wrote_output() {
            report.copied += 1;
        } else {
            report.failed += 1;
        }
        if let RenderOutcome::Rendered {
            orientation: Some(orientation),
        } = outcome
        {
            report.rotations.bump(orientation);
        }

        if (done + 1) % PROGRESS_EVERY == 0 {
            info!("{} of {total} files processed", done + 1);
        }
    }

    if let Some(mut log) = copy_log
        && let Err(e) = log.flush()
    {
        warn!("Cannot write copy log: {e}");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::render::RenderSettings;
    use crate::test_helpers::{exclude_dir, exclude_files, list_files, write_tree};
    use tempfile::TempDir;

    fn names(paths: &[PathBuf], root: &Path) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    // =========================================================================
    // Exclusions
    // =========================================================================

    #[test]
    fn directory_marker_excludes_whole_subtree() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_tree(root, &["keep/a.jpg", "private/b.jpg", "private/deep/c.jpg"]);
        exclude_dir(root, "private");

        let ex = find_exclusions(root);
        assert_eq!(
            ex.directories,
            BTreeSet::from([root.join("private"), root.join("private/deep")])
        );
        assert!(ex.files.is_empty());
    }

    #[test]
    fn list_marker_resolves_relative_to_its_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_tree(root, &["2019/a.jpg", "2019/b.jpg"]);
        fs::write(root.join("2019").join(EXCLUDE_LIST_MARKER), "b.jpg\n\n  \nmissing.jpg\n")
            .unwrap();

        let ex = find_exclusions(root);
        assert_eq!(
            ex.files,
            BTreeSet::from([root.join("2019/b.jpg"), root.join("2019/missing.jpg")])
        );
    }

    #[test]
    fn exclusion_manifest_lists_directories_then_files_sorted() {
        let tmp = TempDir::new().unwrap();
        let ex = Exclusions {
            directories: BTreeSet::from([PathBuf::from("/p/z"), PathBuf::from("/p/a")]),
            files: BTreeSet::from([PathBuf::from("/p/y.jpg"), PathBuf::from("/p/b.jpg")]),
        };

        let path = write_exclusion_manifest(tmp.path(), &ex).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "directory /p/a\ndirectory /p/z\nfile /p/b.jpg\nfile /p/y.jpg\n"
        );
    }

    // =========================================================================
    // Collection
    // =========================================================================

    #[test]
    fn only_jpg_files_are_eligible() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_tree(root, &["a.jpg", "b.JPG", "c.jpeg", "d.png", "notes.txt", "sub/e.jpg"]);

        let collected = collect_eligible(root, &Exclusions::default());
        assert_eq!(names(&collected.eligible, root), ["a.jpg", "b.JPG", "sub/e.jpg"]);
        assert_eq!(collected.skipped_files, 0);
        assert_eq!(collected.skipped_dirs, 0);
    }

    #[test]
    fn skipped_subtree_counts_once_and_its_photos_count_as_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_tree(
            root,
            &["a.jpg", "private/b.jpg", "private/deep/c.jpg", "private/deep/d.txt"],
        );
        exclude_dir(root, "private");

        let (collected, _) = scan(root, tmp.path());
        let root = std::path::absolute(root).unwrap();
        assert_eq!(names(&collected.eligible, &root), ["a.jpg"]);
        assert_eq!(collected.skipped_dirs, 1);
        assert_eq!(collected.skipped_files, 2);
    }

    #[test]
    fn listed_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_tree(root, &["x/a.jpg", "x/b.jpg", "x/c.jpg"]);
        exclude_files(root, "x", &["b.jpg", "c.jpg"]);

        let collected = collect_eligible(root, &find_exclusions(root));
        assert_eq!(names(&collected.eligible, root), ["x/a.jpg"]);
        assert_eq!(collected.skipped_files, 2);
        assert_eq!(collected.skipped_dirs, 0);
    }

    #[test]
    fn scan_writes_exclusion_manifest() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let state = tmp.path().join("state");
        fs::create_dir_all(&state).unwrap();
        write_tree(&input, &["a.jpg", "p/b.jpg"]);
        exclude_dir(&input, "p");

        scan(&input, &state);
        let manifest = fs::read_to_string(state.join(EXCLUSION_MANIFEST)).unwrap();
        assert!(manifest.starts_with("directory "));
        assert!(manifest.trim_end().ends_with("/p") || manifest.trim_end().ends_with("\\p"));
    }

    #[test]
    fn unwritable_exclusion_manifest_does_not_stop_scan() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let state = tmp.path().join("state");
        fs::create_dir_all(state.join(EXCLUSION_MANIFEST)).unwrap();
        write_tree(&input, &["a.jpg", "b.jpg"]);

        let (collected, _) = scan(&input, &state);
        assert_eq!(collected.eligible.len(), 2);
        assert!(state.join(EXCLUSION_MANIFEST).is_dir());
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    #[test]
    fn assignments_are_dense_and_cover_every_input() {
        let inputs: Vec<PathBuf> = (0..50).map(|i| PathBuf::from(format!("/in/{i}.jpg"))).collect();
        let mut assigner = IndexAssigner::seeded(9, 1_000_000);

        let assignments = assign_indices(inputs.clone(), &mut assigner).unwrap();

        let indices: Vec<usize> = assignments.iter().map(|a| a.index).collect();
        assert_eq!(indices, (0..50).collect::<Vec<_>>());
        let mut sources: Vec<PathBuf> = assignments.into_iter().map(|a| a.source).collect();
        assert_ne!(sources, inputs, "order should be shuffled");
        sources.sort();
        let mut expected = inputs;
        expected.sort();
        assert_eq!(sources, expected);
    }

    #[test]
    fn too_many_inputs_is_capacity_error() {
        let inputs: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("/{i}.jpg"))).collect();
        let mut assigner = IndexAssigner::seeded(1, 4);
        assert_eq!(
            assign_indices(inputs, &mut assigner),
            Err(CapacityError { capacity: 4 })
        );
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[test]
    fn process_writes_bucketed_outputs_and_copy_log() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_tree(&input, &["a.jpg", "b.jpg", "c/d.jpg"]);

        let backend = MockBackend::new();
        let settings = RenderSettings {
            minimum_width: 8,
            show_directory: false,
            ..RenderSettings::default()
        };
        let mut renderer = Renderer::new(&backend, settings);
        let collected = collect_eligible(&input, &Exclusions::default());

        let report = assign_and_process(
            collected.eligible,
            &mut IndexAssigner::seeded(5, 1_000_000),
            &mut renderer,
            &output,
            Some(tmp.path()),
        )
        .unwrap();

        assert_eq!(report.copied, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.rotations.total(), 3);
        assert_eq!(
            list_files(&output),
            ["000000/000000.jpg", "000000/000001.jpg", "000000/000002.jpg"]
        );

        let log = fs::read_to_string(tmp.path().join(COPY_LOG)).unwrap();
        assert_eq!(log.lines().count(), 3);
        assert!(log.lines().all(|l| l.starts_with("Copy ") && l.contains(" to ")));
    }

    #[test]
    fn missing_copy_log_directory_still_renders() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_tree(&input, &["a.jpg", "b.jpg"]);

        let backend = MockBackend::new();
        let mut renderer = Renderer::new(
            &backend,
            RenderSettings {
                show_directory: false,
                ..RenderSettings::default()
            },
        );
        let collected = collect_eligible(&input, &Exclusions::default());
        let absent = tmp.path().join("no/such/dir");

        let report = assign_and_process(
            collected.eligible,
            &mut IndexAssigner::seeded(3, 1_000_000),
            &mut renderer,
            &output,
            Some(&absent),
        )
        .unwrap();

        assert_eq!(report.copied, 2);
        assert!(!absent.exists());
        assert_eq!(list_files(&output).len(), 2);
    }
}
