//! Turning one input photo into one output file.
//!
//! ```text
//! read EXIF ─┬─ cache hit? ── copy cached bytes ─────────────────► Cached
//!            │
//!            └─ decode → orient → RGB → trim border → enlarge
//!                → heading + caption → encode JPEG → write (+ cache) ► Rendered
//!
//! any failure after EXIF ───────── copy the original unchanged ─► Copied
//! ```
//!
//! Nothing here is fatal. A file that cannot be rendered is copied as-is so
//! the frame still shows it; a file that cannot even be copied is reported
//! as [`RenderOutcome::Failed`] and the walk continues.

use crate::cache::{CacheError, CacheStats, ContentCache};
use crate::config::FrameConfig;
use crate::fingerprint::{FingerprintError, PixelSettings, fingerprint};
use crate::imaging::annotate::{Annotation, annotate};
use crate::imaging::{BackendError, ExifData, ImageBackend, border, operations};
use crate::naming::index_label;
use crate::orientation::Orientation;
use ab_glyph::FontArc;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// The per-image subset of [`FrameConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub minimum_width: u32,
    pub quality: u8,
    pub rotate: bool,
    pub remove_border: bool,
    pub show_directory: bool,
    pub show_filename: bool,
    pub show_index: bool,
    pub show_date: bool,
}

impl RenderSettings {
    pub fn from_config(config: &FrameConfig) -> Self {
        Self {
            minimum_width: config.minimum_width,
            quality: config.quality,
            rotate: config.rotate,
            remove_border: config.remove_border,
            show_directory: config.annotate.directory,
            show_filename: config.annotate.filename,
            show_index: config.annotate.index,
            show_date: config.annotate.date,
        }
    }

    /// The settings folded into the cache fingerprint.
    pub fn pixel_settings(&self) -> PixelSettings {
        PixelSettings {
            minimum_width: self.minimum_width,
            remove_border: self.remove_border,
            quality: self.quality,
        }
    }

    pub fn wants_annotation(&self) -> bool {
        self.show_directory || self.show_filename || self.show_index || self.show_date
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&FrameConfig::default())
    }
}

/// What happened to one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Served from the cache. No pixel work was done.
    Cached,
    /// Rendered fresh. `orientation` is the correction applied, or `None`
    /// when rotation is disabled.
    Rendered { orientation: Option<Orientation> },
    /// Rendering failed and the original bytes were copied.
    Copied,
    /// Neither rendering nor copying worked.
    Failed,
}

impl RenderOutcome {
    /// True if an output file was written.
    pub fn wrote_output(&self) -> bool {
        !matches!(self, RenderOutcome::Failed)
    }
}

/// Renders inputs one at a time, sharing the cache and font across a run.
pub struct Renderer<'a, B: ImageBackend> {
    backend: &'a B,
    settings: RenderSettings,
    cache: Option<ContentCache>,
    font: Option<FontArc>,
    stats: CacheStats,
}

impl<'a, B: ImageBackend> Renderer<'a, B> {
    pub fn new(backend: &'a B, settings: RenderSettings) -> Self {
        Self {
            backend,
            settings,
            cache: None,
            font: None,
            stats: CacheStats::default(),
        }
    }

    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn cache(&self) -> Option<&ContentCache> {
        self.cache.as_ref()
    }

    /// Give back the cache so the caller can reconcile it.
    pub fn into_cache(self) -> Option<ContentCache> {
        self.cache
    }

    /// Produce `output` from `input`, labelled with output `index`.
    pub fn render(&mut self, input: &Path, output: &Path, index: usize) -> RenderOutcome {
        if let Some(parent) = output.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!("Cannot create {}: {e}", parent.display());
            return RenderOutcome::Failed;
        }

        match self.try_render(input, output, index) {
            Ok(outcome) => {
                match outcome {
                    RenderOutcome::Cached => self.stats.hit(),
                    _ => self.stats.miss(),
                }
                outcome
            }
            Err(e) => {
                warn!("Cannot render {}: {e}; copying unmodified", input.display());
                match fs::copy(input, output) {
                    Ok(_) => {
                        self.stats.fallback();
                        RenderOutcome::Copied
                    }
                    Err(e) => {
                        warn!(
                            "Cannot copy {} to {}: {e}",
                            input.display(),
                            output.display()
                        );
                        RenderOutcome::Failed
                    }
                }
            }
        }
    }

    fn try_render(
        &mut self,
        input: &Path,
        output: &Path,
        index: usize,
    ) -> Result<RenderOutcome, RenderError> {
        let exif = self.backend.read_exif(input).unwrap_or_else(|e| {
            warn!("Cannot read EXIF from {}: {e}", input.display());
            ExifData::default()
        });
        let orientation = if self.settings.rotate {
            exif.orientation
        } else {
            Orientation::None
        };

        let key = match &self.cache {
            Some(_) => Some(fingerprint(input, orientation, self.settings.pixel_settings())?),
            None => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &key)
            && let Some(artifact) = cache.lookup(input, key)
        {
            match fs::copy(&artifact, output) {
                Ok(_) => {
                    debug!("Cache hit for {}", input.display());
                    return Ok(RenderOutcome::Cached);
                }
                Err(e) => warn!("Cached file {} unusable: {e}", artifact.display()),
            }
        }

        let decoded = self.backend.decode(input)?;
        let oriented = operations::apply_orientation(decoded, orientation);
        let mut pixels = operations::to_rgb(oriented);
        if self.settings.remove_border {
            pixels = border::remove_border(pixels);
        }
        pixels = operations::enlarge_to_width(pixels, self.settings.minimum_width);

        if let Some(font) = &self.font {
            let annotation = self.annotation_for(input, index, exif.date.as_deref());
            if !annotation.is_empty() {
                annotate(&mut pixels, font, &annotation);
            }
        }

        let bytes = self.backend.encode_jpeg(&pixels, self.settings.quality)?;
        fs::write(output, &bytes)?;

        if let (Some(cache), Some(key)) = (&mut self.cache, &key)
            && let Err(e) = cache.store(input, key, &bytes)
        {
            warn!("Cannot cache {}: {e}", input.display());
        }

        Ok(RenderOutcome::Rendered {
            orientation: self.settings.rotate.then_some(orientation),
        })
    }

    fn annotation_for(&self, input: &Path, index: usize, date: Option<&str>) -> Annotation {
        let heading = self
            .settings
            .show_directory
            .then(|| parent_name(input))
            .flatten();

        let filename = self
            .settings
            .show_filename
            .then(|| input.file_name().map(|n| n.to_string_lossy().to_string()))
            .flatten();
        let index = self.settings.show_index.then_some(index);
        let date = if self.settings.show_date { date } else { None };

        let caption = build_caption(filename.as_deref(), index, date);
        Annotation {
            heading,
            caption: (!caption.is_empty()).then_some(caption),
        }
    }
}

fn parent_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
}

/// Caption text: file name, six-digit index and date, in that order,
/// separated by single spaces. Absent parts are left out.
pub fn build_caption(filename: Option<&str>, index: Option<usize>, date: Option<&str>) -> String {
    let index = index.map(index_label);
    [filename, index.as_deref(), date]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
