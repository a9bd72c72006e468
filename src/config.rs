//! Run configuration.
//!
//! Settings are resolved in layers, each overriding the one before:
//!
//! ```text
//! stock defaults  →  config file (--config)  →  command-line flags
//! ```
//!
//! Every layer is a sparse TOML table merged onto the previous one with
//! [`merge_toml`], then the result is deserialized and validated once.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! minimum_width = 1024   # Narrower images are enlarged to this width
//! quality = 90           # JPEG quality (1-100)
//! rotate = true          # Apply EXIF orientation
//! remove_border = false  # Trim uniform white margins
//! cache = false          # Reuse rendered output between runs
//! check = false          # Skip the run when the input tree is unchanged
//! copy_log = false       # Write copy_list.txt to the state directory
//!
//! [annotate]
//! directory = true       # Parent directory name, top-left
//! filename = false       # Caption: source file name
//! index = false          # Caption: output index (disables the cache)
//! date = false           # Caption: EXIF capture date
//!
//! [cache_settings]
//! prune_unreferenced = false  # Delete cache files no entry refers to
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything that shapes a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Images narrower than this are enlarged to exactly this width.
    pub minimum_width: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u8,
    /// Apply the EXIF orientation correction.
    pub rotate: bool,
    /// Trim uniform white borders.
    pub remove_border: bool,
    /// Reuse rendered output between runs.
    pub cache: bool,
    /// Skip the run when the input tree's file count is unchanged.
    pub check: bool,
    /// Record every source/destination pair in `copy_list.txt`.
    pub copy_log: bool,
    pub annotate: AnnotateConfig,
    pub cache_settings: CacheSettings,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            minimum_width: 1024,
            quality: 90,
            rotate: true,
            remove_border: false,
            cache: false,
            check: false,
            copy_log: false,
            annotate: AnnotateConfig::default(),
            cache_settings: CacheSettings::default(),
        }
    }
}

/// Text drawn onto each image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotateConfig {
    pub directory: bool,
    pub filename: bool,
    pub index: bool,
    pub date: bool,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            directory: true,
            filename: false,
            index: false,
            date: false,
        }
    }
}

impl AnnotateConfig {
    pub fn any(&self) -> bool {
        self.directory || self.filename || self.index || self.date
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Delete cache files that no entry refers to, instead of only reporting them.
    pub prune_unreferenced: bool,
}

impl FrameConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_width == 0 {
            return Err(ConfigError::Validation(
                "minimum_width must be greater than 0".into(),
            ));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        Ok(())
    }

    /// Resolve options that cannot be honoured together.
    ///
    /// The output index changes on every run, so index captions would make
    /// every cached rendering stale: annotating the index turns the cache
    /// off. Returns `true` if anything was changed.
    pub fn check_consistency(&mut self) -> bool {
        if self.annotate.index && self.cache {
            warn!("Index annotation is on, so the cache is disabled for this run");
            self.cache = false;
            return true;
        }
        false
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(FrameConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge overlays onto `base` in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<FrameConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: FrameConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Stock defaults, then the optional config file, then `overrides`.
pub fn load_config(
    path: Option<&Path>,
    overrides: toml::Value,
) -> Result<FrameConfig, ConfigError> {
    let mut overlays = Vec::new();
    if let Some(path) = path {
        overlays.push(load_raw_config(path)?);
    }
    overlays.push(overrides);
    resolve_config(stock_defaults_value()?, overlays)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# framefill configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# Images narrower than this (in pixels) are enlarged to exactly this width.
# Part of the cache key: changing it re-renders everything.
minimum_width = 1024

# JPEG encoding quality (1 = worst, 100 = best). Part of the cache key.
quality = 90

# Rotate images upright according to their EXIF orientation.
rotate = true

# Trim a uniform white border around the picture. Part of the cache key.
remove_border = false

# Keep rendered output in the state directory and reuse it on later runs.
cache = false

# Count the files in the input tree and skip the run if nothing changed.
check = false

# Write copy_list.txt (source -> destination) to the state directory.
copy_log = false

# ---------------------------------------------------------------------------
# Annotation
# ---------------------------------------------------------------------------
[annotate]
# Name of the photo's directory, drawn at the top left.
directory = true

# Caption along the bottom: file name, output index and capture date.
# Index captions change every run, so enabling `index` disables the cache.
filename = false
index = false
date = false

# ---------------------------------------------------------------------------
# Cache maintenance
# ---------------------------------------------------------------------------
[cache_settings]
# Delete cached files that no cache entry refers to.
# When false they are only reported.
prune_unreferenced = false
"##
}
