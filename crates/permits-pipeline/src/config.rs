//! Run configuration, deserialised by the binary from `permits.toml` and
//! `PERMITS_*` environment variables.

use std::path::PathBuf;

use permits_ingest::{GeoBounds, NormalizeOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub sources:        SourcePaths,
  /// Root under which published runs and the `CURRENT` pointer live.
  pub output_dir:     PathBuf,
  /// Published runs kept on disk, including the current one.
  pub retain_runs:    usize,
  pub overlap_window: OverlapWindow,
  /// `None` disables the coordinate bounds check.
  pub geo_bounds:     Option<GeoBounds>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      sources:        SourcePaths::default(),
      output_dir:     PathBuf::from("catalog"),
      retain_runs:    2,
      overlap_window: OverlapWindow::default(),
      geo_bounds:     Some(GeoBounds::SAN_DIEGO),
    }
  }
}

impl PipelineConfig {
  pub fn normalize_options(&self) -> NormalizeOptions {
    NormalizeOptions {
      geo_bounds: self.geo_bounds,
    }
  }
}

/// Raw CSV exports per source system, in the order they are read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
  pub legacy:  Vec<PathBuf>,
  pub current: Vec<PathBuf>,
}

impl SourcePaths {
  pub fn is_empty(&self) -> bool {
    self.legacy.is_empty() && self.current.is_empty()
  }
}

/// Creation years in which both systems were live. Cross-source matches
/// outside it are resolved as usual but reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapWindow {
  pub start_year: i32,
  pub end_year:   i32,
}

impl OverlapWindow {
  pub fn contains(&self, year: i32) -> bool {
    (self.start_year..=self.end_year).contains(&year)
  }
}

impl Default for OverlapWindow {
  fn default() -> Self {
    Self {
      start_year: 2018,
      end_year:   2022,
    }
  }
}
