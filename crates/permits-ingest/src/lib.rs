//! Source normalizer for the permits pipeline.
//!
//! Converts raw CSV exports from either permitting system into canonical
//! [`PermitRecord`]s. Rows that cannot be coerced are returned as
//! [`Rejection`]s next to the records instead of failing the file; only a
//! missing structural column or an I/O failure is an [`Error`].
//!
//! # Quick start
//!
//! ```no_run
//! use permits_core::permit::SourceSystem;
//! use permits_ingest::{NormalizeOptions, normalize};
//!
//! let csv = std::fs::File::open("approvals_2020.csv").unwrap();
//! let batch =
//!   normalize(SourceSystem::Legacy, "approvals_2020.csv", csv, &NormalizeOptions::default())
//!     .unwrap();
//! println!("{} records, {} rejected", batch.records.len(), batch.rejections.len());
//! ```

pub mod coerce;
pub mod error;
pub mod mapping;
mod normalize;
pub mod vocabulary;

use std::{collections::BTreeMap, fs::File, io::BufReader, io::Read, path::Path};

pub use coerce::GeoBounds;
pub use error::{Error, Result};
use permits_core::permit::{PermitRecord, SourceSystem};
use serde::{Deserialize, Serialize};

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
  /// Coordinates outside this box are nulled. `None` disables the check.
  pub geo_bounds: Option<GeoBounds>,
}

impl Default for NormalizeOptions {
  fn default() -> Self {
    Self {
      geo_bounds: Some(GeoBounds::SAN_DIEGO),
    }
  }
}

/// Why a row (or a whole file) was left out of the unified dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
  #[error("missing required field {0}")]
  MissingField(&'static str),

  #[error("{field} is not a date: {value:?}")]
  InvalidDate { field: &'static str, value: String },

  #[error("{field} is not a non-negative integer: {value:?}")]
  InvalidNumber { field: &'static str, value: String },

  #[error("expected {expected} fields, found {found}")]
  MalformedRow { expected: usize, found: usize },

  #[error("undecodable row: {0}")]
  Undecodable(String),

  /// Applies to every row of the file.
  #[error("schema drift against mapping v{version}; missing {missing:?}")]
  SchemaDrift {
    version: u32,
    missing: Vec<&'static str>,
  },
}

impl RejectReason {
  /// A stable name for the variant, used to tally rejections.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::MissingField(_) => "missing_field",
      Self::InvalidDate { .. } => "invalid_date",
      Self::InvalidNumber { .. } => "invalid_number",
      Self::MalformedRow { .. } => "malformed_row",
      Self::Undecodable(_) => "undecodable",
      Self::SchemaDrift { .. } => "schema_drift",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
  pub source:      SourceSystem,
  pub file:        String,
  /// 1-based line in the file; `None` for whole-file rejections.
  pub line:        Option<u64>,
  pub approval_id: Option<String>,
  pub reason:      RejectReason,
}

/// Everything the normalizer produced for one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
  pub source:     SourceSystem,
  pub file:       String,
  /// Data rows seen, excluding the header.
  pub rows_read:  u64,
  pub records:    Vec<PermitRecord>,
  pub rejections: Vec<Rejection>,
  /// Per nullable field, how many present cells were unusable and nulled.
  pub nulled:     BTreeMap<&'static str, u64>,
}

impl NormalizedBatch {
  pub(crate) fn empty(source: SourceSystem, file: &str) -> Self {
    Self {
      source,
      file: file.to_owned(),
      rows_read: 0,
      records: Vec::new(),
      rejections: Vec::new(),
      nulled: BTreeMap::new(),
    }
  }

  /// Whether the whole file was rejected for schema drift.
  pub fn is_drifted(&self) -> bool {
    self
      .rejections
      .iter()
      .any(|r| matches!(r.reason, RejectReason::SchemaDrift { .. }))
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Normalize one CSV stream from `source`. `file` labels rejections and log
/// lines.
pub fn normalize<R: Read>(
  source: SourceSystem,
  file: &str,
  reader: R,
  options: &NormalizeOptions,
) -> Result<NormalizedBatch> {
  normalize::normalize_reader(source, file, reader, options)
}

/// Open and normalize a CSV file, labelled by its path.
pub fn normalize_file(
  source: SourceSystem,
  path: &Path,
  options: &NormalizeOptions,
) -> Result<NormalizedBatch> {
  let file = File::open(path)?;
  normalize(
    source,
    &path.display().to_string(),
    BufReader::new(file),
    options,
  )
}

#[cfg(test)]
mod tests;
