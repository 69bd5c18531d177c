//! Error types for the permits-ingest normalizer.
//!
//! Only file-fatal and run-fatal conditions are errors. Row-level problems
//! are reported as [`crate::Rejection`]s alongside the normalised records.

use permits_core::permit::SourceSystem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A structurally required column is missing from every known mapping of
  /// the source. This aborts the run.
  #[error(
    "{system} file {file:?} lacks structurally required columns: {missing:?}"
  )]
  StructuralDrift {
    system:  SourceSystem,
    file:    String,
    missing: Vec<&'static str>,
  },

  #[error("no column mapping registered for source {0}")]
  NoMapping(SourceSystem),

  #[error("CSV error in {file:?}: {source}")]
  Csv {
    file:   String,
    #[source]
    source: csv::Error,
  },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
