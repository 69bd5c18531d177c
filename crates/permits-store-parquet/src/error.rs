//! Error type for `permits-store-parquet`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] permits_core::Error),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("arrow error: {0}")]
  Arrow(#[from] arrow::error::ArrowError),

  #[error("parquet error: {0}")]
  Parquet(#[from] parquet::errors::ParquetError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// No catalog has been published under the store root yet.
  #[error("no catalog published under {0:?}")]
  NoCurrentCatalog(PathBuf),

  #[error("column {column:?} has unsupported type {data_type}")]
  UnsupportedColumnType { column: String, data_type: String },

  /// A file's content hash differs from the one its manifest recorded.
  #[error("{file:?} is corrupt: expected sha256 {expected}, found {actual}")]
  Integrity {
    file:     PathBuf,
    expected: String,
    actual:   String,
  },

  /// The manifest does not describe a catalog the current contract accepts.
  #[error("manifest does not match the catalog contract: {0}")]
  ManifestMismatch(String),

  #[error(
    "catalog was written with schema version {found}, expected {expected}"
  )]
  SchemaVersion { found: u32, expected: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
