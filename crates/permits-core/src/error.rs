//! Error types for `permits-core`.

use thiserror::Error;

use crate::catalog::Dimension;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown aggregate: {0:?}")]
  UnknownAggregate(String),

  #[error("aggregate {aggregate:?} does not support filtering by {dimension}")]
  UnsupportedDimension {
    aggregate: String,
    dimension: Dimension,
  },

  #[error(
    "aggregate {aggregate:?} declares dimensions {declared:?} but carries \
     {present:?}"
  )]
  CatalogMismatch {
    aggregate: String,
    declared:  Vec<Dimension>,
    present:   Vec<Dimension>,
  },

  #[error("aggregate {0:?} is in the contract but was not built")]
  MissingAggregate(String),

  #[error("aggregate {0:?} was built more than once")]
  DuplicateAggregate(String),

  #[error(
    "column {column:?} of {table:?} has {actual} rows, expected {expected}"
  )]
  ColumnLength {
    table:    String,
    column:   String,
    expected: usize,
    actual:   usize,
  },

  #[error("column {column:?} appears twice in {table:?}")]
  DuplicateColumn { table: String, column: String },

  #[error("invalid year range: {min} > {max}")]
  InvalidYearRange { min: i32, max: i32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
