//! Error types for a pipeline run. Every variant is run-fatal: the run stops
//! before anything is published.

use permits_core::catalog::Dimension;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Ingest(#[from] permits_ingest::Error),

  #[error("catalog check failed: {0}")]
  Catalog(#[from] permits_core::Error),

  /// An aggregate spec declares different dimensions than the contract
  /// advertises for it.
  #[error(
    "aggregate {aggregate:?} is declared with dimensions {declared:?} but \
     the contract lists {contract:?}"
  )]
  SpecMismatch {
    aggregate: String,
    declared:  Vec<Dimension>,
    contract:  Vec<Dimension>,
  },

  #[error("no input files configured")]
  NoInputs,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
