//! Query error type.

use thiserror::Error;

/// An error returned to a consumer of the published catalog.
#[derive(Debug, Error)]
pub enum QueryError {
  /// The request breaks the catalog contract: an unknown aggregate, a filter
  /// on a dimension the aggregate does not carry, or an empty year range.
  #[error("rejected query: {0}")]
  Rejected(#[source] permits_core::Error),

  #[error("catalog error: {0}")]
  Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl QueryError {
  pub(crate) fn catalog(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Catalog(Box::new(e))
  }
}
