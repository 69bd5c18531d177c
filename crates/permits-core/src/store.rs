//! The `CatalogReader` trait and an in-memory catalog.
//!
//! The trait is implemented by publication backends (e.g.
//! `permits-store-parquet`). Consumers (`permits-query`, `permits-cli`)
//! depend on this abstraction, never on the unified dataset.

use std::collections::BTreeMap;

use crate::{Error, catalog::CatalogContract, table::AggregateTable};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read-only access to a consistent snapshot of the aggregate catalog.
pub trait CatalogReader: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The contract the snapshot was built and checked against.
  fn contract(&self) -> CatalogContract;

  /// Names of every aggregate in the snapshot, in ascending order.
  fn aggregate_names(&self) -> Vec<String>;

  /// Load one aggregate table in full.
  fn read_table(&self, aggregate: &str) -> Result<AggregateTable, Self::Error>;
}

// ─── MemoryCatalog ───────────────────────────────────────────────────────────

/// A complete catalog held in memory. This is the output of a pipeline run before
/// publication, and a convenient reader in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
  contract: CatalogContract,
  tables:   BTreeMap<String, AggregateTable>,
}

impl MemoryCatalog {
  pub fn new(
    contract: CatalogContract,
    tables: impl IntoIterator<Item = AggregateTable>,
  ) -> Self {
    Self {
      contract,
      tables: tables
        .into_iter()
        .map(|t| (t.name().to_owned(), t))
        .collect(),
    }
  }

  /// Tables in ascending name order.
  pub fn tables(&self) -> impl Iterator<Item = &AggregateTable> {
    self.tables.values()
  }

  pub fn get(&self, aggregate: &str) -> Option<&AggregateTable> {
    self.tables.get(aggregate)
  }

  pub fn len(&self) -> usize { self.tables.len() }

  pub fn is_empty(&self) -> bool { self.tables.is_empty() }
}

impl CatalogReader for MemoryCatalog {
  type Error = Error;

  fn contract(&self) -> CatalogContract { self.contract }

  fn aggregate_names(&self) -> Vec<String> {
    self.tables.keys().cloned().collect()
  }

  fn read_table(&self, aggregate: &str) -> Result<AggregateTable, Error> {
    self
      .tables
      .get(aggregate)
      .cloned()
      .ok_or_else(|| Error::UnknownAggregate(aggregate.to_owned()))
  }
}
