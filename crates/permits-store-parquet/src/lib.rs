//! Parquet publication backend for the aggregate catalog.
//!
//! [`ParquetCatalogStore::publish`] writes a checked catalog as one
//! ZSTD-compressed Parquet file per aggregate plus a `manifest.json`, and
//! switches the `CURRENT` pointer only once the run is complete.
//! [`PublishedCatalog`] implements [`permits_core::store::CatalogReader`]
//! over a published run.

mod encode;
mod store;

pub mod error;
pub mod manifest;

pub use error::{Error, Result};
pub use manifest::{Manifest, SCHEMA_VERSION};
pub use store::{ParquetCatalogStore, PublishedCatalog, Publication};

#[cfg(test)]
mod tests;
