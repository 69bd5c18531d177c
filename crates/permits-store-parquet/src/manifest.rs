//! The `manifest.json` written alongside every published run.

use std::collections::{BTreeMap, BTreeSet};

use permits_core::{
  catalog::{CatalogContract, Dimension},
  table::{AggregateTable, ColumnType},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{Error, Result};

/// Bumped whenever the on-disk layout of a run changes.
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
  pub name:        String,
  #[serde(rename = "type")]
  pub column_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
  /// File name relative to the run directory.
  pub file:       String,
  pub rows:       usize,
  pub sha256:     String,
  pub dimensions: Vec<Dimension>,
  pub columns:    Vec<ColumnEntry>,
}

impl TableEntry {
  pub(crate) fn new(table: &AggregateTable, file: String, bytes: &[u8]) -> Self {
    Self {
      file,
      rows: table.num_rows(),
      sha256: sha256_hex(bytes),
      dimensions: table.present_dimensions().into_iter().collect(),
      columns: table
        .columns()
        .iter()
        .map(|c| ColumnEntry {
          name:        c.name.clone(),
          column_type: c.data.column_type(),
        })
        .collect(),
    }
  }
}

/// Describes one immutable run directory. Carries no timestamps, so
/// identical catalogs produce identical manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  pub schema_version: u32,
  /// Content hash over every table's name and file hash.
  pub catalog_id:     String,
  pub tables:         BTreeMap<String, TableEntry>,
}

impl Manifest {
  pub(crate) fn new(tables: BTreeMap<String, TableEntry>) -> Self {
    let mut hasher = Sha256::new();
    for (name, entry) in &tables {
      hasher.update(name.as_bytes());
      hasher.update(b"\0");
      hasher.update(entry.sha256.as_bytes());
      hasher.update(b"\n");
    }
    Self {
      schema_version: SCHEMA_VERSION,
      catalog_id: hex::encode(hasher.finalize()),
      tables,
    }
  }

  /// The run directory name: a prefix of the catalog id.
  pub fn run_id(&self) -> &str { &self.catalog_id[..16] }

  pub(crate) fn to_json(&self) -> Result<Vec<u8>> {
    let mut json = serde_json::to_vec_pretty(self)?;
    json.push(b'\n');
    Ok(json)
  }

  pub(crate) fn from_json(bytes: &[u8]) -> Result<Self> {
    let manifest: Self = serde_json::from_slice(bytes)?;
    if manifest.schema_version != SCHEMA_VERSION {
      return Err(Error::SchemaVersion {
        found:    manifest.schema_version,
        expected: SCHEMA_VERSION,
      });
    }
    if manifest.catalog_id.len() < 16 {
      return Err(Error::ManifestMismatch(format!(
        "malformed catalog id {:?}",
        manifest.catalog_id
      )));
    }
    Ok(manifest)
  }

  /// The manifest must list exactly the contract's aggregates, each with the
  /// dimensions the contract declares.
  pub(crate) fn check(&self, contract: &CatalogContract) -> Result<()> {
    let expected: BTreeSet<&str> =
      contract.entries().iter().map(|e| e.aggregate).collect();
    let listed: BTreeSet<&str> = self.tables.keys().map(String::as_str).collect();
    if expected != listed {
      return Err(Error::ManifestMismatch(format!(
        "lists {listed:?}, contract has {expected:?}"
      )));
    }
    for (name, entry) in &self.tables {
      let declared: Vec<Dimension> =
        contract.dimensions(name)?.into_iter().collect();
      if declared != entry.dimensions {
        return Err(Error::ManifestMismatch(format!(
          "{name} carries {:?}, contract declares {declared:?}",
          entry.dimensions
        )));
      }
    }
    Ok(())
  }
}
