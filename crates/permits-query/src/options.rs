//! What a consumer can filter on, and what the catalog holds.

use std::collections::BTreeSet;

use permits_core::{
  catalog::{Dimension, names},
  store::CatalogReader,
};
use serde::Serialize;

use crate::error::QueryError;

/// Distinct filter values present in the published catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
  pub years:          Vec<i64>,
  pub approval_types: Vec<String>,
  pub zip_codes:      Vec<String>,
  pub sources:        Vec<String>,
}

/// Collect the distinct years, permit types, zip codes and sources from
/// `permit_summary`, which carries every dimension.
pub fn filter_options<R: CatalogReader>(
  reader: &R,
) -> Result<FilterOptions, QueryError> {
  let table = reader
    .read_table(names::PERMIT_SUMMARY)
    .map_err(QueryError::catalog)?;

  let text = |d: Dimension| -> Vec<String> {
    let Some(column) = table.column(d.column()) else {
      return Vec::new();
    };
    (0..table.num_rows())
      .filter_map(|r| column.data.cell(r).as_str())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .map(str::to_owned)
      .collect()
  };
  let years = table.column(Dimension::Year.column()).map_or_else(
    Vec::new,
    |column| {
      (0..table.num_rows())
        .filter_map(|r| column.data.cell(r).as_i64())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
    },
  );

  Ok(FilterOptions {
    years,
    approval_types: text(Dimension::ApprovalType),
    zip_codes: text(Dimension::Zip),
    sources: text(Dimension::Source),
  })
}

/// One aggregate as listed by [`describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateInfo {
  pub name:       String,
  pub dimensions: Vec<Dimension>,
  pub rows:       usize,
  pub columns:    Vec<String>,
}

/// List every aggregate in the catalog with its supported dimensions.
pub fn describe<R: CatalogReader>(
  reader: &R,
) -> Result<Vec<AggregateInfo>, QueryError> {
  let contract = reader.contract();
  reader
    .aggregate_names()
    .into_iter()
    .map(|name| {
      let table = reader.read_table(&name).map_err(QueryError::catalog)?;
      let dimensions = contract
        .dimensions(&name)
        .map_err(QueryError::catalog)?
        .into_iter()
        .collect();
      Ok(AggregateInfo {
        dimensions,
        rows: table.num_rows(),
        columns: table.columns().iter().map(|c| c.name.clone()).collect(),
        name,
      })
    })
    .collect()
}
