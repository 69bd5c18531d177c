//! Filtered reads of one aggregate.

use permits_core::{
  catalog::Dimension,
  filter::FilterSet,
  store::CatalogReader,
  table::{AggregateTable, Cell},
};
use tracing::debug;

use crate::error::QueryError;

/// Whether `row` of `table` satisfies every populated filter. Columns for the
/// requested dimensions are known to exist.
fn matches(table: &AggregateTable, filters: &FilterSet, row: usize) -> bool {
  let cell = |d: Dimension| {
    table
      .column(d.column())
      .map_or(Cell::Null, |c| c.data.cell(row))
  };

  if (filters.year_min.is_some() || filters.year_max.is_some())
    && !cell(Dimension::Year)
      .as_i64()
      .and_then(|y| i32::try_from(y).ok())
      .is_some_and(|y| filters.accepts_year(y))
  {
    return false;
  }
  if let Some(t) = filters.approval_type
    && cell(Dimension::ApprovalType).as_str() != Some(t.as_str())
  {
    return false;
  }
  if let Some(zip) = &filters.zip_code
    && cell(Dimension::Zip).as_str() != Some(zip.as_str())
  {
    return false;
  }
  if let Some(source) = filters.source_system
    && cell(Dimension::Source).as_str() != Some(source.as_str())
  {
    return false;
  }
  true
}

/// Read `aggregate` and keep the rows matching `filters`, in stored order.
///
/// Filters are checked against the catalog contract before anything is
/// read; a filter on a dimension the aggregate does not carry is rejected,
/// never ignored.
pub fn query<R: CatalogReader>(
  reader: &R,
  aggregate: &str,
  filters: &FilterSet,
) -> Result<AggregateTable, QueryError> {
  let contract = reader.contract();
  contract
    .check_filters(aggregate, filters)
    .map_err(QueryError::Rejected)?;

  let table = reader.read_table(aggregate).map_err(QueryError::catalog)?;
  contract.check_table(&table).map_err(QueryError::catalog)?;

  if filters.is_empty() {
    return Ok(table);
  }
  let rows: Vec<usize> = (0..table.num_rows())
    .filter(|&row| matches(&table, filters, row))
    .collect();
  debug!(
    aggregate,
    matched = rows.len(),
    total = table.num_rows(),
    "filtered aggregate"
  );
  Ok(table.select(&rows))
}
