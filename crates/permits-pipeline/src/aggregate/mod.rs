//! Aggregator: evaluates every [`AggregateSpec`] over the unified dataset
//! and checks the result against the catalog contract.

mod definitions;
pub mod spec;
pub mod stats;

use std::collections::BTreeMap;

pub use definitions::SPECS;
use permits_core::{
  catalog::CatalogContract,
  permit::ClassifiedPermit,
  store::MemoryCatalog,
  table::{AggregateTable, Column, ColumnData, ColumnType},
};
use rayon::prelude::*;
use spec::{AggregateSpec, GroupMeasure, Key, KeyValue, Measure, MeasureKind, Order};
use tracing::debug;

use crate::{
  error::{Error, Result},
  unified::UnifiedDataset,
};

type Group<'a> = (Vec<KeyValue<'a>>, Vec<&'a ClassifiedPermit>);

// ─── Grouping ────────────────────────────────────────────────────────────────

fn group<'a>(
  spec: &AggregateSpec,
  permits: &'a [ClassifiedPermit],
) -> Vec<Group<'a>> {
  let mut groups: BTreeMap<Vec<KeyValue<'a>>, Vec<&'a ClassifiedPermit>> =
    BTreeMap::new();
  for p in permits.iter().filter(|p| spec.accepts(p)) {
    let key = spec.keys.iter().map(|k| k.value(p)).collect();
    groups.entry(key).or_default().push(p);
  }
  groups.into_iter().collect()
}

fn key_column(key: Key, index: usize, groups: &[Group<'_>]) -> Column {
  let values = groups.iter().map(|(k, _)| k[index]);
  let data = match key.column_type() {
    ColumnType::Int64 => ColumnData::Int64(values.map(KeyValue::as_i64).collect()),
    ColumnType::Utf8 => ColumnData::Utf8(values.map(KeyValue::as_text).collect()),
    ColumnType::Float64 => {
      ColumnData::Float64(values.map(KeyValue::as_degrees).collect())
    }
  };
  Column::new(key.column(), data)
}

// ─── Measures ────────────────────────────────────────────────────────────────

fn sorted_days(members: &[&ClassifiedPermit]) -> Vec<f64> {
  let mut days: Vec<f64> = members
    .iter()
    .filter_map(|p| p.derived.approval_days)
    .map(f64::from)
    .collect();
  days.sort_by(f64::total_cmp);
  days
}

fn count(n: usize) -> Option<i64> { i64::try_from(n).ok() }

fn measure_value(kind: GroupMeasure, members: &[&ClassifiedPermit]) -> Option<i64> {
  match kind {
    GroupMeasure::Count => count(members.len()),
    GroupMeasure::CountWhere(filter) => {
      count(members.iter().filter(|p| filter.accepts(p)).count())
    }
    GroupMeasure::SumUnits(units) => {
      i64::try_from(members.iter().map(|p| units.of(p)).sum::<u64>()).ok()
    }
    GroupMeasure::SumValuation => Some(
      members
        .iter()
        .map(|p| p.record.valuation.unwrap_or(0.0))
        .sum::<f64>()
        .round() as i64,
    ),
    GroupMeasure::AvgValuation => {
      let present: Vec<f64> =
        members.iter().filter_map(|p| p.record.valuation).collect();
      stats::mean(&present).map(|v| v.round() as i64)
    }
    GroupMeasure::CountWithDays => count(
      members
        .iter()
        .filter(|p| p.derived.approval_days.is_some())
        .count(),
    ),
    GroupMeasure::SumDays => {
      let mut days = members.iter().filter_map(|p| p.derived.approval_days);
      days
        .next()
        .map(|first| days.fold(i64::from(first), |acc, d| acc + i64::from(d)))
    }
    GroupMeasure::AvgDays => {
      stats::mean(&sorted_days(members)).map(|v| v.round() as i64)
    }
    GroupMeasure::QuantileDays(q) => {
      stats::quantile(&sorted_days(members), q).map(|v| v.round() as i64)
    }
  }
}

fn measure_column(
  spec: &AggregateSpec,
  measure: &Measure,
  groups: &[Group<'_>],
) -> Column {
  let data = match measure.kind {
    MeasureKind::MedianDays => ColumnData::Float64(
      groups
        .iter()
        .map(|(_, members)| stats::median(&sorted_days(members)))
        .collect(),
    ),
    MeasureKind::RunningCount { partition } => {
      let index = spec.key_index(partition);
      let mut running: BTreeMap<Option<KeyValue<'_>>, i64> = BTreeMap::new();
      ColumnData::Int64(
        groups
          .iter()
          .map(|(keys, members)| {
            let total =
              running.entry(index.map(|i| keys[i])).or_default();
            *total += count(members.len()).unwrap_or(i64::MAX);
            Some(*total)
          })
          .collect(),
      )
    }
    MeasureKind::Group(kind) => ColumnData::Int64(
      groups
        .iter()
        .map(|(_, members)| measure_value(kind, members))
        .collect(),
    ),
  };
  Column::new(measure.column, data)
}

// ─── Rollup ──────────────────────────────────────────────────────────────────

/// Evaluate one spec. Groups are laid out in ascending key order (running
/// measures accumulate in that order) and then reordered if the spec asks
/// for it.
pub(crate) fn rollup(
  spec: &AggregateSpec,
  permits: &[ClassifiedPermit],
) -> Result<AggregateTable> {
  let groups = group(spec, permits);

  let mut columns: Vec<Column> = spec
    .keys
    .iter()
    .enumerate()
    .map(|(i, key)| key_column(*key, i, &groups))
    .collect();
  columns.extend(spec.measures.iter().map(|m| measure_column(spec, m, &groups)));
  let table = AggregateTable::new(spec.name, columns)?;

  Ok(match spec.order {
    Order::Keys => table,
    Order::CountDesc => {
      let mut rows: Vec<usize> = (0..groups.len()).collect();
      // Stable: equal counts keep ascending key order.
      rows.sort_by(|a, b| groups[*b].1.len().cmp(&groups[*a].1.len()));
      table.select(&rows)
    }
  })
}

/// Build-time contract check for one spec and the table it produced.
fn check_spec(
  contract: &CatalogContract,
  spec: &AggregateSpec,
  table: &AggregateTable,
) -> Result<()> {
  let declared = spec.declared_dimensions();
  let advertised = contract.dimensions(spec.name)?;
  if declared != advertised {
    return Err(Error::SpecMismatch {
      aggregate: spec.name.to_owned(),
      declared:  declared.into_iter().collect(),
      contract:  advertised.into_iter().collect(),
    });
  }
  contract.check_table(table)?;
  Ok(())
}

/// Evaluate `specs` in parallel and check the result as a whole.
pub(crate) fn build_catalog_with(
  contract: CatalogContract,
  specs: &[AggregateSpec],
  dataset: &UnifiedDataset,
) -> Result<MemoryCatalog> {
  let tables = specs
    .par_iter()
    .map(|spec| -> Result<AggregateTable> {
      let table = rollup(spec, dataset.permits())?;
      check_spec(&contract, spec, &table)?;
      debug!(aggregate = spec.name, rows = table.num_rows(), "built aggregate");
      Ok(table)
    })
    .collect::<Result<Vec<_>>>()?;

  contract.check_catalog(&tables)?;
  Ok(MemoryCatalog::new(contract, tables))
}

/// Build the published catalog from the unified dataset.
pub(crate) fn build_catalog(dataset: &UnifiedDataset) -> Result<MemoryCatalog> {
  build_catalog_with(CatalogContract::published(), SPECS, dataset)
}
