//! Declarative aggregate definitions.
//!
//! An [`AggregateSpec`] names its group keys, row filters, measures, row
//! order and the filter dimensions it claims to support. One generic rollup
//! evaluates every spec.

use permits_core::{
  catalog::{Dimension, DimensionSet},
  permit::ClassifiedPermit,
  table::ColumnType,
};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// A group-by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
  Year,
  Month,
  ApprovalType,
  Zip,
  Source,
  BcCode,
  BcCodeDescription,
  /// Latitude rounded to a 0.001° cell.
  Lat,
  /// Longitude rounded to a 0.001° cell.
  Lng,
}

/// Map cells are keyed in thousandths of a degree.
const CELL_SCALE: f64 = 1000.0;

impl Key {
  pub fn column(self) -> &'static str {
    match self {
      Self::Year => "year",
      Self::Month => "month",
      Self::ApprovalType => "approval_type_clean",
      Self::Zip => "zip_code",
      Self::Source => "source_system",
      Self::BcCode => "bc_code",
      Self::BcCodeDescription => "bc_code_description",
      Self::Lat => "lat",
      Self::Lng => "lng",
    }
  }

  pub fn column_type(self) -> ColumnType {
    match self {
      Self::Year | Self::Month => ColumnType::Int64,
      Self::Lat | Self::Lng => ColumnType::Float64,
      _ => ColumnType::Utf8,
    }
  }

  /// The filter dimension carried by this key, if any.
  pub fn dimension(self) -> Option<Dimension> {
    Dimension::from_column(self.column())
  }

  pub(crate) fn value(self, p: &ClassifiedPermit) -> KeyValue<'_> {
    let r = &p.record;
    match self {
      Self::Year => KeyValue::Int(Some(i64::from(p.derived.approval_year))),
      Self::Month => KeyValue::Int(Some(i64::from(p.derived.approval_month))),
      Self::ApprovalType => {
        KeyValue::Text(Some(r.approval_type_clean.as_str()))
      }
      Self::Zip => KeyValue::Text(r.zip_code.as_deref()),
      Self::Source => KeyValue::Text(Some(r.source_system.as_str())),
      Self::BcCode => KeyValue::Text(r.bc_code.as_deref()),
      Self::BcCodeDescription => KeyValue::Text(r.bc_code_description.as_deref()),
      Self::Lat => KeyValue::Cell(r.location.map(|l| to_cell(l.lat))),
      Self::Lng => KeyValue::Cell(r.location.map(|l| to_cell(l.lng))),
    }
  }
}

fn to_cell(degrees: f64) -> i64 { (degrees * CELL_SCALE).round() as i64 }

/// One key of one group. Nulls order before every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum KeyValue<'a> {
  Int(Option<i64>),
  Text(Option<&'a str>),
  Cell(Option<i64>),
}

impl KeyValue<'_> {
  pub(crate) fn as_i64(self) -> Option<i64> {
    match self {
      Self::Int(v) => v,
      _ => None,
    }
  }

  pub(crate) fn as_text(self) -> Option<String> {
    match self {
      Self::Text(v) => v.map(str::to_owned),
      _ => None,
    }
  }

  pub(crate) fn as_degrees(self) -> Option<f64> {
    match self {
      Self::Cell(v) => v.map(|c| c as f64 / CELL_SCALE),
      _ => None,
    }
  }
}

// ─── Row filters ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
  IsHousing,
  IsSolar,
  HasApprovalDays,
  HasZip,
  HasLocation,
  HasBcCode,
}

impl RowFilter {
  pub fn accepts(self, p: &ClassifiedPermit) -> bool {
    match self {
      Self::IsHousing => p.derived.is_housing,
      Self::IsSolar => p.derived.is_solar,
      Self::HasApprovalDays => p.derived.approval_days.is_some(),
      Self::HasZip => p.record.zip_code.is_some(),
      Self::HasLocation => p.record.location.is_some(),
      Self::HasBcCode => p.record.bc_code.is_some(),
    }
  }
}

// ─── Measures ────────────────────────────────────────────────────────────────

/// Unit counters that can be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
  ExtremelyLow,
  VeryLow,
  Low,
  Moderate,
  AboveModerate,
  Adu,
  Jadu,
  Total,
}

impl Units {
  pub(crate) fn of(self, p: &ClassifiedPermit) -> u64 {
    let b = &p.record.du_by_income;
    match self {
      Self::ExtremelyLow => b.extremely_low.into(),
      Self::VeryLow => b.very_low.into(),
      Self::Low => b.low.into(),
      Self::Moderate => b.moderate.into(),
      Self::AboveModerate => b.above_moderate.into(),
      Self::Adu => p.record.adu_total.into(),
      Self::Jadu => p.record.jadu_total.into(),
      Self::Total => p.derived.total_du,
    }
  }
}

/// An Int64 measure computed from one group's rows alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupMeasure {
  /// Rows in the group.
  Count,
  /// Rows in the group passing a filter.
  CountWhere(RowFilter),
  SumUnits(Units),
  /// Sum of valuations, nulls as zero, rounded to whole dollars.
  SumValuation,
  /// Mean of present valuations, rounded; null when none are present.
  AvgValuation,
  /// Rows with an approval duration.
  CountWithDays,
  /// Sum of approval durations; null when none are present.
  SumDays,
  /// Mean approval duration, rounded.
  AvgDays,
  /// Approval-duration quantile (interpolated), rounded.
  QuantileDays(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureKind {
  Group(GroupMeasure),
  /// Median approval duration (interpolated).
  MedianDays,
  /// Running row count over groups in key order, restarted for every value
  /// of the partition key.
  RunningCount { partition: Key },
}

impl MeasureKind {
  pub fn column_type(self) -> ColumnType {
    match self {
      Self::MedianDays => ColumnType::Float64,
      Self::Group(_) | Self::RunningCount { .. } => ColumnType::Int64,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measure {
  pub column: &'static str,
  pub kind:   MeasureKind,
}

pub(crate) const fn measure(column: &'static str, kind: MeasureKind) -> Measure {
  Measure { column, kind }
}

pub(crate) const fn per_group(column: &'static str, kind: GroupMeasure) -> Measure {
  measure(column, MeasureKind::Group(kind))
}

// ─── Spec ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
  /// Ascending by the group keys.
  Keys,
  /// Descending by row count; ties ascending by the group keys.
  CountDesc,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregateSpec {
  pub name:       &'static str,
  pub keys:       &'static [Key],
  pub filters:    &'static [RowFilter],
  pub measures:   &'static [Measure],
  pub order:      Order,
  /// The filter dimensions this aggregate is declared to support.
  pub dimensions: &'static [Dimension],
}

impl AggregateSpec {
  pub fn declared_dimensions(&self) -> DimensionSet {
    self.dimensions.iter().copied().collect()
  }

  pub fn accepts(&self, p: &ClassifiedPermit) -> bool {
    self.filters.iter().all(|f| f.accepts(p))
  }

  /// Position of `key` among the group keys.
  pub(crate) fn key_index(&self, key: Key) -> Option<usize> {
    self.keys.iter().position(|k| *k == key)
  }
}
