//! Columnar aggregate tables.
//!
//! Aggregates are small, schema-frozen and read whole, so they are held as a
//! list of named, typed, nullable columns of equal length.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  catalog::{Dimension, DimensionSet},
};

// ─── Column model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Utf8,
  Int64,
  Float64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
  Utf8(Vec<Option<String>>),
  Int64(Vec<Option<i64>>),
  Float64(Vec<Option<f64>>),
}

/// A borrowed cell value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
  Null,
  Utf8(&'a str),
  Int64(i64),
  Float64(f64),
}

impl<'a> Cell<'a> {
  pub fn to_json(self) -> Value {
    match self {
      Cell::Null => Value::Null,
      Cell::Utf8(s) => Value::String(s.to_owned()),
      Cell::Int64(n) => Value::from(n),
      Cell::Float64(f) => serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null),
    }
  }

  pub fn as_str(self) -> Option<&'a str> {
    match self {
      Cell::Utf8(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_i64(self) -> Option<i64> {
    match self {
      Cell::Int64(n) => Some(n),
      _ => None,
    }
  }
}

impl ColumnData {
  pub fn len(&self) -> usize {
    match self {
      Self::Utf8(v) => v.len(),
      Self::Int64(v) => v.len(),
      Self::Float64(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn column_type(&self) -> ColumnType {
    match self {
      Self::Utf8(_) => ColumnType::Utf8,
      Self::Int64(_) => ColumnType::Int64,
      Self::Float64(_) => ColumnType::Float64,
    }
  }

  /// The cell at `row`. Panics if `row` is out of bounds.
  pub fn cell(&self, row: usize) -> Cell<'_> {
    match self {
      Self::Utf8(v) => v[row].as_deref().map_or(Cell::Null, Cell::Utf8),
      Self::Int64(v) => v[row].map_or(Cell::Null, Cell::Int64),
      Self::Float64(v) => v[row].map_or(Cell::Null, Cell::Float64),
    }
  }

  fn take(&self, rows: &[usize]) -> Self {
    match self {
      Self::Utf8(v) => Self::Utf8(rows.iter().map(|&r| v[r].clone()).collect()),
      Self::Int64(v) => Self::Int64(rows.iter().map(|&r| v[r]).collect()),
      Self::Float64(v) => Self::Float64(rows.iter().map(|&r| v[r]).collect()),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
  pub name: String,
  pub data: ColumnData,
}

impl Column {
  pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
    Self {
      name: name.into(),
      data,
    }
  }
}

// ─── AggregateTable ──────────────────────────────────────────────────────────

/// A named rollup with a frozen column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
  name:    String,
  columns: Vec<Column>,
  rows:    usize,
}

impl AggregateTable {
  /// Build a table, checking that column names are unique and every column
  /// has the same length.
  pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
    let name = name.into();
    let rows = columns.first().map_or(0, |c| c.data.len());
    for (i, column) in columns.iter().enumerate() {
      if column.data.len() != rows {
        return Err(Error::ColumnLength {
          table:    name,
          column:   column.name.clone(),
          expected: rows,
          actual:   column.data.len(),
        });
      }
      if columns[..i].iter().any(|c| c.name == column.name) {
        return Err(Error::DuplicateColumn {
          table:  name,
          column: column.name.clone(),
        });
      }
    }
    Ok(Self {
      name,
      columns,
      rows,
    })
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn columns(&self) -> &[Column] { &self.columns }

  pub fn num_rows(&self) -> usize { self.rows }

  pub fn column(&self, name: &str) -> Option<&Column> {
    self.columns.iter().find(|c| c.name == name)
  }

  /// The filter dimensions this table actually carries, judged by its
  /// column names.
  pub fn present_dimensions(&self) -> DimensionSet {
    self
      .columns
      .iter()
      .filter_map(|c| Dimension::from_column(&c.name))
      .collect()
  }

  /// A new table containing only `rows`, in the given order.
  pub fn select(&self, rows: &[usize]) -> Self {
    Self {
      name:    self.name.clone(),
      columns: self
        .columns
        .iter()
        .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
        .collect(),
      rows:    rows.len(),
    }
  }

  pub fn row_json(&self, row: usize) -> Map<String, Value> {
    self
      .columns
      .iter()
      .map(|c| (c.name.clone(), c.data.cell(row).to_json()))
      .collect()
  }

  pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
    (0..self.rows).map(|r| self.row_json(r)).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> AggregateTable {
    AggregateTable::new(
      "sample",
      vec![
        Column::new("year", ColumnData::Int64(vec![Some(2020), Some(2021)])),
        Column::new(
          "zip_code",
          ColumnData::Utf8(vec![Some("92101".into()), None]),
        ),
        Column::new("median_days", ColumnData::Float64(vec![Some(3.5), None])),
      ],
    )
    .unwrap()
  }

  #[test]
  fn rejects_ragged_columns() {
    let err = AggregateTable::new(
      "t",
      vec![
        Column::new("a", ColumnData::Int64(vec![Some(1)])),
        Column::new("b", ColumnData::Int64(vec![])),
      ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::ColumnLength { .. }));
  }

  #[test]
  fn rejects_duplicate_columns() {
    let err = AggregateTable::new(
      "t",
      vec![
        Column::new("a", ColumnData::Int64(vec![])),
        Column::new("a", ColumnData::Utf8(vec![])),
      ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateColumn { .. }));
  }

  #[test]
  fn present_dimensions_follow_column_names() {
    let dims = sample().present_dimensions();
    assert_eq!(
      dims.into_iter().collect::<Vec<_>>(),
      vec![Dimension::Year, Dimension::Zip]
    );
  }

  #[test]
  fn select_and_json() {
    let t = sample().select(&[1]);
    assert_eq!(t.num_rows(), 1);
    let row = t.row_json(0);
    assert_eq!(row["year"], Value::from(2021));
    assert_eq!(row["zip_code"], Value::Null);
    assert_eq!(row["median_days"], Value::Null);
  }
}
