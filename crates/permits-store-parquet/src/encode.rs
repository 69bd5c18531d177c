//! Conversion between [`AggregateTable`]s and single-batch Parquet files.
//!
//! Every table is written as one Arrow record batch, ZSTD-compressed, with
//! nullable columns. The writer is given no timestamps or host data so the
//! same table always encodes to the same bytes.

use std::{io::Cursor, sync::Arc};

use arrow::{
  array::{Array as _, ArrayRef, Float64Array, Int64Array, StringArray},
  datatypes::{DataType, Field, Schema},
  record_batch::RecordBatch,
};
use bytes::Bytes;
use parquet::{
  arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder},
  basic::{Compression, ZstdLevel},
  file::properties::WriterProperties,
  format::KeyValue,
};
use permits_core::table::{AggregateTable, Column, ColumnData, ColumnType};

use crate::{Error, Result};

/// Key-value metadata entry naming the aggregate a file holds.
pub(crate) const AGGREGATE_KEY: &str = "permits.aggregate";

// ─── Schema ──────────────────────────────────────────────────────────────────

fn data_type(column_type: ColumnType) -> DataType {
  match column_type {
    ColumnType::Utf8 => DataType::Utf8,
    ColumnType::Int64 => DataType::Int64,
    ColumnType::Float64 => DataType::Float64,
  }
}

fn schema(table: &AggregateTable) -> Arc<Schema> {
  let fields: Vec<Field> = table
    .columns()
    .iter()
    .map(|c| Field::new(&c.name, data_type(c.data.column_type()), true))
    .collect();
  Arc::new(Schema::new(fields))
}

fn array(data: &ColumnData) -> ArrayRef {
  match data {
    ColumnData::Utf8(v) => Arc::new(
      v.iter().map(|s| s.as_deref()).collect::<StringArray>(),
    ),
    ColumnData::Int64(v) => Arc::new(Int64Array::from(v.clone())),
    ColumnData::Float64(v) => Arc::new(Float64Array::from(v.clone())),
  }
}

// ─── Write ───────────────────────────────────────────────────────────────────

fn writer_properties(aggregate: &str) -> WriterProperties {
  let aggregate = KeyValue {
    key:   AGGREGATE_KEY.to_owned(),
    value: Some(aggregate.to_owned()),
  };
  WriterProperties::builder()
    .set_compression(Compression::ZSTD(ZstdLevel::default()))
    .set_key_value_metadata(Some(vec![aggregate]))
    .build()
}

/// Encode a table as a Parquet file held in memory.
pub(crate) fn write_table(table: &AggregateTable) -> Result<Bytes> {
  let schema = schema(table);
  let columns = table.columns().iter().map(|c| array(&c.data)).collect();
  let batch = RecordBatch::try_new(schema.clone(), columns)?;

  let mut cursor = Cursor::new(Vec::<u8>::new());
  let props = writer_properties(table.name());
  let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(props))?;
  if batch.num_rows() > 0 {
    writer.write(&batch)?;
  }
  writer.close()?;
  Ok(Bytes::from(cursor.into_inner()))
}

// ─── Read ────────────────────────────────────────────────────────────────────

fn unsupported(field: &Field) -> Error {
  Error::UnsupportedColumnType {
    column:    field.name().clone(),
    data_type: field.data_type().to_string(),
  }
}

/// Append the values of `array` to `data`, which was created for `field`.
fn extend(data: &mut ColumnData, field: &Field, array: &ArrayRef) -> Result<()> {
  let any = array.as_any();
  match data {
    ColumnData::Utf8(v) => {
      let a = any
        .downcast_ref::<StringArray>()
        .ok_or_else(|| unsupported(field))?;
      v.extend(a.iter().map(|s| s.map(str::to_owned)));
    }
    ColumnData::Int64(v) => {
      let a = any
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| unsupported(field))?;
      v.extend(a.iter());
    }
    ColumnData::Float64(v) => {
      let a = any
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| unsupported(field))?;
      v.extend(a.iter());
    }
  }
  Ok(())
}

/// Decode a Parquet file written by [`write_table`] back into a table named
/// `name`. Zero-row files decode to empty columns.
pub(crate) fn read_table(name: &str, bytes: Bytes) -> Result<AggregateTable> {
  let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
  let schema = builder.schema().clone();

  let mut data = schema
    .fields()
    .iter()
    .map(|field| {
      Ok(match field.data_type() {
        DataType::Utf8 => ColumnData::Utf8(Vec::new()),
        DataType::Int64 => ColumnData::Int64(Vec::new()),
        DataType::Float64 => ColumnData::Float64(Vec::new()),
        _ => return Err(unsupported(field)),
      })
    })
    .collect::<Result<Vec<_>>>()?;

  for batch in builder.build()? {
    let batch = batch?;
    for (i, field) in schema.fields().iter().enumerate() {
      extend(&mut data[i], field, batch.column(i))?;
    }
  }

  let columns = schema
    .fields()
    .iter()
    .zip(data)
    .map(|(field, data)| Column::new(field.name().clone(), data))
    .collect();
  Ok(AggregateTable::new(name, columns)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table() -> AggregateTable {
    AggregateTable::new(
      "t",
      vec![
        Column::new(
          "zip_code",
          ColumnData::Utf8(vec![Some("92101".into()), None]),
        ),
        Column::new("year", ColumnData::Int64(vec![Some(2020), None])),
        Column::new("median_days", ColumnData::Float64(vec![None, Some(2.5)])),
      ],
    )
    .unwrap()
  }

  #[test]
  fn decodes_what_it_encodes_with_nulls() {
    let bytes = write_table(&table()).unwrap();
    assert_eq!(read_table("t", bytes).unwrap(), table());
  }

  #[test]
  fn zero_row_table_keeps_its_columns() {
    let empty = table().select(&[]);
    let back = read_table("t", write_table(&empty).unwrap()).unwrap();
    assert_eq!(back.num_rows(), 0);
    assert_eq!(back.columns().len(), 3);
    assert_eq!(
      back.column("median_days").unwrap().data.column_type(),
      ColumnType::Float64
    );
  }

  #[test]
  fn encoding_is_deterministic() {
    assert_eq!(write_table(&table()).unwrap(), write_table(&table()).unwrap());
  }

  #[test]
  fn files_carry_the_aggregate_name() {
    let bytes = write_table(&table()).unwrap();
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).unwrap();
    let kv = builder
      .metadata()
      .file_metadata()
      .key_value_metadata()
      .unwrap();
    assert!(
      kv.iter()
        .any(|e| e.key == AGGREGATE_KEY && e.value.as_deref() == Some("t"))
    );
  }
}
