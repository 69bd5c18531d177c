//! Row normalizer.
//!
//! Pipeline:
//!   raw CSV bytes
//!     └─ mapping::resolve()     → SourceMapping + ColumnIndex (or drift)
//!          └─ decode rows       → Vec<StringRecord>
//!               └─ normalize_row() (parallel) → PermitRecord | Rejection
//!                    └─ fold    → NormalizedBatch

use std::{collections::BTreeMap, io::Read};

use csv::StringRecord;
use permits_core::permit::{PermitRecord, SourceSystem, UnitBreakdown};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
  NormalizeOptions, NormalizedBatch, RejectReason, Rejection,
  coerce::{self, GeoBounds, Location},
  error::{Error, Result},
  mapping::{self, ColumnIndex, Field, Resolution, SourceMapping},
  vocabulary::classify_type,
};

// ─── Row-level types ─────────────────────────────────────────────────────────

struct RowContext<'a> {
  mapping: &'static SourceMapping,
  index:   &'a ColumnIndex,
  width:   usize,
  bounds:  Option<&'a GeoBounds>,
}

struct Normalized {
  record: PermitRecord,
  /// Nullable fields whose cell was present but could not be used.
  nulled: Vec<&'static str>,
}

struct Rejected {
  approval_id: Option<String>,
  reason:      RejectReason,
}

// ─── Cell helpers ────────────────────────────────────────────────────────────

fn count(
  ctx: &RowContext<'_>,
  row: &StringRecord,
  field: Field,
) -> Result<u32, RejectReason> {
  match ctx.index.get(row, field) {
    None => Ok(0),
    Some(raw) => {
      coerce::parse_count(raw).ok_or_else(|| RejectReason::InvalidNumber {
        field: field.name(),
        value: raw.to_owned(),
      })
    }
  }
}

fn nullable_date(
  ctx: &RowContext<'_>,
  row: &StringRecord,
  field: Field,
  nulled: &mut Vec<&'static str>,
) -> Option<chrono::NaiveDate> {
  let raw = ctx.index.get(row, field)?;
  let parsed = coerce::parse_date(raw);
  if parsed.is_none() {
    nulled.push(field.name());
  }
  parsed
}

// ─── Row normalizer ──────────────────────────────────────────────────────────

fn normalize_row(
  ctx: &RowContext<'_>,
  row: &StringRecord,
) -> Result<Normalized, Rejected> {
  let reject = |approval_id: Option<&str>, reason| Rejected {
    approval_id: approval_id.map(str::to_owned),
    reason,
  };

  if row.len() != ctx.width {
    return Err(reject(None, RejectReason::MalformedRow {
      expected: ctx.width,
      found:    row.len(),
    }));
  }

  let approval_id = ctx
    .index
    .get(row, Field::ApprovalId)
    .ok_or_else(|| reject(None, RejectReason::MissingField("approval_id")))?;
  let id = Some(approval_id);

  let create_date = match ctx.index.get(row, Field::CreateDate) {
    None => return Err(reject(id, RejectReason::MissingField("create_date"))),
    Some(raw) => coerce::parse_date(raw).ok_or_else(|| {
      reject(id, RejectReason::InvalidDate {
        field: "create_date",
        value: raw.to_owned(),
      })
    })?,
  };

  let units =
    |field| count(ctx, row, field).map_err(|reason| reject(id, reason));
  let du_by_income = UnitBreakdown {
    extremely_low:  units(Field::DuExtremelyLow)?,
    very_low:       units(Field::DuVeryLow)?,
    low:            units(Field::DuLow)?,
    moderate:       units(Field::DuModerate)?,
    above_moderate: units(Field::DuAboveModerate)?,
    future_demo:    units(Field::DuFutureDemo)?,
    bonus:          units(Field::DuBonus)?,
  };
  let adu_total = units(Field::AduTotal)?;
  let jadu_total = units(Field::JaduTotal)?;

  let mut nulled = Vec::new();
  let issue_date = nullable_date(ctx, row, Field::IssueDate, &mut nulled);
  let close_date = nullable_date(ctx, row, Field::CloseDate, &mut nulled);

  let valuation = ctx.index.get(row, Field::Valuation).and_then(|raw| {
    let v = coerce::parse_amount(raw);
    if v.is_none() {
      nulled.push(Field::Valuation.name());
    }
    v
  });

  let location = match coerce::parse_location(
    ctx.index.get(row, Field::Lat),
    ctx.index.get(row, Field::Lng),
    ctx.bounds,
  ) {
    Location::Valid(p) => Some(p),
    Location::Absent => None,
    Location::Rejected => {
      nulled.push("location");
      None
    }
  };

  let zip_code = if ctx.mapping.zip_from_address {
    ctx.index.get(row, Field::Address).and_then(|address| {
      let zip = coerce::extract_zip(address);
      if zip.is_none() {
        nulled.push("zip_code");
      }
      zip
    })
  } else {
    None
  };

  let approval_type = ctx
    .index
    .get(row, Field::ApprovalType)
    .unwrap_or_default()
    .to_owned();
  let approval_type_clean =
    classify_type(&approval_type, ctx.mapping.type_rules);

  Ok(Normalized {
    record: PermitRecord {
      approval_id: approval_id.to_owned(),
      source_system: ctx.mapping.source,
      create_date,
      issue_date,
      close_date,
      approval_type,
      approval_type_clean,
      bc_code: ctx.index.get(row, Field::BcCode).map(coerce::clean_code),
      bc_code_description: ctx
        .index
        .get(row, Field::BcCodeDescription)
        .map(str::to_owned),
      zip_code,
      location,
      valuation,
      du: du_by_income.total(),
      du_by_income,
      adu_total,
      jadu_total,
    },
    nulled,
  })
}

// ─── File normalizer ─────────────────────────────────────────────────────────

fn csv_error(file: &str, source: csv::Error) -> Error {
  Error::Csv {
    file: file.to_owned(),
    source,
  }
}

pub(crate) fn normalize_reader<R: Read>(
  source: SourceSystem,
  file: &str,
  reader: R,
  options: &NormalizeOptions,
) -> Result<NormalizedBatch> {
  let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
  let headers = rdr.headers().map_err(|e| csv_error(file, e))?.clone();
  let mut batch = NormalizedBatch::empty(source, file);

  let (mapping, index) = match mapping::resolve(source, &headers) {
    None => return Err(Error::NoMapping(source)),
    Some(Resolution::Fatal { missing }) => {
      return Err(Error::StructuralDrift {
        system: source,
        file: file.to_owned(),
        missing,
      });
    }
    Some(Resolution::Drifted { mapping, missing }) => {
      for record in rdr.records() {
        if let Err(e) = record
          && e.is_io_error()
        {
          return Err(csv_error(file, e));
        }
        batch.rows_read += 1;
      }
      warn!(
        %source,
        file,
        mapping_version = mapping.version,
        ?missing,
        rows = batch.rows_read,
        "schema drift; rejecting file"
      );
      batch.rejections.push(Rejection {
        source,
        file: file.to_owned(),
        line: None,
        approval_id: None,
        reason: RejectReason::SchemaDrift {
          version: mapping.version,
          missing,
        },
      });
      return Ok(batch);
    }
    Some(Resolution::Matched { mapping, index }) => (mapping, index),
  };

  // Decode sequentially; coerce in parallel.
  let mut rows: Vec<(Option<u64>, StringRecord)> = Vec::new();
  for record in rdr.records() {
    batch.rows_read += 1;
    match record {
      Ok(row) => rows.push((row.position().map(|p| p.line()), row)),
      Err(e) if e.is_io_error() => return Err(csv_error(file, e)),
      Err(e) => batch.rejections.push(Rejection {
        source,
        file: file.to_owned(),
        line: e.position().map(|p| p.line()),
        approval_id: None,
        reason: RejectReason::Undecodable(e.to_string()),
      }),
    }
  }

  let ctx = RowContext {
    mapping,
    index: &index,
    width: headers.len(),
    bounds: options.geo_bounds.as_ref(),
  };
  let outcomes: Vec<_> = rows
    .par_iter()
    .map(|(_, row)| normalize_row(&ctx, row))
    .collect();

  let mut nulled: BTreeMap<&'static str, u64> = BTreeMap::new();
  for ((line, _), outcome) in rows.iter().zip(outcomes) {
    match outcome {
      Ok(n) => {
        for field in n.nulled {
          *nulled.entry(field).or_default() += 1;
        }
        batch.records.push(n.record);
      }
      Err(r) => {
        debug!(
          %source,
          file,
          line,
          approval_id = r.approval_id.as_deref(),
          reason = %r.reason,
          "rejected row"
        );
        batch.rejections.push(Rejection {
          source,
          file: file.to_owned(),
          line: *line,
          approval_id: r.approval_id,
          reason: r.reason,
        });
      }
    }
  }
  batch.nulled = nulled;

  info!(
    %source,
    file,
    mapping_version = mapping.version,
    rows = batch.rows_read,
    normalized = batch.records.len(),
    rejected = batch.rejections.len(),
    "normalized source file"
  );
  Ok(batch)
}
