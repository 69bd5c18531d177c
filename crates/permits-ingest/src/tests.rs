//! Normalizer tests over in-memory CSV exports.

use chrono::NaiveDate;
use permits_core::permit::{ApprovalType, SourceSystem};

use crate::{
  Error, NormalizeOptions, NormalizedBatch, RejectReason, normalize,
};

const LEGACY_HEADER: &str = "APPROVAL_ID,DATE_APPROVAL_CREATE,APPROVAL_TYPE,\
DATE_APPROVAL_ISSUE,JOB_BC_CODE,APPROVAL_VALUATION,APPROVAL_DU_EXTREMELY_LOW,\
APPROVAL_DU_VERY_LOW,APPROVAL_DU_LOW,APPROVAL_DU_MODERATE,\
APPROVAL_DU_ABOVE_MODERATE,DATE_APPROVAL_CLOSE,LAT_JOB,LNG_JOB";

const CURRENT_HEADER: &str = "APPROVAL_ID,DATE_APPROVAL_CREATE,APPROVAL_TYPE,\
DATE_APPROVAL_ISSUE,JOB_BC_CODE,APPROVAL_VALUATION,ADDRESS_JOB,\
APPROVAL_DU_EXTREMELY_LOW,APPROVAL_DU_VERY_LOW,APPROVAL_DU_LOW,\
APPROVAL_DU_MODERATE,APPROVAL_DU_ABOVE_MODERATE,APPROVAL_ADU_TOTAL,\
APPROVAL_JADU_TOTAL";

fn run(source: SourceSystem, header: &str, rows: &[&str]) -> NormalizedBatch {
  let mut csv = String::from(header);
  for row in rows {
    csv.push('\n');
    csv.push_str(row);
  }
  normalize(source, "test.csv", csv.as_bytes(), &NormalizeOptions::default())
    .expect("normalize")
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ─── Happy path ──────────────────────────────────────────────────────────────

#[test]
fn legacy_row_is_normalized_without_zip() {
  let batch = run(SourceSystem::Legacy, LEGACY_HEADER, &[
    "L-1,2019-03-01,Building Permit,2019-04-15,1010,\"$250,000\",0,1,2,0,3,,32.71,-117.16",
  ]);
  assert_eq!(batch.rows_read, 1);
  assert!(batch.rejections.is_empty());

  let r = &batch.records[0];
  assert_eq!(r.approval_id, "L-1");
  assert_eq!(r.source_system, SourceSystem::Legacy);
  assert_eq!(r.create_date, d(2019, 3, 1));
  assert_eq!(r.issue_date, Some(d(2019, 4, 15)));
  assert_eq!(r.close_date, None);
  assert_eq!(r.approval_type_clean, ApprovalType::BuildingPermit);
  assert_eq!(r.bc_code.as_deref(), Some("1010"));
  assert_eq!(r.valuation, Some(250_000.0));
  assert_eq!(r.du, 6);
  assert_eq!(r.du_by_income.low, 2);
  assert_eq!(r.zip_code, None);
  assert_eq!(r.adu_total, 0);
  assert!(r.location.is_some());
}

#[test]
fn current_row_takes_zip_from_address() {
  let batch = run(SourceSystem::Current, CURRENT_HEADER, &[
    "C-1,2021-06-01,Photovoltaic,2021-06-03,,,\"100 MAIN ST, SAN DIEGO, CA 92103\",0,0,0,0,0,1,1",
  ]);
  let r = &batch.records[0];
  assert_eq!(r.zip_code.as_deref(), Some("92103"));
  assert_eq!(r.approval_type_clean, ApprovalType::SolarPv);
  assert_eq!(r.adu_total, 1);
  assert_eq!(r.jadu_total, 1);
  assert_eq!(r.valuation, None);
  assert_eq!(r.bc_code, None);
  assert!(batch.nulled.is_empty());
}

#[test]
fn blank_type_is_other() {
  let batch = run(SourceSystem::Legacy, LEGACY_HEADER, &[
    "L-2,2019-03-01,,,,,,,,,,,,",
  ]);
  assert_eq!(batch.records[0].approval_type_clean, ApprovalType::Other);
  assert_eq!(batch.records[0].du, 0);
}

// ─── Rejections and nulls ────────────────────────────────────────────────────

#[test]
fn uncoercible_required_fields_reject_the_row() {
  let batch = run(SourceSystem::Legacy, LEGACY_HEADER, &[
    "L-1,yesterday,Building Permit,,,,,,,,,,,",
    "L-2,2019-03-01,Building Permit,,,,-1,,,,,,,",
    ",2019-03-01,Building Permit,,,,,,,,,,,",
    "L-4,2019-03-01,Building Permit",
    "L-5,2019-03-01,Electrical,,,,,,,,,,,",
  ]);
  assert_eq!(batch.rows_read, 5);
  assert_eq!(batch.records.len(), 1);
  assert_eq!(batch.records[0].approval_id, "L-5");

  let reasons: Vec<_> = batch.rejections.iter().map(|r| &r.reason).collect();
  assert!(matches!(
    reasons[0],
    RejectReason::InvalidDate { field: "create_date", .. }
  ));
  assert!(matches!(
    reasons[1],
    RejectReason::InvalidNumber { field: "du_extremely_low", .. }
  ));
  assert_eq!(reasons[2], &RejectReason::MissingField("approval_id"));
  assert_eq!(reasons[3], &RejectReason::MalformedRow {
    expected: 14,
    found:    3,
  });

  assert_eq!(batch.rejections[0].approval_id.as_deref(), Some("L-1"));
  assert_eq!(batch.rejections[0].line, Some(2));
  assert_eq!(batch.rejections[2].approval_id, None);
}

#[test]
fn unusable_nullable_fields_are_nulled_and_counted() {
  let batch = run(SourceSystem::Legacy, LEGACY_HEADER, &[
    "L-1,2019-03-01,Sign Permit,soon,,n/a,,,,,,,40.7,-74.0",
    "L-2,2019-03-01,Sign Permit,soon,,,,,,,,,,",
  ]);
  assert!(batch.rejections.is_empty());
  assert_eq!(batch.records.len(), 2);
  assert_eq!(batch.records[0].issue_date, None);
  assert_eq!(batch.records[0].valuation, None);
  assert_eq!(batch.records[0].location, None);

  assert_eq!(batch.nulled.get("issue_date"), Some(&2));
  assert_eq!(batch.nulled.get("valuation"), Some(&1));
  assert_eq!(batch.nulled.get("location"), Some(&1));
}

#[test]
fn address_without_zip_is_counted() {
  let batch = run(SourceSystem::Current, CURRENT_HEADER, &[
    "C-1,2021-06-01,Fire,,,,UNKNOWN LOCATION,,,,,,,",
  ]);
  assert_eq!(batch.records[0].zip_code, None);
  assert_eq!(batch.nulled.get("zip_code"), Some(&1));
}

// ─── Schema drift ────────────────────────────────────────────────────────────

#[test]
fn missing_expected_column_rejects_the_file() {
  let header = LEGACY_HEADER.replace("JOB_BC_CODE,", "");
  let batch = run(SourceSystem::Legacy, &header, &[
    "L-1,2019-03-01,Building Permit,,,0,0,0,0,0,,,",
    "L-2,2019-03-01,Building Permit,,,0,0,0,0,0,,,",
  ]);
  assert!(batch.is_drifted());
  assert!(batch.records.is_empty());
  assert_eq!(batch.rows_read, 2);
  assert_eq!(batch.rejections.len(), 1);
  assert_eq!(batch.rejections[0].line, None);
  assert_eq!(batch.rejections[0].reason, RejectReason::SchemaDrift {
    version: 1,
    missing: vec!["JOB_BC_CODE"],
  });
}

#[test]
fn missing_structural_column_is_fatal() {
  let header = LEGACY_HEADER.replace("APPROVAL_TYPE,", "");
  let err = normalize(
    SourceSystem::Legacy,
    "bad.csv",
    header.as_bytes(),
    &NormalizeOptions::default(),
  )
  .unwrap_err();
  match err {
    Error::StructuralDrift { system, file, missing } => {
      assert_eq!(system, SourceSystem::Legacy);
      assert_eq!(file, "bad.csv");
      assert_eq!(missing, vec!["APPROVAL_TYPE"]);
    }
    other => panic!("expected structural drift, got {other:?}"),
  }
}

#[test]
fn current_export_is_drift_for_legacy_adu_columns() {
  // A legacy-shaped export handed in as current lacks the address and ADU
  // columns.
  let batch = run(SourceSystem::Current, LEGACY_HEADER, &[]);
  assert!(batch.is_drifted());
}
