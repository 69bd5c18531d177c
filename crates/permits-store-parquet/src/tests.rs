//! Publication tests against temporary directories.

use std::fs;

use permits_core::{
  catalog::{CatalogContract, names},
  permit::SourceSystem,
  store::{CatalogReader as _, MemoryCatalog},
};
use permits_ingest::{NormalizeOptions, normalize};
use permits_pipeline::{Pipeline, PipelineConfig};
use tempfile::TempDir;

use crate::{Error, ParquetCatalogStore, PublishedCatalog};

const HEADER: &str = "APPROVAL_ID,DATE_APPROVAL_CREATE,APPROVAL_TYPE,\
DATE_APPROVAL_ISSUE,JOB_BC_CODE,APPROVAL_VALUATION,ADDRESS_JOB,\
APPROVAL_DU_EXTREMELY_LOW,APPROVAL_DU_VERY_LOW,APPROVAL_DU_LOW,\
APPROVAL_DU_MODERATE,APPROVAL_DU_ABOVE_MODERATE,APPROVAL_ADU_TOTAL,\
APPROVAL_JADU_TOTAL";

const BUILDING: &str = "C-1,2020-03-01,Building Permit,2020-03-21,1010,\
250000,\"1 A ST, SAN DIEGO 92101\",0,0,1,0,1,0,0";
const SOLAR: &str = "C-2,2021-07-01,Photovoltaic,2021-07-04,,,\
\"2 B ST, SAN DIEGO 92104\",0,0,0,0,0,0,0";
const ELECTRICAL: &str = "C-3,2022-01-10,Electrical Permit,,,,\
\"3 C ST, SAN DIEGO 92101\",0,0,0,0,0,0,0";

fn catalog(rows: &[&str]) -> MemoryCatalog {
  let csv = std::iter::once(HEADER)
    .chain(rows.iter().copied())
    .collect::<Vec<_>>()
    .join("\n");
  let batch = normalize(
    SourceSystem::Current,
    "current.csv",
    csv.as_bytes(),
    &NormalizeOptions::default(),
  )
  .unwrap();
  Pipeline::new(PipelineConfig::default())
    .run_batches(vec![batch])
    .unwrap()
    .catalog
}

fn store(dir: &TempDir, retain_runs: usize) -> ParquetCatalogStore {
  ParquetCatalogStore::open(dir.path().join("catalog"), retain_runs).unwrap()
}

fn run_dirs(store: &ParquetCatalogStore) -> Vec<String> {
  let mut names: Vec<String> = fs::read_dir(store.root().join("runs"))
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}

// ─── Publish and read ────────────────────────────────────────────────────────

#[test]
fn nothing_published_yet() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  assert_eq!(s.current_id().unwrap(), None);
  assert!(matches!(s.open_current(), Err(Error::NoCurrentCatalog(_))));
}

#[test]
fn published_tables_read_back_unchanged() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let memory = catalog(&[BUILDING, SOLAR, ELECTRICAL]);
  let publication = s.publish(&memory).unwrap();
  assert!(!publication.reused);

  let published = s.open_current().unwrap();
  assert_eq!(published.catalog_id(), publication.catalog_id);
  assert_eq!(published.aggregate_names(), memory.aggregate_names());
  for table in memory.tables() {
    assert_eq!(&published.read_table(table.name()).unwrap(), table);
  }
}

#[test]
fn empty_aggregates_read_back_with_their_columns() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let memory = catalog(&[BUILDING]);
  s.publish(&memory).unwrap();

  let solar = s
    .open_current()
    .unwrap()
    .read_table(names::SOLAR_PERMITS_MONTHLY)
    .unwrap();
  assert_eq!(solar.num_rows(), 0);
  assert_eq!(
    solar,
    memory.read_table(names::SOLAR_PERMITS_MONTHLY).unwrap()
  );
}

#[test]
fn unknown_aggregate_is_rejected() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  s.publish(&catalog(&[BUILDING])).unwrap();
  let err = s.open_current().unwrap().read_table("no_such").unwrap_err();
  assert!(matches!(
    err,
    Error::Core(permits_core::Error::UnknownAggregate(_))
  ));
}

#[test]
fn manifest_records_contract_dimensions() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  s.publish(&catalog(&[BUILDING])).unwrap();
  let published = s.open_current().unwrap();
  let contract = CatalogContract::published();
  for entry in contract.entries() {
    let table = &published.manifest().tables[entry.aggregate];
    assert_eq!(table.dimensions, entry.dimensions);
    assert_eq!(table.file, format!("{}.parquet", entry.aggregate));
  }
}

// ─── Idempotence ─────────────────────────────────────────────────────────────

#[test]
fn identical_inputs_publish_byte_identical_runs() {
  let (a, b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
  let pa = store(&a, 2)
    .publish(&catalog(&[BUILDING, SOLAR, ELECTRICAL]))
    .unwrap();
  let pb = store(&b, 2)
    .publish(&catalog(&[BUILDING, SOLAR, ELECTRICAL]))
    .unwrap();
  assert_eq!(pa.catalog_id, pb.catalog_id);

  let published = PublishedCatalog::open(&pa.run_dir).unwrap();
  let mut files: Vec<String> = published
    .manifest()
    .tables
    .values()
    .map(|t| t.file.clone())
    .collect();
  files.push("manifest.json".to_owned());
  for file in files {
    assert_eq!(
      fs::read(pa.run_dir.join(&file)).unwrap(),
      fs::read(pb.run_dir.join(&file)).unwrap(),
      "{file} differs"
    );
  }
}

#[test]
fn republishing_the_same_catalog_reuses_the_run() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let first = s.publish(&catalog(&[BUILDING])).unwrap();
  let second = s.publish(&catalog(&[BUILDING])).unwrap();
  assert!(second.reused);
  assert_eq!(first.run_dir, second.run_dir);
  assert_eq!(run_dirs(&s).len(), 1);
}

#[test]
fn republishing_over_a_damaged_run_rewrites_it() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let first = s.publish(&catalog(&[BUILDING])).unwrap();
  s.publish(&catalog(&[BUILDING, SOLAR])).unwrap();
  let damaged = first
    .run_dir
    .join(format!("{}.parquet", names::PERMIT_SUMMARY));
  fs::write(&damaged, b"garbage").unwrap();

  let again = s.publish(&catalog(&[BUILDING])).unwrap();
  assert!(!again.reused);
  assert_eq!(again.run_dir, first.run_dir);
  assert_eq!(again.catalog_id, first.catalog_id);

  let published = s.open_current().unwrap();
  assert_eq!(published.catalog_id(), first.catalog_id);
  for name in published.aggregate_names() {
    published.read_table(&name).unwrap();
  }
}

#[test]
fn republishing_over_a_run_missing_a_file_rewrites_it() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let first = s.publish(&catalog(&[BUILDING])).unwrap();
  fs::remove_file(
    first
      .run_dir
      .join(format!("{}.parquet", names::MAP_POINTS)),
  )
  .unwrap();

  let again = s.publish(&catalog(&[BUILDING])).unwrap();
  assert!(!again.reused);
  s.open_current()
    .unwrap()
    .read_table(names::MAP_POINTS)
    .unwrap();
}

// ─── Atomicity and retention ─────────────────────────────────────────────────

#[test]
fn failed_publish_keeps_the_previous_catalog_current() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let good = catalog(&[BUILDING]);
  s.publish(&good).unwrap();
  let before = s.current_id().unwrap();

  let incomplete = MemoryCatalog::new(
    CatalogContract::published(),
    good.tables().skip(1).cloned(),
  );
  let err = s.publish(&incomplete).unwrap_err();
  assert!(matches!(
    err,
    Error::Core(permits_core::Error::MissingAggregate(_))
  ));
  assert_eq!(s.current_id().unwrap(), before);
  assert_eq!(run_dirs(&s).len(), 1);
}

#[test]
fn old_runs_beyond_retention_are_pruned() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let first = s.publish(&catalog(&[BUILDING])).unwrap();
  let second = s.publish(&catalog(&[BUILDING, SOLAR])).unwrap();
  let third = s.publish(&catalog(&[BUILDING, SOLAR, ELECTRICAL])).unwrap();

  let first_id = first.run_dir.file_name().unwrap().to_string_lossy();
  assert_eq!(third.pruned, vec![first_id.into_owned()]);
  assert!(!first.run_dir.exists());
  assert!(second.run_dir.exists());
  assert_eq!(run_dirs(&s).len(), 2);
  assert_eq!(s.open_current().unwrap().catalog_id(), third.catalog_id);
}

#[test]
fn retention_never_drops_the_current_run() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 0);
  s.publish(&catalog(&[BUILDING])).unwrap();
  let latest = s.publish(&catalog(&[SOLAR])).unwrap();
  assert_eq!(run_dirs(&s).len(), 1);
  assert!(latest.run_dir.exists());
}

// ─── Integrity ───────────────────────────────────────────────────────────────

#[test]
fn tampered_file_fails_integrity_check() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let publication = s.publish(&catalog(&[BUILDING])).unwrap();
  let path = publication
    .run_dir
    .join(format!("{}.parquet", names::PERMIT_SUMMARY));
  let mut bytes = fs::read(&path).unwrap();
  bytes.push(0);
  fs::write(&path, bytes).unwrap();

  let err = s
    .open_current()
    .unwrap()
    .read_table(names::PERMIT_SUMMARY)
    .unwrap_err();
  assert!(matches!(err, Error::Integrity { .. }), "{err}");
}

#[test]
fn manifest_from_another_schema_version_is_refused() {
  let dir = TempDir::new().unwrap();
  let s = store(&dir, 2);
  let publication = s.publish(&catalog(&[BUILDING])).unwrap();
  let path = publication.run_dir.join("manifest.json");
  let json = fs::read_to_string(&path)
    .unwrap()
    .replace("\"schema_version\": 1", "\"schema_version\": 99");
  fs::write(&path, json).unwrap();

  assert!(matches!(
    s.open_current(),
    Err(Error::SchemaVersion {
      found:    99,
      expected: 1,
    })
  ));
}
