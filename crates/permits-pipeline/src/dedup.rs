//! Deduplicator: collapses the union of both sources to one record per
//! `approval_id`.
//!
//! Records are grouped by id in an ordered map, so the output is sorted by
//! id regardless of input order. Within a group:
//!
//! 1. Duplicates from the same source are an anomaly. They are resolved by
//!    keeping the most recently created record; ties fall to the latest close
//!    date (a missing close date loses), then to the later input position.
//! 2. A record from the current system supersedes the legacy one.
//! 3. Cross-source matches created outside the overlap window are resolved
//!    the same way but reported.

use std::collections::BTreeMap;

use chrono::Datelike as _;
use permits_core::permit::{PermitRecord, SourceSystem};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::OverlapWindow;

/// A same-source duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateAnomaly {
  pub approval_id: String,
  pub source:      SourceSystem,
  /// Records sharing the id within `source`, including the kept one.
  pub count:       usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
  pub input_records:       usize,
  pub output_records:      usize,
  /// Legacy records dropped because the current system carries the id.
  pub superseded:          usize,
  /// Records dropped while resolving same-source duplicates.
  pub same_source_dropped: usize,
  pub anomalies:           Vec<DuplicateAnomaly>,
  /// Ids matched across sources with a creation year outside the window.
  pub out_of_window:       Vec<String>,
}

/// Keep the preferred record of a same-source group.
fn resolve_same_source(
  group: Vec<(usize, PermitRecord)>,
) -> Option<PermitRecord> {
  group
    .into_iter()
    .max_by(|(pa, a), (pb, b)| {
      a.create_date
        .cmp(&b.create_date)
        .then(a.close_date.cmp(&b.close_date))
        .then(pa.cmp(pb))
    })
    .map(|(_, r)| r)
}

/// Collapse `records` (in input order) to one record per id.
pub fn deduplicate(
  records: Vec<PermitRecord>,
  window: &OverlapWindow,
) -> (Vec<PermitRecord>, DedupReport) {
  let mut report = DedupReport {
    input_records: records.len(),
    ..DedupReport::default()
  };

  let mut groups: BTreeMap<String, Vec<(usize, PermitRecord)>> =
    BTreeMap::new();
  for (position, record) in records.into_iter().enumerate() {
    groups
      .entry(record.approval_id.clone())
      .or_default()
      .push((position, record));
  }

  let mut out = Vec::with_capacity(groups.len());
  for (approval_id, group) in groups {
    let (current, legacy): (Vec<_>, Vec<_>) = group
      .into_iter()
      .partition(|(_, r)| r.source_system == SourceSystem::Current);

    for (source, members) in
      [(SourceSystem::Legacy, &legacy), (SourceSystem::Current, &current)]
    {
      if members.len() > 1 {
        warn!(
          approval_id = approval_id.as_str(),
          %source,
          count = members.len(),
          "same-source duplicate approval id"
        );
        report.same_source_dropped += members.len() - 1;
        report.anomalies.push(DuplicateAnomaly {
          approval_id: approval_id.clone(),
          source,
          count: members.len(),
        });
      }
    }

    let legacy = resolve_same_source(legacy);
    let current = resolve_same_source(current);

    let kept = match (legacy, current) {
      (Some(old), Some(new)) => {
        report.superseded += 1;
        let years = [old.create_date.year(), new.create_date.year()];
        if !years.iter().all(|y| window.contains(*y)) {
          warn!(
            approval_id = approval_id.as_str(),
            legacy_year = years[0],
            current_year = years[1],
            "cross-source match outside the overlap window"
          );
          report.out_of_window.push(approval_id.clone());
        }
        new
      }
      (Some(only), None) | (None, Some(only)) => only,
      (None, None) => continue,
    };
    out.push(kept);
  }

  report.output_records = out.len();
  info!(
    input = report.input_records,
    output = report.output_records,
    superseded = report.superseded,
    anomalies = report.anomalies.len(),
    "deduplicated records"
  );
  (out, report)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use permits_core::permit::{ApprovalType, UnitBreakdown};

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn record(id: &str, source: SourceSystem, created: NaiveDate) -> PermitRecord {
    PermitRecord {
      approval_id:         id.to_owned(),
      source_system:       source,
      create_date:         created,
      issue_date:          None,
      close_date:          None,
      approval_type:       "Building Permit".to_owned(),
      approval_type_clean: ApprovalType::BuildingPermit,
      bc_code:             None,
      bc_code_description: None,
      zip_code:            None,
      location:            None,
      valuation:           None,
      du:                  0,
      du_by_income:        UnitBreakdown::default(),
      adu_total:           0,
      jadu_total:          0,
    }
  }

  #[test]
  fn current_record_supersedes_legacy() {
    let mut legacy = record("A-100", SourceSystem::Legacy, d(2020, 1, 1));
    legacy.bc_code = Some("1010".to_owned());
    let mut current = record("A-100", SourceSystem::Current, d(2020, 1, 1));
    current.bc_code = Some("3280".to_owned());
    current.zip_code = Some("92101".to_owned());

    let (out, report) =
      deduplicate(vec![legacy, current.clone()], &OverlapWindow::default());
    assert_eq!(out, vec![current]);
    assert_eq!(out[0].bc_code.as_deref(), Some("3280"));
    assert_eq!(report.superseded, 1);
    assert!(report.anomalies.is_empty());
    assert!(report.out_of_window.is_empty());
  }

  #[test]
  fn input_order_does_not_matter() {
    let legacy = record("A-100", SourceSystem::Legacy, d(2019, 5, 1));
    let current = record("A-100", SourceSystem::Current, d(2019, 5, 1));
    let window = OverlapWindow::default();
    let (a, _) = deduplicate(vec![legacy.clone(), current.clone()], &window);
    let (b, _) = deduplicate(vec![current, legacy], &window);
    assert_eq!(a, b);
  }

  #[test]
  fn output_is_unique_and_sorted_by_id() {
    let window = OverlapWindow::default();
    let (out, report) = deduplicate(
      vec![
        record("C", SourceSystem::Legacy, d(2010, 1, 1)),
        record("A", SourceSystem::Current, d(2020, 1, 1)),
        record("B", SourceSystem::Legacy, d(2015, 1, 1)),
        record("A", SourceSystem::Legacy, d(2020, 1, 1)),
      ],
      &window,
    );
    let ids: Vec<_> = out.iter().map(|r| r.approval_id.as_str()).collect();
    assert_eq!(ids, ["A", "B", "C"]);
    assert_eq!(report.input_records, 4);
    assert_eq!(report.output_records, 3);
  }

  #[test]
  fn same_source_duplicates_keep_most_recent_creation() {
    let older = record("B-7", SourceSystem::Legacy, d(2010, 1, 1));
    let newer = record("B-7", SourceSystem::Legacy, d(2011, 1, 1));
    let (out, report) =
      deduplicate(vec![newer.clone(), older], &OverlapWindow::default());
    assert_eq!(out, vec![newer]);
    assert_eq!(report.same_source_dropped, 1);
    assert_eq!(report.anomalies, vec![DuplicateAnomaly {
      approval_id: "B-7".to_owned(),
      source:      SourceSystem::Legacy,
      count:       2,
    }]);
  }

  #[test]
  fn same_source_ties_prefer_closed_then_later_position() {
    let mut closed = record("B-8", SourceSystem::Legacy, d(2010, 1, 1));
    closed.close_date = Some(d(2010, 3, 1));
    let open = record("B-8", SourceSystem::Legacy, d(2010, 1, 1));
    let (out, _) =
      deduplicate(vec![closed.clone(), open], &OverlapWindow::default());
    assert_eq!(out, vec![closed]);

    let mut first = record("B-9", SourceSystem::Legacy, d(2010, 1, 1));
    first.valuation = Some(1.0);
    let mut second = first.clone();
    second.valuation = Some(2.0);
    let (out, _) =
      deduplicate(vec![first, second.clone()], &OverlapWindow::default());
    assert_eq!(out, vec![second]);
  }

  #[test]
  fn matches_outside_the_window_are_reported() {
    let legacy = record("D-1", SourceSystem::Legacy, d(2012, 1, 1));
    let current = record("D-1", SourceSystem::Current, d(2012, 1, 1));
    let (out, report) =
      deduplicate(vec![legacy, current], &OverlapWindow::default());
    assert_eq!(out[0].source_system, SourceSystem::Current);
    assert_eq!(report.out_of_window, vec!["D-1".to_owned()]);
  }
}
