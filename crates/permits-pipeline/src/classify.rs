//! Field classifier: derives the analytical fields of each record.
//!
//! Every field is a pure function of the record it belongs to, so records are
//! classified in parallel without shared state.

use chrono::Datelike as _;
use permits_core::permit::{
  ApprovalType, Classification, ClassifiedPermit, PermitRecord,
};
use rayon::prelude::*;

/// Building-code prefix shared by every new residential construction code.
const RESIDENTIAL_BC_PREFIX: &str = "10";
/// Building code for accessory dwelling units.
const ADU_BC_CODE: &str = "4333";

pub fn is_housing(record: &PermitRecord) -> bool {
  record
    .bc_code
    .as_deref()
    .is_some_and(|c| c.starts_with(RESIDENTIAL_BC_PREFIX))
    || (record.approval_type_clean == ApprovalType::BuildingPermit
      && record.du > 0)
}

pub fn is_adu(record: &PermitRecord) -> bool {
  record.bc_code.as_deref() == Some(ADU_BC_CODE)
    || record.adu_total > 0
    || record.jadu_total > 0
}

pub fn total_du(record: &PermitRecord) -> u64 {
  u64::from(record.du) + u64::from(record.adu_total) + u64::from(record.jadu_total)
}

/// Days from creation to issue. `None` when the approval is not issued or
/// the dates are inverted.
pub fn approval_days(record: &PermitRecord) -> Option<u32> {
  let issued = record.issue_date?;
  u32::try_from((issued - record.create_date).num_days()).ok()
}

pub fn classify(record: &PermitRecord) -> Classification {
  let activity = record.activity_date();
  Classification {
    is_housing:     is_housing(record),
    is_solar:       record.approval_type_clean == ApprovalType::SolarPv,
    is_adu:         is_adu(record),
    total_du:       total_du(record),
    approval_days:  approval_days(record),
    approval_year:  activity.year(),
    approval_month: activity.month(),
  }
}

/// Classify every record, preserving order.
pub fn classify_all(records: Vec<PermitRecord>) -> Vec<ClassifiedPermit> {
  records
    .into_par_iter()
    .map(|record| {
      let derived = classify(&record);
      ClassifiedPermit { record, derived }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use permits_core::permit::{SourceSystem, UnitBreakdown};
  use proptest::prelude::*;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn record(kind: ApprovalType) -> PermitRecord {
    PermitRecord {
      approval_id:         "X-1".to_owned(),
      source_system:       SourceSystem::Current,
      create_date:         d(2021, 3, 10),
      issue_date:          None,
      close_date:          None,
      approval_type:       kind.as_str().to_owned(),
      approval_type_clean: kind,
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
  fn residential_bc_code_is_housing_without_units() {
    let mut r = record(ApprovalType::Electrical);
    r.bc_code = Some("1010".to_owned());
    let c = classify(&r);
    assert!(c.is_housing);
    assert_eq!(c.total_du, 0);
  }

  #[test]
  fn building_permit_needs_units_to_be_housing() {
    let mut r = record(ApprovalType::BuildingPermit);
    assert!(!classify(&r).is_housing);
    r.du = 2;
    assert!(classify(&r).is_housing);
  }

  #[test]
  fn solar_is_independent_of_housing() {
    let mut r = record(ApprovalType::SolarPv);
    r.bc_code = Some("1010".to_owned());
    let c = classify(&r);
    assert!(c.is_solar);
    assert!(c.is_housing);

    let c = classify(&record(ApprovalType::SolarPv));
    assert!(c.is_solar);
    assert!(!c.is_housing);
  }

  #[test]
  fn adu_from_code_or_counters() {
    let mut r = record(ApprovalType::BuildingPermit);
    assert!(!classify(&r).is_adu);
    r.bc_code = Some("4333".to_owned());
    assert!(classify(&r).is_adu);

    let mut r = record(ApprovalType::BuildingPermit);
    r.jadu_total = 1;
    assert!(classify(&r).is_adu);
  }

  #[test]
  fn inverted_dates_have_no_duration() {
    let mut r = record(ApprovalType::Fire);
    r.create_date = d(2021, 6, 1);
    r.issue_date = Some(d(2021, 5, 1));
    assert_eq!(classify(&r).approval_days, None);
  }

  #[test]
  fn activity_period_prefers_issue_date() {
    let mut r = record(ApprovalType::Fire);
    let c = classify(&r);
    assert_eq!((c.approval_year, c.approval_month), (2021, 3));

    r.issue_date = Some(d(2022, 1, 4));
    let c = classify(&r);
    assert_eq!((c.approval_year, c.approval_month), (2022, 1));
    assert_eq!(c.approval_days, Some(300));
  }

  #[test]
  fn classify_all_preserves_order() {
    let mut a = record(ApprovalType::Fire);
    a.approval_id = "A".to_owned();
    let mut b = record(ApprovalType::Sign);
    b.approval_id = "B".to_owned();
    let out = classify_all(vec![a, b]);
    let ids: Vec<_> = out.iter().map(|p| p.record.approval_id.as_str()).collect();
    assert_eq!(ids, ["A", "B"]);
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn total_du_is_the_sum_of_unit_counters(
      du in any::<u32>(),
      adu in any::<u32>(),
      jadu in any::<u32>(),
    ) {
      let mut r = record(ApprovalType::BuildingPermit);
      r.du = du;
      r.adu_total = adu;
      r.jadu_total = jadu;
      let c = classify(&r);
      prop_assert_eq!(
        c.total_du,
        u64::from(du) + u64::from(adu) + u64::from(jadu)
      );
    }

    #[test]
    fn approval_days_present_iff_issued_on_or_after_creation(
      created in 0i64..20_000,
      offset in -400i64..400,
      issued in any::<bool>(),
    ) {
      let base = d(1990, 1, 1);
      let mut r = record(ApprovalType::Plumbing);
      r.create_date = base + chrono::Duration::days(created);
      if issued {
        r.issue_date = Some(r.create_date + chrono::Duration::days(offset));
      }
      let c = classify(&r);
      if issued && offset >= 0 {
        prop_assert_eq!(c.approval_days, Some(offset as u32));
      } else {
        prop_assert_eq!(c.approval_days, None);
      }
    }
  }
}
