//! Canonical permit records, the unit of the unified dataset.
//!
//! Both source systems are normalised into [`PermitRecord`]. The derived
//! analytical fields live in [`Classification`] and are only ever attached by
//! the field classifier, so a [`ClassifiedPermit`] is always fully classified.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Version of the canonical record shape. Source mappings target a specific
/// version; bump it when a field is added or its meaning changes.
pub const CANONICAL_SCHEMA_VERSION: u32 = 1;

// ─── Provenance ──────────────────────────────────────────────────────────────

/// The source system a record was normalised from.
///
/// Ordered so that `Legacy < Current`; the current system supersedes the
/// legacy one when both carry the same approval.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SourceSystem {
  /// The 2002–2022 permitting system.
  Legacy,
  /// The 2018-onward permitting system.
  Current,
}

impl SourceSystem {
  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Approval type ───────────────────────────────────────────────────────────

/// The closed vocabulary every raw approval type is mapped onto.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ApprovalType {
  #[serde(rename = "Building Permit")]
  #[strum(serialize = "Building Permit")]
  BuildingPermit,
  #[serde(rename = "Solar/PV")]
  #[strum(serialize = "Solar/PV")]
  SolarPv,
  Electrical,
  Plumbing,
  Mechanical,
  Fire,
  #[serde(rename = "Right of Way")]
  #[strum(serialize = "Right of Way")]
  RightOfWay,
  Sign,
  Other,
}

impl ApprovalType {
  /// The label written into aggregate tables (`approval_type_clean`).
  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Sub-types ───────────────────────────────────────────────────────────────

/// A job-site coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lng: f64,
}

/// Dwelling-unit counters reported on an approval, by affordability
/// category. Absent counters are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBreakdown {
  pub extremely_low:  u32,
  pub very_low:       u32,
  pub low:            u32,
  pub moderate:       u32,
  pub above_moderate: u32,
  pub future_demo:    u32,
  pub bonus:          u32,
}

impl UnitBreakdown {
  /// Sum of every counter; this is the record's `du`.
  pub fn total(&self) -> u32 {
    [
      self.extremely_low,
      self.very_low,
      self.low,
      self.moderate,
      self.above_moderate,
      self.future_demo,
      self.bonus,
    ]
    .into_iter()
    .fold(0u32, u32::saturating_add)
  }
}

// ─── PermitRecord ────────────────────────────────────────────────────────────

/// A permit approval normalised into the canonical schema, independent of
/// its originating source system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermitRecord {
  /// Cross-source natural key.
  pub approval_id:         String,
  pub source_system:       SourceSystem,
  pub create_date:         NaiveDate,
  /// `None` while the approval has not been issued.
  pub issue_date:          Option<NaiveDate>,
  pub close_date:          Option<NaiveDate>,
  /// The trimmed raw type text, kept for auditing the vocabulary mapping.
  pub approval_type:       String,
  pub approval_type_clean: ApprovalType,
  pub bc_code:             Option<String>,
  pub bc_code_description: Option<String>,
  /// Always `None` for legacy records.
  pub zip_code:            Option<String>,
  pub location:            Option<GeoPoint>,
  /// `None` is normal for non-building approval types.
  pub valuation:           Option<f64>,
  pub du:                  u32,
  pub du_by_income:        UnitBreakdown,
  pub adu_total:           u32,
  pub jadu_total:          u32,
}

impl PermitRecord {
  /// The date an approval is counted under: issue date, falling back to the
  /// creation date for approvals not yet issued.
  pub fn activity_date(&self) -> NaiveDate {
    self.issue_date.unwrap_or(self.create_date)
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Derived analytical fields computed from a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
  pub is_housing:     bool,
  pub is_solar:       bool,
  pub is_adu:         bool,
  /// `du + adu_total + jadu_total`.
  pub total_du:       u64,
  /// Whole calendar days from creation to issue; `None` when not issued or
  /// when the issue date precedes the creation date.
  pub approval_days:  Option<u32>,
  pub approval_year:  i32,
  pub approval_month: u32,
}

/// A canonical record bundled with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPermit {
  pub record:  PermitRecord,
  pub derived: Classification,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn approval_type_labels_round_trip() {
    for t in ApprovalType::iter() {
      assert_eq!(ApprovalType::from_str(t.as_str()).unwrap(), t);
      let json = serde_json::to_string(&t).unwrap();
      assert_eq!(json, format!("\"{}\"", t.as_str()));
    }
    assert_eq!(ApprovalType::iter().count(), 9);
  }

  #[test]
  fn source_system_parses_case_insensitively() {
    assert_eq!(SourceSystem::from_str("LEGACY").unwrap(), SourceSystem::Legacy);
    assert_eq!(SourceSystem::Current.as_str(), "current");
    assert!(SourceSystem::Legacy < SourceSystem::Current);
  }

  #[test]
  fn unit_breakdown_total_sums_every_counter() {
    let units = UnitBreakdown {
      extremely_low:  1,
      very_low:       2,
      low:            3,
      moderate:       4,
      above_moderate: 5,
      future_demo:    6,
      bonus:          7,
    };
    assert_eq!(units.total(), 28);
    assert_eq!(UnitBreakdown::default().total(), 0);
  }
}
