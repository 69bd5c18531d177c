//! Versioned translation tables from each source's CSV columns onto the
//! canonical record.
//!
//! A new source schema version is a new [`SourceMapping`] entry; nothing
//! downstream of the normalizer changes. Mappings are tried newest first.

use csv::StringRecord;
use permits_core::permit::{CANONICAL_SCHEMA_VERSION, SourceSystem};

use crate::vocabulary::{DEFAULT_TYPE_RULES, TypeRule};

// ─── Canonical fields ────────────────────────────────────────────────────────

/// Canonical fields a source column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  ApprovalId,
  CreateDate,
  IssueDate,
  CloseDate,
  ApprovalType,
  BcCode,
  BcCodeDescription,
  Address,
  Valuation,
  Lat,
  Lng,
  DuExtremelyLow,
  DuVeryLow,
  DuLow,
  DuModerate,
  DuAboveModerate,
  DuFutureDemo,
  DuBonus,
  AduTotal,
  JaduTotal,
}

impl Field {
  const COUNT: usize = 20;

  /// Canonical name, used in rejection reasons and null counters.
  pub fn name(self) -> &'static str {
    match self {
      Self::ApprovalId => "approval_id",
      Self::CreateDate => "create_date",
      Self::IssueDate => "issue_date",
      Self::CloseDate => "close_date",
      Self::ApprovalType => "approval_type",
      Self::BcCode => "bc_code",
      Self::BcCodeDescription => "bc_code_description",
      Self::Address => "address",
      Self::Valuation => "valuation",
      Self::Lat => "lat",
      Self::Lng => "lng",
      Self::DuExtremelyLow => "du_extremely_low",
      Self::DuVeryLow => "du_very_low",
      Self::DuLow => "du_low",
      Self::DuModerate => "du_moderate",
      Self::DuAboveModerate => "du_above_moderate",
      Self::DuFutureDemo => "du_future_demo",
      Self::DuBonus => "du_bonus",
      Self::AduTotal => "adu_total",
      Self::JaduTotal => "jadu_total",
    }
  }
}

/// How the normalizer reacts when a column is missing from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  /// Missing ⇒ the run is aborted.
  Structural,
  /// Missing ⇒ the whole file is rejected as schema drift.
  Expected,
  /// Missing ⇒ the field is null or zero for every row.
  Optional,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
  pub field:  Field,
  pub column: &'static str,
  pub role:   Role,
}

const fn col(field: Field, column: &'static str, role: Role) -> ColumnSpec {
  ColumnSpec {
    field,
    column,
    role,
  }
}

/// One version of one source's column schema.
#[derive(Debug, Clone, Copy)]
pub struct SourceMapping {
  pub source:     SourceSystem,
  pub version:    u32,
  /// The canonical schema version this mapping produces.
  pub targets:    u32,
  pub columns:    &'static [ColumnSpec],
  pub type_rules: &'static [TypeRule],
  /// Whether a zip code is derived from the job address.
  pub zip_from_address: bool,
}

// ─── Registered mappings ─────────────────────────────────────────────────────

use Field as F;
use Role::{Expected, Optional, Structural};

const LEGACY_V1_COLUMNS: &[ColumnSpec] = &[
  col(F::ApprovalId, "APPROVAL_ID", Structural),
  col(F::CreateDate, "DATE_APPROVAL_CREATE", Structural),
  col(F::ApprovalType, "APPROVAL_TYPE", Structural),
  col(F::IssueDate, "DATE_APPROVAL_ISSUE", Expected),
  col(F::BcCode, "JOB_BC_CODE", Expected),
  col(F::Valuation, "APPROVAL_VALUATION", Expected),
  col(F::DuExtremelyLow, "APPROVAL_DU_EXTREMELY_LOW", Expected),
  col(F::DuVeryLow, "APPROVAL_DU_VERY_LOW", Expected),
  col(F::DuLow, "APPROVAL_DU_LOW", Expected),
  col(F::DuModerate, "APPROVAL_DU_MODERATE", Expected),
  col(F::DuAboveModerate, "APPROVAL_DU_ABOVE_MODERATE", Expected),
  col(F::CloseDate, "DATE_APPROVAL_CLOSE", Optional),
  col(F::BcCodeDescription, "JOB_BC_CODE_DESCRIPTION", Optional),
  col(F::Lat, "LAT_JOB", Optional),
  col(F::Lng, "LNG_JOB", Optional),
  col(F::DuFutureDemo, "APPROVAL_DU_FUTURE_DEMO", Optional),
  col(F::DuBonus, "APPROVAL_DU_BONUS", Optional),
];

const CURRENT_V1_COLUMNS: &[ColumnSpec] = &[
  col(F::ApprovalId, "APPROVAL_ID", Structural),
  col(F::CreateDate, "DATE_APPROVAL_CREATE", Structural),
  col(F::ApprovalType, "APPROVAL_TYPE", Structural),
  col(F::IssueDate, "DATE_APPROVAL_ISSUE", Expected),
  col(F::BcCode, "JOB_BC_CODE", Expected),
  col(F::Valuation, "APPROVAL_VALUATION", Expected),
  col(F::Address, "ADDRESS_JOB", Expected),
  col(F::DuExtremelyLow, "APPROVAL_DU_EXTREMELY_LOW", Expected),
  col(F::DuVeryLow, "APPROVAL_DU_VERY_LOW", Expected),
  col(F::DuLow, "APPROVAL_DU_LOW", Expected),
  col(F::DuModerate, "APPROVAL_DU_MODERATE", Expected),
  col(F::DuAboveModerate, "APPROVAL_DU_ABOVE_MODERATE", Expected),
  col(F::AduTotal, "APPROVAL_ADU_TOTAL", Expected),
  col(F::JaduTotal, "APPROVAL_JADU_TOTAL", Expected),
  col(F::CloseDate, "DATE_APPROVAL_CLOSE", Optional),
  col(F::BcCodeDescription, "JOB_BC_CODE_DESCRIPTION", Optional),
  col(F::Lat, "LAT_JOB", Optional),
  col(F::Lng, "LNG_JOB", Optional),
  col(F::DuFutureDemo, "APPROVAL_DU_FUTURE_DEMO", Optional),
  col(F::DuBonus, "APPROVAL_DU_BONUS", Optional),
];

/// Every registered mapping, newest version first within each source.
pub const MAPPINGS: &[SourceMapping] = &[
  SourceMapping {
    source:           SourceSystem::Legacy,
    version:          1,
    targets:          CANONICAL_SCHEMA_VERSION,
    columns:          LEGACY_V1_COLUMNS,
    type_rules:       DEFAULT_TYPE_RULES,
    zip_from_address: false,
  },
  SourceMapping {
    source:           SourceSystem::Current,
    version:          1,
    targets:          CANONICAL_SCHEMA_VERSION,
    columns:          CURRENT_V1_COLUMNS,
    type_rules:       DEFAULT_TYPE_RULES,
    zip_from_address: true,
  },
];

pub fn mappings_for(
  source: SourceSystem,
) -> impl Iterator<Item = &'static SourceMapping> {
  MAPPINGS
    .iter()
    .filter(move |m| m.source == source && m.targets == CANONICAL_SCHEMA_VERSION)
}

// ─── Header resolution ───────────────────────────────────────────────────────

/// Column positions of every canonical field for one file's header.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
  positions: [Option<usize>; Field::COUNT],
}

impl ColumnIndex {
  pub fn position(&self, field: Field) -> Option<usize> {
    self.positions[field as usize]
  }

  /// The trimmed value of `field` in `row`; `None` when the column is
  /// absent or the cell is blank.
  pub fn get<'r>(&self, row: &'r StringRecord, field: Field) -> Option<&'r str> {
    self
      .position(field)
      .and_then(|i| row.get(i))
      .map(str::trim)
      .filter(|s| !s.is_empty())
  }
}

/// The outcome of matching a header against a source's mappings.
#[derive(Debug)]
pub enum Resolution {
  /// Every structural and expected column is present.
  Matched {
    mapping: &'static SourceMapping,
    index:   ColumnIndex,
  },
  /// Structural columns are present but some expected columns are not; the
  /// file is rejected.
  Drifted {
    mapping: &'static SourceMapping,
    missing: Vec<&'static str>,
  },
  /// A structural column is missing from every mapping.
  Fatal { missing: Vec<&'static str> },
}

fn normalise_header(h: &str) -> String {
  h.trim_start_matches('\u{feff}').trim().to_ascii_uppercase()
}

fn missing_with_role(
  mapping: &SourceMapping,
  headers: &[String],
  role: Role,
) -> Vec<&'static str> {
  mapping
    .columns
    .iter()
    .filter(|c| c.role == role && !headers.iter().any(|h| h == c.column))
    .map(|c| c.column)
    .collect()
}

fn index_for(mapping: &SourceMapping, headers: &[String]) -> ColumnIndex {
  let mut positions = [None; Field::COUNT];
  for spec in mapping.columns {
    positions[spec.field as usize] =
      headers.iter().position(|h| h == spec.column);
  }
  ColumnIndex { positions }
}

/// Match `headers` against every mapping registered for `source`.
///
/// Returns `None` when no mapping is registered at all.
pub fn resolve(
  source: SourceSystem,
  headers: &StringRecord,
) -> Option<Resolution> {
  let headers: Vec<String> = headers.iter().map(normalise_header).collect();
  let mut drifted = None;
  let mut fatal = None;

  for mapping in mappings_for(source) {
    let structural = missing_with_role(mapping, &headers, Structural);
    if !structural.is_empty() {
      fatal.get_or_insert(structural);
      continue;
    }
    let expected = missing_with_role(mapping, &headers, Expected);
    if expected.is_empty() {
      return Some(Resolution::Matched {
        mapping,
        index: index_for(mapping, &headers),
      });
    }
    drifted.get_or_insert(Resolution::Drifted {
      mapping,
      missing: expected,
    });
  }

  drifted.or_else(|| fatal.map(|missing| Resolution::Fatal { missing }))
}
