//! The aggregate catalog contract.
//!
//! A static registry, keyed by aggregate name, of the filter dimensions each
//! published aggregate supports. The pipeline checks every built table against
//! it before publication, and consumers check every filter against it before
//! execution.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _};

use crate::{Error, Result, filter::FilterSet, table::AggregateTable};

// ─── Dimensions ──────────────────────────────────────────────────────────────

/// A filterable attribute an aggregate may or may not carry.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Dimension {
  Year,
  ApprovalType,
  Zip,
  Source,
}

impl Dimension {
  /// The aggregate column that carries this dimension.
  pub fn column(self) -> &'static str {
    match self {
      Self::Year => "year",
      Self::ApprovalType => "approval_type_clean",
      Self::Zip => "zip_code",
      Self::Source => "source_system",
    }
  }

  pub fn from_column(column: &str) -> Option<Self> {
    Self::iter().find(|d| d.column() == column)
  }
}

pub type DimensionSet = BTreeSet<Dimension>;

// ─── Aggregate names ─────────────────────────────────────────────────────────

pub mod names {
  pub const PERMIT_VOLUME_MONTHLY: &str = "permit_volume_monthly";
  pub const HOUSING_UNITS_BY_YEAR: &str = "housing_units_by_year";
  pub const APPROVAL_TIMELINES: &str = "approval_timelines";
  pub const SOLAR_PERMITS_MONTHLY: &str = "solar_permits_monthly";
  pub const MAP_POINTS: &str = "map_points";
  pub const TOP_PERMIT_TYPES: &str = "top_permit_types";
  pub const CONSTRUCTION_BY_ZIP: &str = "construction_by_zip";
  pub const BC_CODE_SUMMARY: &str = "bc_code_summary";
  pub const PERMIT_SUMMARY: &str = "permit_summary";
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// One row of the contract: an aggregate and the dimensions it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractEntry {
  pub aggregate:  &'static str,
  pub dimensions: &'static [Dimension],
}

impl ContractEntry {
  pub fn dimension_set(&self) -> DimensionSet {
    self.dimensions.iter().copied().collect()
  }
}

use Dimension::{ApprovalType as Type, Source, Year, Zip};

/// The published catalog: nine aggregates and their dimension support.
pub const PUBLISHED_CONTRACT: &[ContractEntry] = &[
  ContractEntry {
    aggregate:  names::PERMIT_VOLUME_MONTHLY,
    dimensions: &[Year, Type, Source],
  },
  ContractEntry {
    aggregate:  names::HOUSING_UNITS_BY_YEAR,
    dimensions: &[Year],
  },
  ContractEntry {
    aggregate:  names::APPROVAL_TIMELINES,
    dimensions: &[Year, Type, Zip],
  },
  ContractEntry {
    aggregate:  names::SOLAR_PERMITS_MONTHLY,
    dimensions: &[Year, Zip],
  },
  ContractEntry {
    aggregate:  names::MAP_POINTS,
    dimensions: &[Year, Type, Zip],
  },
  ContractEntry {
    aggregate:  names::TOP_PERMIT_TYPES,
    dimensions: &[Type],
  },
  ContractEntry {
    aggregate:  names::CONSTRUCTION_BY_ZIP,
    dimensions: &[Year, Zip],
  },
  ContractEntry {
    aggregate:  names::BC_CODE_SUMMARY,
    dimensions: &[Year, Source],
  },
  ContractEntry {
    aggregate:  names::PERMIT_SUMMARY,
    dimensions: &[Year, Type, Zip, Source],
  },
];

/// A view over a contract registry. Cheap to copy.
#[derive(Debug, Clone, Copy)]
pub struct CatalogContract {
  entries: &'static [ContractEntry],
}

impl Default for CatalogContract {
  fn default() -> Self { Self::published() }
}

impl CatalogContract {
  /// The contract every published catalog is held to.
  pub const fn published() -> Self {
    Self {
      entries: PUBLISHED_CONTRACT,
    }
  }

  pub const fn from_entries(entries: &'static [ContractEntry]) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &'static [ContractEntry] { self.entries }

  pub fn entry(&self, aggregate: &str) -> Result<&'static ContractEntry> {
    self
      .entries
      .iter()
      .find(|e| e.aggregate == aggregate)
      .ok_or_else(|| Error::UnknownAggregate(aggregate.to_owned()))
  }

  pub fn dimensions(&self, aggregate: &str) -> Result<DimensionSet> {
    Ok(self.entry(aggregate)?.dimension_set())
  }

  /// Build-time check for a single table: the dimension columns it actually
  /// carries must equal the dimensions the contract advertises.
  pub fn check_table(&self, table: &AggregateTable) -> Result<()> {
    let declared = self.dimensions(table.name())?;
    let present = table.present_dimensions();
    if declared != present {
      return Err(Error::CatalogMismatch {
        aggregate: table.name().to_owned(),
        declared:  declared.into_iter().collect(),
        present:   present.into_iter().collect(),
      });
    }
    Ok(())
  }

  /// Build-time check for a whole catalog: every table matches its entry,
  /// and every entry is built exactly once.
  pub fn check_catalog<'a>(
    &self,
    tables: impl IntoIterator<Item = &'a AggregateTable>,
  ) -> Result<()> {
    let mut seen = BTreeSet::new();
    for table in tables {
      self.check_table(table)?;
      if !seen.insert(table.name()) {
        return Err(Error::DuplicateAggregate(table.name().to_owned()));
      }
    }
    if let Some(missing) =
      self.entries.iter().find(|e| !seen.contains(e.aggregate))
    {
      return Err(Error::MissingAggregate(missing.aggregate.to_owned()));
    }
    Ok(())
  }

  /// Query-time check: reject any filter on a dimension the aggregate does
  /// not carry.
  pub fn check_filters(
    &self,
    aggregate: &str,
    filters: &FilterSet,
  ) -> Result<()> {
    let supported = self.dimensions(aggregate)?;
    filters.validate()?;
    if let Some(dimension) = filters
      .requested_dimensions()
      .into_iter()
      .find(|d| !supported.contains(d))
    {
      return Err(Error::UnsupportedDimension {
        aggregate: aggregate.to_owned(),
        dimension,
      });
    }
    Ok(())
  }
}
