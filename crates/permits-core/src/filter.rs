//! Consumer filter requests against a published aggregate.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  catalog::{Dimension, DimensionSet},
  permit::{ApprovalType, SourceSystem},
};

/// Optional filters a consumer may apply to an aggregate. Each populated
/// field requests one [`Dimension`]; the target aggregate must support it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
  /// Inclusive lower bound on `year`.
  pub year_min:      Option<i32>,
  /// Inclusive upper bound on `year`.
  pub year_max:      Option<i32>,
  pub approval_type: Option<ApprovalType>,
  pub zip_code:      Option<String>,
  pub source_system: Option<SourceSystem>,
}

impl FilterSet {
  pub fn is_empty(&self) -> bool { self.requested_dimensions().is_empty() }

  /// The dimensions this request filters on.
  pub fn requested_dimensions(&self) -> DimensionSet {
    let mut dims = DimensionSet::new();
    if self.year_min.is_some() || self.year_max.is_some() {
      dims.insert(Dimension::Year);
    }
    if self.approval_type.is_some() {
      dims.insert(Dimension::ApprovalType);
    }
    if self.zip_code.is_some() {
      dims.insert(Dimension::Zip);
    }
    if self.source_system.is_some() {
      dims.insert(Dimension::Source);
    }
    dims
  }

  /// Reject requests that can never match anything.
  pub fn validate(&self) -> Result<()> {
    if let (Some(min), Some(max)) = (self.year_min, self.year_max)
      && min > max
    {
      return Err(Error::InvalidYearRange { min, max });
    }
    Ok(())
  }

  pub fn accepts_year(&self, year: i32) -> bool {
    self.year_min.is_none_or(|min| year >= min)
      && self.year_max.is_none_or(|max| year <= max)
  }
}
