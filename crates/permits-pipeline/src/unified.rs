//! The unified dataset: every deduplicated, classified permit.
//!
//! Crate-private. The aggregator is its only reader; everything downstream
//! sees the aggregate catalog.

use permits_core::permit::{ClassifiedPermit, PermitRecord};

use crate::classify::classify_all;

pub(crate) struct UnifiedDataset {
  permits: Vec<ClassifiedPermit>,
}

impl UnifiedDataset {
  /// Classify `records`, which must already be deduplicated and sorted by
  /// `approval_id`.
  pub(crate) fn build(records: Vec<PermitRecord>) -> Self {
    debug_assert!(
      records
        .windows(2)
        .all(|w| w[0].approval_id < w[1].approval_id),
      "records must be unique and sorted by approval_id"
    );
    Self {
      permits: classify_all(records),
    }
  }

  pub(crate) fn permits(&self) -> &[ClassifiedPermit] { &self.permits }

  pub(crate) fn len(&self) -> usize { self.permits.len() }
}
