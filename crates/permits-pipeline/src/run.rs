//! One end-to-end pipeline run: normalize → deduplicate → classify →
//! aggregate → contract check.
//!
//! Nothing here touches the publication target; a run either returns a
//! complete, checked catalog or an error.

use std::{collections::BTreeMap, path::PathBuf};

use permits_core::{permit::SourceSystem, store::MemoryCatalog};
use permits_ingest::{NormalizedBatch, normalize_file};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::{
  aggregate,
  config::PipelineConfig,
  dedup::{DedupReport, deduplicate},
  error::{Error, Result},
  unified::UnifiedDataset,
};

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
  pub source:     SourceSystem,
  pub file:       String,
  pub rows_read:  u64,
  pub normalized: usize,
  pub rejected:   usize,
  pub drifted:    bool,
}

/// What a run did, for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub files:            Vec<FileReport>,
  pub rows_read:        u64,
  pub rows_rejected:    u64,
  /// Rejections tallied by reason.
  pub rejected_by_kind: BTreeMap<&'static str, u64>,
  /// Nullable fields nulled during coercion, across all files.
  pub nulled:           BTreeMap<&'static str, u64>,
  pub dedup:            DedupReport,
  pub unified_records:  usize,
  /// Row count of every built aggregate.
  pub tables:           BTreeMap<String, usize>,
}

impl RunReport {
  fn absorb(&mut self, batch: &NormalizedBatch) {
    self.files.push(FileReport {
      source:     batch.source,
      file:       batch.file.clone(),
      rows_read:  batch.rows_read,
      normalized: batch.records.len(),
      rejected:   batch.rejections.len(),
      drifted:    batch.is_drifted(),
    });
    self.rows_read += batch.rows_read;
    for rejection in &batch.rejections {
      *self
        .rejected_by_kind
        .entry(rejection.reason.kind())
        .or_default() += 1;
    }
    self.rows_rejected = self.rows_read.saturating_sub(
      self.files.iter().map(|f| f.normalized as u64).sum(),
    );
    for (field, n) in &batch.nulled {
      *self.nulled.entry(*field).or_default() += n;
    }
  }
}

/// A checked catalog and the report of the run that built it.
#[derive(Debug)]
pub struct RunOutput {
  pub catalog: MemoryCatalog,
  pub report:  RunReport,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct Pipeline {
  config: PipelineConfig,
}

impl Pipeline {
  pub fn new(config: PipelineConfig) -> Self { Self { config } }

  pub fn config(&self) -> &PipelineConfig { &self.config }

  /// Every configured input, legacy files first, each in listed order.
  fn inputs(&self) -> Vec<(SourceSystem, &PathBuf)> {
    let sources = &self.config.sources;
    sources
      .legacy
      .iter()
      .map(|p| (SourceSystem::Legacy, p))
      .chain(sources.current.iter().map(|p| (SourceSystem::Current, p)))
      .collect()
  }

  /// Read and normalize every configured file, then build the catalog.
  pub fn run(&self) -> Result<RunOutput> {
    let inputs = self.inputs();
    if inputs.is_empty() {
      return Err(Error::NoInputs);
    }
    let options = self.config.normalize_options();
    let batches = inputs
      .par_iter()
      .map(|(source, path)| normalize_file(*source, path, &options))
      .collect::<Result<Vec<_>, _>>()?;
    self.run_batches(batches)
  }

  /// Build the catalog from already-normalized batches, taken in order.
  pub fn run_batches(&self, batches: Vec<NormalizedBatch>) -> Result<RunOutput> {
    let mut report = RunReport::default();
    let mut records = Vec::new();
    for batch in batches {
      report.absorb(&batch);
      records.extend(batch.records);
    }

    let (records, dedup) = deduplicate(records, &self.config.overlap_window);
    report.dedup = dedup;

    let dataset = UnifiedDataset::build(records);
    report.unified_records = dataset.len();

    let catalog = aggregate::build_catalog(&dataset)?;
    report.tables = catalog
      .tables()
      .map(|t| (t.name().to_owned(), t.num_rows()))
      .collect();

    info!(
      files = report.files.len(),
      rows_read = report.rows_read,
      rejected = report.rows_rejected,
      unified = report.unified_records,
      aggregates = report.tables.len(),
      "pipeline run complete"
    );
    Ok(RunOutput { catalog, report })
  }
}
