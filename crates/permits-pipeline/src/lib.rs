//! Unification and aggregation pipeline for municipal permit records.
//!
//! ```text
//! CSV files ─ permits_ingest ─▶ NormalizedBatch (per file, parallel)
//!   └─ dedup::deduplicate      (barrier; one record per approval_id)
//!        └─ classify           (parallel, pure)
//!             └─ UnifiedDataset (crate-private)
//!                  └─ aggregate (nine specs, parallel) ─▶ contract check
//!                       └─ MemoryCatalog + RunReport
//! ```
//!
//! The unified dataset never leaves this crate. Consumers read the checked
//! catalog, usually after it has been published by `permits-store-parquet`.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
mod run;
mod unified;

pub use config::{OverlapWindow, PipelineConfig, SourcePaths};
pub use error::{Error, Result};
pub use run::{FileReport, Pipeline, RunOutput, RunReport};
