//! `permits`: build, publish and inspect the aggregate catalog.
//!
//! # Usage
//!
//! ```text
//! permits build
//! permits --config /etc/permits.toml query approval_timelines --zip 92101
//! permits catalog
//! permits options
//! ```
//!
//! Settings come from the TOML file given with `--config` (default
//! `permits.toml`, optional) layered under `PERMITS_*` environment variables;
//! nested keys use `__`, e.g. `PERMITS_OVERLAP_WINDOW__START_YEAR`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use permits_core::{
  filter::FilterSet,
  permit::{ApprovalType, SourceSystem},
};
use permits_pipeline::{Pipeline, PipelineConfig};
use permits_query::{describe, filter_options, query};
use permits_store_parquet::{ParquetCatalogStore, PublishedCatalog};
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "permits", version, about = "Municipal permit aggregate catalog")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "permits.toml", env = "PERMITS_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ingest the configured sources, build every aggregate and publish them.
  Build,

  /// Print the rows of one published aggregate as JSON.
  Query {
    /// Aggregate name, e.g. `permit_volume_monthly`.
    aggregate: String,

    #[arg(long)]
    year_min: Option<i32>,

    #[arg(long)]
    year_max: Option<i32>,

    /// Permit type label, e.g. "Solar/PV".
    #[arg(long = "type")]
    approval_type: Option<ApprovalType>,

    #[arg(long)]
    zip: Option<String>,

    /// `legacy` or `current`.
    #[arg(long)]
    source: Option<SourceSystem>,
  },

  /// List the published aggregates with their dimensions and row counts.
  Catalog,

  /// List the distinct filter values in the published catalog.
  Options,
}

// ─── Config ──────────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("PERMITS")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let mut cfg: PipelineConfig = settings
    .try_deserialize()
    .context("failed to deserialise PipelineConfig")?;

  cfg.output_dir = expand_tilde(&cfg.output_dir);
  for path in cfg
    .sources
    .legacy
    .iter_mut()
    .chain(cfg.sources.current.iter_mut())
  {
    *path = expand_tilde(path);
  }
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  expand_tilde_with(path, std::env::var("HOME").ok().as_deref())
}

fn expand_tilde_with(path: &Path, home: Option<&str>) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Some(home) = home
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn store(cfg: &PipelineConfig) -> anyhow::Result<ParquetCatalogStore> {
  ParquetCatalogStore::open(&cfg.output_dir, cfg.retain_runs).with_context(
    || format!("failed to open catalog store at {:?}", cfg.output_dir),
  )
}

fn open_current(cfg: &PipelineConfig) -> anyhow::Result<PublishedCatalog> {
  store(cfg)?
    .open_current()
    .context("failed to open the current catalog")
}

fn build(cfg: PipelineConfig) -> anyhow::Result<serde_json::Value> {
  let store = store(&cfg)?;
  let output = Pipeline::new(cfg).run().context("pipeline run failed")?;
  let publication = store
    .publish(&output.catalog)
    .context("failed to publish catalog")?;
  Ok(json!({
    "catalog_id": publication.catalog_id,
    "run_dir":    publication.run_dir,
    "reused":     publication.reused,
    "pruned":     publication.pruned,
    "report":     output.report,
  }))
}

fn run(cli: Cli) -> anyhow::Result<serde_json::Value> {
  let cfg = load_config(&cli.config)?;
  match cli.command {
    Command::Build => build(cfg),
    Command::Query {
      aggregate,
      year_min,
      year_max,
      approval_type,
      zip,
      source,
    } => {
      let filters = FilterSet {
        year_min,
        year_max,
        approval_type,
        zip_code: zip,
        source_system: source,
      };
      let table = query(&open_current(&cfg)?, &aggregate, &filters)?;
      Ok(json!(table.to_json_rows()))
    }
    Command::Catalog => {
      let catalog = open_current(&cfg)?;
      Ok(json!({
        "catalog_id": catalog.catalog_id(),
        "aggregates": describe(&catalog)?,
      }))
    }
    Command::Options => Ok(json!(filter_options(&open_current(&cfg)?)?)),
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let output = run(Cli::parse())?;
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
