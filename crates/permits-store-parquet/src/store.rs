//! [`ParquetCatalogStore`] publishes catalogs; [`PublishedCatalog`] reads one
//! back through [`CatalogReader`].
//!
//! Layout under the store root:
//!
//! ```text
//! CURRENT                  run id of the catalog consumers should read
//! HISTORY                  retained run ids, oldest first
//! runs/<run id>/           one immutable directory per published catalog
//!   manifest.json
//!   <aggregate>.parquet
//! ```
//!
//! A run is written into a staging directory and renamed into place, then
//! `CURRENT` is swapped by write-temp-then-rename. Readers resolve `CURRENT`
//! once and never observe a partially written run.

use std::{
  collections::BTreeMap,
  fs,
  io::{ErrorKind, Write as _},
  path::{Path, PathBuf},
};

use bytes::Bytes;
use permits_core::{
  catalog::CatalogContract,
  store::{CatalogReader, MemoryCatalog},
  table::AggregateTable,
};
use tracing::{debug, info, warn};

use crate::{
  Error, Result, encode,
  manifest::{Manifest, TableEntry, sha256_hex},
};

const CURRENT: &str = "CURRENT";
const HISTORY: &str = "HISTORY";
const RUNS: &str = "runs";
const MANIFEST: &str = "manifest.json";
const STAGING_PREFIX: &str = ".staging-";

/// Write `contents` to `path` via a sibling temp file and a rename.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
  let mut tmp = path.as_os_str().to_owned();
  tmp.push(".tmp");
  let tmp = PathBuf::from(tmp);
  let mut file = fs::File::create(&tmp)?;
  file.write_all(contents)?;
  file.sync_all()?;
  fs::rename(&tmp, path)?;
  Ok(())
}

fn read_optional(path: &Path) -> Result<Option<String>> {
  match fs::read_to_string(path) {
    Ok(s) => Ok(Some(s)),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e.into()),
  }
}

/// Whether `run_dir` already holds exactly `manifest` and every file it
/// lists still hashes to its recorded value.
fn run_is_intact(
  run_dir: &Path,
  manifest: &Manifest,
  manifest_json: &[u8],
) -> Result<bool> {
  let read = |path: PathBuf| match fs::read(path) {
    Ok(bytes) => Ok(Some(bytes)),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
    Err(e) => Err(Error::from(e)),
  };
  if read(run_dir.join(MANIFEST))?.as_deref() != Some(manifest_json) {
    return Ok(false);
  }
  for entry in manifest.tables.values() {
    let intact = read(run_dir.join(&entry.file))?
      .is_some_and(|bytes| sha256_hex(&bytes) == entry.sha256);
    if !intact {
      warn!(
        run_dir = %run_dir.display(),
        file = entry.file.as_str(),
        "existing run is damaged, restaging"
      );
      return Ok(false);
    }
  }
  Ok(true)
}

// ─── Publication ─────────────────────────────────────────────────────────────

/// The outcome of [`ParquetCatalogStore::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
  pub catalog_id: String,
  pub run_dir:    PathBuf,
  /// An identical run was already on disk and was made current as is.
  pub reused:     bool,
  /// Run ids deleted by retention.
  pub pruned:     Vec<String>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A directory of published catalog runs.
#[derive(Debug, Clone)]
pub struct ParquetCatalogStore {
  root:        PathBuf,
  retain_runs: usize,
}

impl ParquetCatalogStore {
  /// Open (or create) a store at `root` keeping the `retain_runs` most
  /// recent runs. At least one run, the current one, is always kept.
  pub fn open(root: impl Into<PathBuf>, retain_runs: usize) -> Result<Self> {
    let root = root.into();
    fs::create_dir_all(root.join(RUNS))?;
    Ok(Self {
      root,
      retain_runs: retain_runs.max(1),
    })
  }

  pub fn root(&self) -> &Path { &self.root }

  fn run_dir(&self, run_id: &str) -> PathBuf {
    self.root.join(RUNS).join(run_id)
  }

  /// The run id `CURRENT` points at, if anything has been published.
  pub fn current_id(&self) -> Result<Option<String>> {
    Ok(
      read_optional(&self.root.join(CURRENT))?
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty()),
    )
  }

  /// Resolve `CURRENT` and open that run.
  pub fn open_current(&self) -> Result<PublishedCatalog> {
    let run_id = self
      .current_id()?
      .ok_or_else(|| Error::NoCurrentCatalog(self.root.clone()))?;
    PublishedCatalog::open(self.run_dir(&run_id))
  }

  fn history(&self) -> Result<Vec<String>> {
    Ok(
      read_optional(&self.root.join(HISTORY))?
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect(),
    )
  }

  /// Check `catalog` against its contract, write it as a new run and make it
  /// current. On any error `CURRENT` is left untouched.
  pub fn publish(&self, catalog: &MemoryCatalog) -> Result<Publication> {
    catalog.contract().check_catalog(catalog.tables())?;

    let mut files: Vec<(String, Bytes)> = Vec::with_capacity(catalog.len());
    let mut entries = BTreeMap::new();
    for table in catalog.tables() {
      let file = format!("{}.parquet", table.name());
      let bytes = encode::write_table(table)?;
      entries.insert(
        table.name().to_owned(),
        TableEntry::new(table, file.clone(), &bytes),
      );
      files.push((file, bytes));
    }
    let manifest = Manifest::new(entries);
    let manifest_json = manifest.to_json()?;
    let run_id = manifest.run_id().to_owned();
    let run_dir = self.run_dir(&run_id);

    let reused = run_is_intact(&run_dir, &manifest, &manifest_json)?;

    if !reused {
      let staging = self.root.join(RUNS).join(format!("{STAGING_PREFIX}{run_id}"));
      if staging.exists() {
        fs::remove_dir_all(&staging)?;
      }
      fs::create_dir(&staging)?;
      for (file, bytes) in &files {
        write_atomic(&staging.join(file), bytes)?;
        debug!(file = file.as_str(), bytes = bytes.len(), "wrote aggregate");
      }
      write_atomic(&staging.join(MANIFEST), &manifest_json)?;
      if run_dir.exists() {
        fs::remove_dir_all(&run_dir)?;
      }
      fs::rename(&staging, &run_dir)?;
    }

    let mut history = self.history()?;
    history.retain(|id| *id != run_id);
    history.push(run_id.clone());
    let keep_from = history.len().saturating_sub(self.retain_runs);
    let retained = history.split_off(keep_from);

    write_atomic(&self.root.join(CURRENT), format!("{run_id}\n").as_bytes())?;
    write_atomic(
      &self.root.join(HISTORY),
      retained.iter().map(|id| format!("{id}\n")).collect::<String>().as_bytes(),
    )?;
    let pruned = self.prune(&retained)?;

    info!(
      catalog_id = manifest.catalog_id.as_str(),
      run_id = run_id.as_str(),
      reused,
      pruned = pruned.len(),
      "published catalog"
    );
    Ok(Publication {
      catalog_id: manifest.catalog_id,
      run_dir,
      reused,
      pruned,
    })
  }

  /// Delete every run directory not in `retained`. Staging directories left
  /// by an interrupted publish are ignored.
  fn prune(&self, retained: &[String]) -> Result<Vec<String>> {
    let mut pruned = Vec::new();
    for entry in fs::read_dir(self.root.join(RUNS))? {
      let entry = entry?;
      let name = entry.file_name().to_string_lossy().into_owned();
      if name.starts_with('.') || !entry.file_type()?.is_dir() {
        continue;
      }
      if !retained.contains(&name) {
        fs::remove_dir_all(entry.path())?;
        debug!(run_id = name.as_str(), "pruned run");
        pruned.push(name);
      }
    }
    pruned.sort();
    Ok(pruned)
  }
}

// ─── PublishedCatalog ────────────────────────────────────────────────────────

/// One published run, opened for reading. Holds the manifest resolved at
/// open time; every table read is checked against its recorded hash.
#[derive(Debug, Clone)]
pub struct PublishedCatalog {
  dir:      PathBuf,
  manifest: Manifest,
  contract: CatalogContract,
}

impl PublishedCatalog {
  /// Open the run at `dir`, checking its manifest against the published
  /// contract.
  pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = dir.into();
    let manifest = Manifest::from_json(&fs::read(dir.join(MANIFEST))?)?;
    let contract = CatalogContract::published();
    manifest.check(&contract)?;
    Ok(Self {
      dir,
      manifest,
      contract,
    })
  }

  pub fn dir(&self) -> &Path { &self.dir }

  pub fn manifest(&self) -> &Manifest { &self.manifest }

  pub fn catalog_id(&self) -> &str { &self.manifest.catalog_id }
}

impl CatalogReader for PublishedCatalog {
  type Error = Error;

  fn contract(&self) -> CatalogContract { self.contract }

  fn aggregate_names(&self) -> Vec<String> {
    self.manifest.tables.keys().cloned().collect()
  }

  fn read_table(&self, aggregate: &str) -> Result<AggregateTable> {
    let entry = self.manifest.tables.get(aggregate).ok_or_else(|| {
      permits_core::Error::UnknownAggregate(aggregate.to_owned())
    })?;
    let path = self.dir.join(&entry.file);
    let bytes = Bytes::from(fs::read(&path)?);

    let actual = sha256_hex(&bytes);
    if actual != entry.sha256 {
      return Err(Error::Integrity {
        file: path,
        expected: entry.sha256.clone(),
        actual,
      });
    }

    let table = encode::read_table(aggregate, bytes)?;
    if table.num_rows() != entry.rows {
      return Err(Error::ManifestMismatch(format!(
        "{aggregate} has {} rows, manifest records {}",
        table.num_rows(),
        entry.rows
      )));
    }
    Ok(table)
  }
}
