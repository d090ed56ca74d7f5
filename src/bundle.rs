//! Migration bundle assembly and persistence
//!
//! The bundle is a single JSON document:
//!
//! ```json
//! {
//!   "summaries": [ ... listing entries, in discovery order ... ],
//!   "details": { "<code>": { ... full record ... } },
//!   "declared_total": 250
//! }
//! ```
//!
//! `summaries` is authoritative for which records exist; `details` is a best-effort
//! overlay holding only successfully fetched records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{PersistenceError, Result};
use crate::types::{DetailFetchOutcome, DetailRecord, SummaryRecord};

/// The terminal artifact of a migration run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MigrationBundle {
    /// Every summary record, in discovery order
    pub summaries: Vec<SummaryRecord>,
    /// Successfully fetched detail records by identifier
    pub details: BTreeMap<String, DetailRecord>,
    /// Record count reported by the source at the start of the run
    pub declared_total: u64,
}

impl MigrationBundle {
    /// Whether the summary sequence covers exactly the declared total
    pub fn is_complete(&self) -> bool {
        self.summaries.len() as u64 == self.declared_total
    }
}

/// Merge summaries and enrichment outcomes into a bundle
///
/// Failed outcomes are dropped here; they are expected to have been reported by the
/// enrichment pass already.
pub fn assemble<I>(summaries: Vec<SummaryRecord>, outcomes: I, declared_total: u64) -> MigrationBundle
where
    I: IntoIterator<Item = (String, DetailFetchOutcome)>,
{
    let details = outcomes
        .into_iter()
        .filter_map(|(code, outcome)| match outcome {
            DetailFetchOutcome::Success(detail) => Some((code, detail)),
            DetailFetchOutcome::Failure(_) => None,
        })
        .collect();

    MigrationBundle {
        summaries,
        details,
        declared_total,
    }
}

/// Write the bundle to `path` and return its size in bytes
///
/// The document is written to a sibling staging file, synced, then renamed over
/// `path`, so `path` never holds a partially written bundle. Missing parent
/// directories are created.
///
/// # Errors
///
/// Any encoding or I/O failure is returned as [`PersistenceError`]; the staging file is
/// removed on a best-effort basis.
pub async fn persist(bundle: &MigrationBundle, path: &Path) -> Result<u64> {
    let encoded = serde_json::to_vec_pretty(bundle).map_err(PersistenceError::Encode)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| write_error(parent, source))?;
    }

    let staging = staging_path(path);
    if let Err(e) = write_synced(&staging, &encoded).await {
        tokio::fs::remove_file(&staging).await.ok();
        return Err(e.into());
    }
    if let Err(source) = tokio::fs::rename(&staging, path).await {
        tokio::fs::remove_file(&staging).await.ok();
        return Err(write_error(path, source).into());
    }

    let size = tokio::fs::metadata(path)
        .await
        .map_err(|source| write_error(path, source))?
        .len();

    tracing::info!(path = %path.display(), size_bytes = size, "Bundle written");
    Ok(size)
}

/// Read a bundle back from disk
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or a serialization error if it is
/// not a bundle document.
pub async fn load(path: &Path) -> Result<MigrationBundle> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::result::Result<(), PersistenceError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|source| write_error(path, source))?;
    file.write_all(contents)
        .await
        .map_err(|source| write_error(path, source))?;
    file.sync_all()
        .await
        .map_err(|source| write_error(path, source))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    }
}
