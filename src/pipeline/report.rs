//! Final run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DetailFetchFailure, MalformedRecordError};
use crate::types::Anomaly;

/// What a migration run did, for the operator and for manual follow-up
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the bundle was written
    pub finished_at: DateTime<Utc>,
    /// Record count reported by the source
    pub declared_total: u64,
    /// Summary records in the bundle
    pub summaries_fetched: usize,
    /// Listing pages fetched
    pub pages_fetched: u32,
    /// Detail records in the bundle
    pub details_succeeded: usize,
    /// Records whose detail fetch failed, for manual follow-up
    pub details_failed: Vec<DetailFetchFailure>,
    /// Records skipped for lack of an identifier
    pub malformed_records: Vec<MalformedRecordError>,
    /// Records left at summary fidelity by the status predicate
    pub not_selected: usize,
    /// Where the bundle was written
    pub bundle_path: PathBuf,
    /// Bundle size in bytes
    pub bundle_size_bytes: u64,
    /// Warning-level findings
    pub anomalies: Vec<Anomaly>,
}

impl MigrationReport {
    /// True when nothing needs follow-up: no failures, no skipped records, no anomalies
    pub fn is_clean(&self) -> bool {
        self.details_failed.is_empty()
            && self.malformed_records.is_empty()
            && self.anomalies.is_empty()
    }

    /// Identifiers whose detail fetch failed
    pub fn failed_codes(&self) -> Vec<&str> {
        self.details_failed.iter().map(|f| f.code.as_str()).collect()
    }
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "Migration finished in {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        )?;
        writeln!(
            f,
            "  summaries: {} of {} declared ({} page(s))",
            self.summaries_fetched, self.declared_total, self.pages_fetched
        )?;
        writeln!(
            f,
            "  details:   {} succeeded, {} failed, {} not selected",
            self.details_succeeded,
            self.details_failed.len(),
            self.not_selected
        )?;
        if !self.malformed_records.is_empty() {
            writeln!(
                f,
                "  skipped:   {} record(s) without identifier",
                self.malformed_records.len()
            )?;
        }
        writeln!(
            f,
            "  bundle:    {} ({} bytes)",
            self.bundle_path.display(),
            self.bundle_size_bytes
        )?;
        for anomaly in &self.anomalies {
            writeln!(f, "  warning:   {}", anomaly)?;
        }
        if !self.details_failed.is_empty() {
            writeln!(f, "  failed identifiers:")?;
            for failure in &self.details_failed {
                writeln!(f, "    {}: {}", failure.code, failure.error)?;
            }
        }
        Ok(())
    }
}
