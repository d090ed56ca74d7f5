//! Migration run orchestration.
//!
//! [`MigrationPipeline::run`] chains the phases on a single task:
//! - [`paginator`](crate::paginator) - declared total and the ordered summary listing
//! - [`enricher`](crate::enricher) - detail records for the selected subset
//! - [`bundle`](crate::bundle) - assembly and the single atomic write
//!
//! Pagination incompleteness and per-record failures are recovered here and show up in
//! the [`MigrationReport`]; only a failed stats call or a failed bundle write aborts.

mod report;


pub use report::MigrationReport;

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bundle;
use crate::config::MigrationConfig;
use crate::enricher::{Enricher, needs_detail};
use crate::error::{Error, Result};
use crate::fetcher::{JsonSource, ResilientFetcher};
use crate::paginator::Paginator;
use crate::types::{Anomaly, EventEmitter, MigrationEvent};

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// One-shot extract-and-bundle migration run
pub struct MigrationPipeline {
    config: Arc<MigrationConfig>,
    source: Arc<dyn JsonSource>,
    event_tx: tokio::sync::broadcast::Sender<MigrationEvent>,
}

impl MigrationPipeline {
    /// Create a pipeline reading from the configured HTTP source
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = ResilientFetcher::new(&config.source, config.retry.clone())?;
        Ok(Self::build(config, Arc::new(fetcher)))
    }

    /// Create a pipeline reading from a custom [`JsonSource`]
    ///
    /// `config.source.base_url` is still used to build request URLs; the source's own
    /// retry behavior replaces `config.retry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_source(config: MigrationConfig, source: Arc<dyn JsonSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, source))
    }

    fn build(config: MigrationConfig, source: Arc<dyn JsonSource>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            source,
            event_tx,
        }
    }

    /// Subscribe to progress events
    ///
    /// Subscribe before calling [`run`](Self::run) to see every event. Slow subscribers
    /// lag rather than slowing the run down.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MigrationEvent> {
        self.event_tx.subscribe()
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run the migration: list, enrich, assemble, write
    ///
    /// # Errors
    ///
    /// - Fetch errors from the stats call (nothing to bundle without a declared total)
    /// - [`Error::Persistence`] if the bundle cannot be written
    pub async fn run(&self) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let base_url = self.config.source.base_url.as_str();
        let events = EventEmitter::new(self.event_tx.clone());
        let mut anomalies = Vec::new();

        info!(base_url, "Starting migration run");

        let paginated = match Paginator::new(self.source.as_ref(), self.config.pagination.max_pages)
            .with_events(events.clone())
            .fetch_all_summaries(base_url, self.config.pagination.page_size)
            .await
        {
            Ok(paginated) => {
                anomalies.extend(paginated.anomalies());
                paginated
            }
            Err(Error::IncompleteFetch(incomplete)) => {
                warn!(error = %incomplete, "Continuing with partial listing");
                let partial = incomplete.partial;
                anomalies.push(Anomaly::IncompleteFetch {
                    declared_total: partial.declared_total,
                    fetched: partial.summaries.len() as u64,
                    pages_fetched: partial.pages_fetched,
                    reason: incomplete.reason,
                });
                anomalies.extend(partial.duplicate_anomaly());
                partial
            }
            Err(e) => return Err(e),
        };

        let enrichment = Enricher::new(self.source.as_ref())
            .with_events(events.clone())
            .enrich(
                base_url,
                &paginated.summaries,
                needs_detail(self.config.enrichment.minimal_status.clone()),
            )
            .await;
        let details_succeeded = enrichment.succeeded();

        let summaries_fetched = paginated.summaries.len();
        let bundle = bundle::assemble(
            paginated.summaries,
            enrichment.outcomes,
            paginated.declared_total,
        );
        if !bundle.is_complete() {
            warn!(
                summaries = summaries_fetched,
                declared_total = bundle.declared_total,
                "Bundle does not cover the declared total"
            );
        }

        let bundle_path = self.config.output.bundle_path.clone();
        let bundle_size_bytes = bundle::persist(&bundle, &bundle_path).await?;
        events.emit(MigrationEvent::BundleWritten {
            path: bundle_path.clone(),
            size_bytes: bundle_size_bytes,
        });

        if let Some(budget_bytes) = self.config.output.max_bundle_bytes
            && bundle_size_bytes > budget_bytes
        {
            warn!(
                size_bytes = bundle_size_bytes,
                budget_bytes, "Bundle exceeds size budget"
            );
            anomalies.push(Anomaly::BundleOverBudget {
                size_bytes: bundle_size_bytes,
                budget_bytes,
            });
        }

        let report = MigrationReport {
            started_at,
            finished_at: Utc::now(),
            declared_total: paginated.declared_total,
            summaries_fetched,
            pages_fetched: paginated.pages_fetched,
            details_succeeded,
            details_failed: enrichment.failures,
            malformed_records: enrichment.malformed,
            not_selected: enrichment.not_selected,
            bundle_path,
            bundle_size_bytes,
            anomalies,
        };

        info!(
            summaries = report.summaries_fetched,
            details = report.details_succeeded,
            failed = report.details_failed.len(),
            anomalies = report.anomalies.len(),
            size_bytes = report.bundle_size_bytes,
            "Migration run complete"
        );

        Ok(report)
    }
}
