//! Selective detail enrichment
//!
//! Records whose status is above the minimal tier get their full detail document
//! fetched, one request per record. Every attempt ends in exactly one
//! [`DetailFetchOutcome`]; a failed record is logged and recorded, and enrichment moves
//! on to the next one.

use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use crate::error::{DetailFetchFailure, MalformedRecordError};
use crate::fetcher::{JsonSource, endpoint};
use crate::types::{
    DetailFetchOutcome, DetailRecord, EventEmitter, MigrationEvent, RecordStatus, SummaryRecord,
};

/// Selection predicate: enrich every record whose status is not `minimal`
///
/// Records without a status are enriched; only an explicit minimal-tier status opts
/// a record out.
pub fn needs_detail(minimal: RecordStatus) -> impl Fn(&SummaryRecord) -> bool {
    move |record| record.status().as_ref() != Some(&minimal)
}

/// Everything an enrichment pass produced
#[derive(Debug, Default)]
pub struct Enrichment {
    /// One outcome per enriched identifier
    pub outcomes: BTreeMap<String, DetailFetchOutcome>,
    /// Failed fetches, in visit order
    pub failures: Vec<DetailFetchFailure>,
    /// Records skipped for lack of an identifier
    pub malformed: Vec<MalformedRecordError>,
    /// Well-formed records the predicate left at summary fidelity
    pub not_selected: usize,
}

impl Enrichment {
    /// Number of detail records fetched
    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failures.len()
    }
}

/// Fetches detail records for the selected subset of a summary sequence
pub struct Enricher<'a> {
    source: &'a dyn JsonSource,
    events: EventEmitter,
}

impl<'a> Enricher<'a> {
    /// Create an enricher reading from `source`
    pub fn new(source: &'a dyn JsonSource) -> Self {
        Self {
            source,
            events: EventEmitter::disabled(),
        }
    }

    /// Report progress through the given emitter
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Fetch `{base_url}/detail/{code}` for every selected record
    ///
    /// Selection requires a non-empty identifier and `predicate(record)`. Records are
    /// visited in summary order and each identifier is fetched at most once.
    pub async fn enrich<P>(
        &self,
        base_url: &str,
        summaries: &[SummaryRecord],
        predicate: P,
    ) -> Enrichment
    where
        P: Fn(&SummaryRecord) -> bool,
    {
        let mut result = Enrichment::default();
        let mut selected = Vec::new();
        let mut seen = HashSet::new();

        for (index, record) in summaries.iter().enumerate() {
            let Some(code) = record.code() else {
                let malformed = MalformedRecordError { index };
                warn!(%malformed, "Skipping record");
                self.events.emit(MigrationEvent::RecordSkipped { index });
                result.malformed.push(malformed);
                continue;
            };
            if !predicate(record) {
                result.not_selected += 1;
                continue;
            }
            if seen.insert(code.to_string()) {
                selected.push(code);
            }
        }

        info!(
            selected = selected.len(),
            not_selected = result.not_selected,
            malformed = result.malformed.len(),
            "Starting detail enrichment"
        );

        let total = selected.len();
        for (position, code) in selected.into_iter().enumerate() {
            let code = code.into_owned();
            let outcome = self.fetch_detail(base_url, &code).await;

            match &outcome {
                DetailFetchOutcome::Success(_) => {
                    tracing::debug!(code = %code, position = position + 1, total, "Fetched detail");
                    self.events.emit(MigrationEvent::DetailFetched {
                        code: code.clone(),
                        position: position + 1,
                        selected: total,
                    });
                }
                DetailFetchOutcome::Failure(failure) => {
                    warn!(code = %code, error = %failure.error, "Detail fetch failed, keeping summary only");
                    self.events.emit(MigrationEvent::DetailFailed {
                        code: code.clone(),
                        error: failure.error.clone(),
                    });
                    result.failures.push(failure.clone());
                }
            }
            result.outcomes.insert(code, outcome);
        }

        info!(
            succeeded = result.succeeded(),
            failed = result.failures.len(),
            "Detail enrichment complete"
        );
        result
    }

    /// One detail fetch, with any error turned into a failure outcome
    async fn fetch_detail(&self, base_url: &str, code: &str) -> DetailFetchOutcome {
        let url = endpoint(base_url, &format!("detail/{}", urlencoding::encode(code)));
        let fetched = self
            .source
            .get_json(&url)
            .await
            .map_err(|e| e.to_string())
            .and_then(DetailRecord::try_from);

        match fetched {
            Ok(detail) => DetailFetchOutcome::Success(detail),
            Err(error) => DetailFetchOutcome::Failure(DetailFetchFailure {
                code: code.to_string(),
                error,
            }),
        }
    }
}
