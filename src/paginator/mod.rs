//! Listing pagination
//!
//! The paginator asks the source for its declared total, then walks the listing in
//! fixed-size pages at offsets `0, page_size, 2 * page_size, ...` until the offset
//! reaches the total. Offset exhaustion, not record count, decides when the listing
//! is done; count drift is reported as an [`Anomaly`].

use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::{Error, IncompleteFetchError, IncompleteReason, Result};
use crate::fetcher::{JsonSource, endpoint};
use crate::types::{Anomaly, EventEmitter, MigrationEvent, SummaryRecord};

/// The ordered summary collection produced by a pagination run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paginated {
    /// Total reported by the stats endpoint at the start of the run
    pub declared_total: u64,
    /// Summary records in discovery order, one per identifier
    pub summaries: Vec<SummaryRecord>,
    /// Listing pages fetched
    pub pages_fetched: u32,
    /// Identifiers seen again after their first occurrence (and dropped)
    pub duplicate_codes: Vec<String>,
}

impl Paginated {
    /// Count drift between the declared total and what was listed, if any
    pub fn count_anomaly(&self) -> Option<Anomaly> {
        let fetched = self.summaries.len() as u64;
        (fetched != self.declared_total).then(|| Anomaly::CountMismatch {
            declared_total: self.declared_total,
            fetched,
        })
    }

    /// Identifiers the listing returned more than once, if any
    pub fn duplicate_anomaly(&self) -> Option<Anomaly> {
        (!self.duplicate_codes.is_empty()).then(|| Anomaly::DuplicateIdentifiers {
            codes: self.duplicate_codes.clone(),
        })
    }

    /// All anomalies of a completed listing
    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.count_anomaly()
            .into_iter()
            .chain(self.duplicate_anomaly())
            .collect()
    }

    fn push_page(&mut self, page: Vec<SummaryRecord>, seen: &mut HashSet<String>) {
        for record in page {
            if let Some(code) = record.code()
                && !seen.insert(code.to_string())
            {
                warn!(code = %code, "Duplicate identifier in listing, keeping first occurrence");
                self.duplicate_codes.push(code.into_owned());
                continue;
            }
            self.summaries.push(record);
        }
    }
}

/// Drives a [`JsonSource`] across the paginated listing
pub struct Paginator<'a> {
    source: &'a dyn JsonSource,
    max_pages: u32,
    events: EventEmitter,
}

impl<'a> Paginator<'a> {
    /// Create a paginator that fetches at most `max_pages` listing pages
    pub fn new(source: &'a dyn JsonSource, max_pages: u32) -> Self {
        Self {
            source,
            max_pages,
            events: EventEmitter::disabled(),
        }
    }

    /// Report progress through the given emitter
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Fetch the declared total
    ///
    /// # Errors
    ///
    /// Propagates the fetch error, or [`Error::UnexpectedResponse`] if the document has
    /// no non-negative integer `total`.
    pub async fn fetch_declared_total(&self, base_url: &str) -> Result<u64> {
        let url = endpoint(base_url, "stats");
        let stats = self.source.get_json(&url).await?;
        stats
            .get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::UnexpectedResponse {
                url,
                message: "missing non-negative integer `total`".to_string(),
            })
    }

    /// Fetch every summary record, in listing order
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `page_size` is zero
    /// - Fetch errors from the stats call, which leave nothing to paginate
    /// - [`Error::IncompleteFetch`] with the partial sequence if the page budget runs
    ///   out or a page cannot be fetched before the declared total is reached
    pub async fn fetch_all_summaries(&self, base_url: &str, page_size: u32) -> Result<Paginated> {
        if page_size == 0 {
            return Err(Error::config(
                "pagination.page_size",
                "page size must be at least 1",
            ));
        }

        let declared_total = self.fetch_declared_total(base_url).await?;
        info!(declared_total, page_size, "Source declared record total");
        self.events
            .emit(MigrationEvent::StatsFetched { declared_total });

        let mut result = Paginated {
            declared_total,
            // The declared total is untrusted; don't let it size the allocation
            summaries: Vec::with_capacity(declared_total.min(100_000) as usize),
            ..Default::default()
        };
        let mut seen = HashSet::new();
        let list_url = endpoint(base_url, "list");
        let mut offset: u64 = 0;

        while offset < declared_total {
            if result.pages_fetched >= self.max_pages {
                warn!(
                    max_pages = self.max_pages,
                    offset, declared_total, "Page budget exhausted before declared total"
                );
                return Err(IncompleteFetchError {
                    reason: IncompleteReason::PageBudgetExhausted {
                        max_pages: self.max_pages,
                    },
                    partial: result,
                }
                .into());
            }

            let url = format!("{}?limit={}&offset={}", list_url, page_size, offset);
            let page = match self.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(offset, error = %e, "Listing page failed, stopping pagination");
                    return Err(IncompleteFetchError {
                        reason: IncompleteReason::PageFetchFailed {
                            offset,
                            error: e.to_string(),
                        },
                        partial: result,
                    }
                    .into());
                }
            };

            let received = page.len();
            result.pages_fetched += 1;
            result.push_page(page, &mut seen);
            self.events.emit(MigrationEvent::PageFetched {
                offset,
                received,
                accumulated: result.summaries.len(),
            });
            tracing::debug!(offset, received, "Fetched listing page");

            offset += u64::from(page_size);
        }

        if let Some(anomaly) = result.count_anomaly() {
            warn!(%anomaly, "Listing count differs from declared total");
        }
        info!(
            fetched = result.summaries.len(),
            pages = result.pages_fetched,
            "Listing complete"
        );

        Ok(result)
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<SummaryRecord>> {
        let mut document = self.source.get_json(url).await?;
        match document.get_mut("results").map(Value::take) {
            Some(Value::Array(results)) => Ok(results.into_iter().map(SummaryRecord::new).collect()),
            _ => Err(Error::UnexpectedResponse {
                url: url.to_string(),
                message: "missing `results` array".to_string(),
            }),
        }
    }
}
