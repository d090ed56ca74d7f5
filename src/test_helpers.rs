//! Shared test helpers: an in-memory JSON source with call recording.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::{Error, FetchError, Result};
use crate::fetcher::{JsonSource, endpoint};
use crate::types::SummaryRecord;

/// Base URL used by in-memory sources
pub(crate) const BASE: &str = "http://source.test/api";

/// A [`JsonSource`] answering from fixed routes and recording every request
#[derive(Default)]
pub(crate) struct ScriptedSource {
    routes: HashMap<String, Value>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve `value` at `url`
    pub(crate) fn with(mut self, url: impl Into<String>, value: Value) -> Self {
        self.routes.insert(url.into(), value);
        self
    }

    /// Fail every request to `url`
    pub(crate) fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Requested URLs, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Requested URLs under `{BASE}/detail/`
    pub(crate) fn detail_calls(&self) -> Vec<String> {
        let prefix = endpoint(BASE, "detail/");
        self.calls()
            .into_iter()
            .filter(|url| url.starts_with(&prefix))
            .collect()
    }
}

#[async_trait]
impl JsonSource for ScriptedSource {
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.failing.contains(url) {
            return Err(scripted_failure(url, 500));
        }
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| scripted_failure(url, 404))
    }
}

fn scripted_failure(url: &str, status: u16) -> Error {
    Error::Fetch {
        url: url.to_string(),
        attempts: 1,
        source: FetchError::Status {
            status,
            body: "scripted failure".to_string(),
        },
    }
}

/// A listing entry with the given identifier and status
pub(crate) fn summary(code: &str, status: &str) -> SummaryRecord {
    SummaryRecord::new(json!({"code": code, "status": status, "name": format!("Item {code}")}))
}

/// Listing page URL as built by the paginator
pub(crate) fn list_url(page_size: u32, offset: u64) -> String {
    format!("{}?limit={}&offset={}", endpoint(BASE, "list"), page_size, offset)
}

/// Detail URL for a code that needs no escaping
pub(crate) fn detail_url(code: &str) -> String {
    endpoint(BASE, &format!("detail/{code}"))
}

/// A source serving `records` as a paginated listing under [`BASE`]
///
/// Pages are registered for every offset below `declared_total`, sliced from
/// `records`, so a `declared_total` larger than `records.len()` yields empty pages.
pub(crate) fn listing_source(
    records: &[SummaryRecord],
    declared_total: u64,
    page_size: u32,
) -> ScriptedSource {
    let mut source = ScriptedSource::new().with(
        endpoint(BASE, "stats"),
        json!({"total": declared_total}),
    );

    let mut offset = 0u64;
    while offset < declared_total {
        let start = (offset as usize).min(records.len());
        let end = (start + page_size as usize).min(records.len());
        let results: Vec<Value> = records[start..end]
            .iter()
            .map(|r| r.as_value().clone())
            .collect();
        source = source.with(list_url(page_size, offset), json!({"results": results}));
        offset += u64::from(page_size);
    }
    source
}

/// `count` records named `R0000`, `R0001`, ... with status `published`
pub(crate) fn numbered_records(count: usize) -> Vec<SummaryRecord> {
    (0..count)
        .map(|i| summary(&format!("R{i:04}"), "published"))
        .collect()
}
