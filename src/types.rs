//! Core types for env-migrate

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::path::PathBuf;

use crate::error::{DetailFetchFailure, IncompleteReason};

/// Record status as reported by the source listing
///
/// Unknown values are kept verbatim so they survive a round trip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    /// Minimal tier: summary fidelity is all there is
    #[default]
    Draft,
    /// Validated record
    Validated,
    /// Published record
    Published,
    /// Any other status value
    Other(String),
}

impl RecordStatus {
    /// Wire representation of the status
    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Validated => "validated",
            RecordStatus::Published => "published",
            RecordStatus::Other(s) => s,
        }
    }
}

impl From<&str> for RecordStatus {
    fn from(s: &str) -> Self {
        match s {
            "draft" => RecordStatus::Draft,
            "validated" => RecordStatus::Validated,
            "published" => RecordStatus::Published,
            other => RecordStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for RecordStatus {
    fn from(s: String) -> Self {
        RecordStatus::from(s.as_str())
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry from the paginated listing, kept exactly as received
///
/// Only `code` and `status` are interpreted; every other field passes through
/// untouched. A record whose `code` is missing, empty or not a scalar is malformed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryRecord(Value);

impl SummaryRecord {
    /// Wrap a raw listing entry
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The record identifier, if present and non-empty
    ///
    /// Numeric identifiers are rendered as their decimal form.
    pub fn code(&self) -> Option<Cow<'_, str>> {
        match self.0.get("code")? {
            Value::String(s) if !s.trim().is_empty() => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    /// The record status, if the source reported one as a string
    pub fn status(&self) -> Option<RecordStatus> {
        self.0
            .get("status")
            .and_then(Value::as_str)
            .map(RecordStatus::from)
    }

    /// The raw JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Full-fidelity representation of one record, always a JSON object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DetailRecord(serde_json::Map<String, Value>);

impl DetailRecord {
    /// Look up a field of the detail document
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the detail document has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for DetailRecord {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(format!(
                "detail response is a JSON {}, expected an object",
                json_type_name(&other)
            )),
        }
    }
}

impl From<DetailRecord> for Value {
    fn from(record: DetailRecord) -> Self {
        Value::Object(record.0)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Result of one enrichment attempt
#[derive(Clone, Debug, PartialEq)]
pub enum DetailFetchOutcome {
    /// The detail record was fetched
    Success(DetailRecord),
    /// The detail fetch failed; the record stays at summary fidelity
    Failure(DetailFetchFailure),
}

impl DetailFetchOutcome {
    /// Whether the attempt succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, DetailFetchOutcome::Success(_))
    }
}

/// Warning-level finding of a run; never aborts the run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anomaly {
    /// Pagination finished but the record count differs from the declared total
    CountMismatch {
        /// Total reported by the source at the start of the run
        declared_total: u64,
        /// Records actually accumulated
        fetched: u64,
    },
    /// Pagination stopped before the declared total was reached
    IncompleteFetch {
        /// Total reported by the source at the start of the run
        declared_total: u64,
        /// Records accumulated before stopping
        fetched: u64,
        /// Pages fetched before stopping
        pages_fetched: u32,
        /// Why pagination stopped
        reason: IncompleteReason,
    },
    /// The listing returned the same identifier more than once; only the first was kept
    DuplicateIdentifiers {
        /// Identifiers that repeated, in order of the repeat
        codes: Vec<String>,
    },
    /// The written bundle is larger than the configured budget
    BundleOverBudget {
        /// Actual bundle size in bytes
        size_bytes: u64,
        /// Configured budget in bytes
        budget_bytes: u64,
    },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::CountMismatch {
                declared_total,
                fetched,
            } => write!(
                f,
                "source declared {} records but {} were listed",
                declared_total, fetched
            ),
            Anomaly::IncompleteFetch {
                declared_total,
                fetched,
                pages_fetched,
                reason,
            } => write!(
                f,
                "listing incomplete: {} of {} records after {} page(s) ({})",
                fetched, declared_total, pages_fetched, reason
            ),
            Anomaly::DuplicateIdentifiers { codes } => {
                write!(f, "duplicate identifiers dropped: {}", codes.join(", "))
            }
            Anomaly::BundleOverBudget {
                size_bytes,
                budget_bytes,
            } => write!(
                f,
                "bundle is {} bytes, over the {} byte budget",
                size_bytes, budget_bytes
            ),
        }
    }
}

/// Progress event emitted during a migration run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// The source reported its record count
    StatsFetched {
        /// Declared total
        declared_total: u64,
    },

    /// A listing page was fetched
    PageFetched {
        /// Offset of the page
        offset: u64,
        /// Records on the page
        received: usize,
        /// Records accumulated so far
        accumulated: usize,
    },

    /// A record was skipped because it has no identifier
    RecordSkipped {
        /// Position in the summary sequence
        index: usize,
    },

    /// A detail record was fetched
    DetailFetched {
        /// Record identifier
        code: String,
        /// 1-based position among the selected records
        position: usize,
        /// Number of records selected for enrichment
        selected: usize,
    },

    /// A detail fetch failed
    DetailFailed {
        /// Record identifier
        code: String,
        /// Failure description
        error: String,
    },

    /// The bundle was written
    BundleWritten {
        /// Bundle location
        path: PathBuf,
        /// Bundle size in bytes
        size_bytes: u64,
    },
}

/// Optional broadcast sender for [`MigrationEvent`]s
///
/// Sending never blocks; events are dropped when nobody is subscribed.
#[derive(Clone, Debug, Default)]
pub struct EventEmitter(Option<tokio::sync::broadcast::Sender<MigrationEvent>>);

impl EventEmitter {
    /// Emitter that forwards to the given channel
    pub fn new(tx: tokio::sync::broadcast::Sender<MigrationEvent>) -> Self {
        Self(Some(tx))
    }

    /// Emitter that discards everything
    pub fn disabled() -> Self {
        Self(None)
    }

    pub(crate) fn emit(&self, event: MigrationEvent) {
        if let Some(tx) = &self.0 {
            // Err only means there are no receivers
            tx.send(event).ok();
        }
    }
}
