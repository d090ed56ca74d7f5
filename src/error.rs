//! Error types for env-migrate
//!
//! Errors are split by how far they are allowed to travel:
//! - [`FetchError`] describes a single failed request attempt; the retry layer wraps the
//!   last one in [`Error::Fetch`] once attempts are exhausted
//! - [`IncompleteFetchError`] and [`DetailFetchFailure`] are recovered by the pipeline and
//!   end up in the run report instead of aborting the run
//! - [`PersistenceError`] is fatal: a run that cannot write its bundle has failed

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::paginator::Paginated;

/// Result type alias for env-migrate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for env-migrate
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pagination.page_size")
        key: Option<String>,
    },

    /// A request failed on every allowed attempt
    #[error("fetch of {url} failed after {attempts} attempt(s): {source}")]
    Fetch {
        /// The URL that was requested
        url: String,
        /// Number of attempts made before giving up
        attempts: u32,
        /// The error of the final attempt
        #[source]
        source: FetchError,
    },

    /// The source answered with JSON that does not have the expected shape
    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse {
        /// The URL that was requested
        url: String,
        /// What was wrong with the response
        message: String,
    },

    /// Pagination stopped before reaching the declared total
    #[error(transparent)]
    IncompleteFetch(#[from] IncompleteFetchError),

    /// Writing the bundle failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Config`] naming the offending key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// A single failed request attempt
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed (never retried)
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The attempt exceeded the per-attempt timeout
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection, TLS or body transfer failure
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The source answered with a non-2xx status
    #[error("HTTP status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Leading part of the response body (may itself be a JSON error document)
        body: String,
    },

    /// The response body was not valid JSON
    #[error("response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Why pagination stopped short of the declared total
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncompleteReason {
    /// The configured page budget ran out
    PageBudgetExhausted {
        /// The configured maximum number of pages
        max_pages: u32,
    },
    /// A page could not be fetched even after retries
    PageFetchFailed {
        /// Offset of the page that failed
        offset: u64,
        /// Error of the final attempt
        error: String,
    },
}

impl std::fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncompleteReason::PageBudgetExhausted { max_pages } => {
                write!(f, "page budget of {} exhausted", max_pages)
            }
            IncompleteReason::PageFetchFailed { offset, error } => {
                write!(f, "page at offset {} failed: {}", offset, error)
            }
        }
    }
}

/// Pagination could not reach the declared total
///
/// Carries everything fetched so far; the caller decides whether the partial
/// sequence is still worth bundling.
#[derive(Debug, Error)]
#[error(
    "pagination incomplete: {} of {} records after {} page(s), {reason}",
    .partial.summaries.len(),
    .partial.declared_total,
    .partial.pages_fetched
)]
pub struct IncompleteFetchError {
    /// Why pagination stopped
    pub reason: IncompleteReason,
    /// Records accumulated before stopping
    pub partial: Paginated,
}

/// A summary record without a usable identifier
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("summary record at position {index} has no identifier")]
pub struct MalformedRecordError {
    /// Position of the record in the summary sequence
    pub index: usize,
}

/// A detail fetch that failed for one record
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("detail fetch for {code} failed: {error}")]
pub struct DetailFetchFailure {
    /// Identifier of the record
    pub code: String,
    /// Description of the failure
    pub error: String,
}

/// Bundle persistence errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The bundle could not be encoded
    #[error("failed to encode bundle: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bundle could not be written to disk
    #[error("failed to write bundle to {}: {source}", path.display())]
    Write {
        /// Path being written when the failure occurred
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
