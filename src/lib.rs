//! # env-migrate
//!
//! Extract-and-bundle half of a one-shot cross-environment data migration.
//!
//! The source system is reachable only through a paginated HTTP JSON API exposing
//! two levels of fidelity: a summary listing and per-record detail documents. A run
//! lists every summary, fetches full detail for records above the minimal status tier,
//! and writes one JSON bundle for a separate import process to consume.
//!
//! ## Design Philosophy
//!
//! - **Nothing silently lost** - count drift, duplicates and skipped records are
//!   reported, never swallowed
//! - **Best-effort enrichment** - one failed detail fetch never costs any other record
//! - **Explicit configuration** - every component gets its settings through
//!   [`MigrationConfig`]; there is no global state
//! - **Library-first** - progress is exposed as events and a [`MigrationReport`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use env_migrate::{MigrationConfig, MigrationPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = MigrationConfig::for_source("https://source.example.com/api/products");
//!     config.output.bundle_path = "staging/products.bundle.json".into();
//!
//!     let pipeline = MigrationPipeline::new(config)?;
//!     let report = pipeline.run().await?;
//!
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Bundle assembly and persistence
pub mod bundle;
/// Configuration types
pub mod config;
/// Selective detail enrichment
pub mod enricher;
/// Error types
pub mod error;
/// Resilient JSON fetching
pub mod fetcher;
/// Listing pagination
pub mod paginator;
/// Migration run orchestration
pub mod pipeline;
/// Retry logic for source requests
pub mod retry;
/// Core types and events
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use bundle::MigrationBundle;
pub use config::{
    EnrichmentConfig, MigrationConfig, OutputConfig, PaginationConfig, RetryConfig, SourceConfig,
};
pub use enricher::{Enricher, Enrichment, needs_detail};
pub use error::{
    DetailFetchFailure, Error, FetchError, IncompleteFetchError, IncompleteReason,
    MalformedRecordError, PersistenceError, Result,
};
pub use fetcher::{JsonSource, ResilientFetcher};
pub use paginator::{Paginated, Paginator};
pub use pipeline::{MigrationPipeline, MigrationReport};
pub use types::{
    Anomaly, DetailFetchOutcome, DetailRecord, EventEmitter, MigrationEvent, RecordStatus,
    SummaryRecord,
};
