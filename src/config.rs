//! Configuration types for env-migrate
//!
//! Every component receives its settings explicitly through these structs; nothing is
//! read from process-wide state. All types deserialize with sensible defaults so a
//! config file only needs to name the source URL.

use crate::error::{Error, Result};
use crate::types::RecordStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for one migration run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source API connection settings
    pub source: SourceConfig,

    /// Retry behavior for every source request
    #[serde(default)]
    pub retry: RetryConfig,

    /// Listing pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Detail enrichment settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Bundle output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl MigrationConfig {
    /// Create a configuration for the given source base URL with default settings
    pub fn for_source(base_url: impl Into<String>) -> Self {
        Self {
            source: SourceConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Check the configuration before any network I/O happens
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.source.base_url).map_err(|e| {
            Error::config(
                "source.base_url",
                format!("invalid base URL '{}': {}", self.source.base_url, e),
            )
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                "source.base_url",
                format!("unsupported URL scheme '{}'", base.scheme()),
            ));
        }
        if self.source.request_timeout.is_zero() {
            return Err(Error::config(
                "source.request_timeout",
                "request timeout must be greater than zero",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "retry.max_attempts",
                "at least one attempt is required",
            ));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "backoff multiplier must be a finite value of at least 1.0",
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(Error::config(
                "pagination.page_size",
                "page size must be at least 1",
            ));
        }
        if self.pagination.max_pages == 0 {
            return Err(Error::config(
                "pagination.max_pages",
                "page budget must be at least 1",
            ));
        }
        if self.output.bundle_path.as_os_str().is_empty() {
            return Err(Error::config("output.bundle_path", "bundle path is empty"));
        }
        Ok(())
    }
}

/// Source API connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the source API; `stats`, `list` and `detail/{code}` hang off it
    pub base_url: String,

    /// Pre-acquired `Authorization` header value, sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_header: Option<String>,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single request attempt (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_header: None,
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Retry configuration for transient request failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts, serialized in milliseconds (default: 2000)
    #[serde(default = "default_retry_delay", with = "duration_millis_serde")]
    pub retry_delay: Duration,

    /// Upper bound for the delay when backoff grows it (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Delay multiplier applied after each retry (default: 1.0, a fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay: default_retry_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Listing pagination settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Records requested per page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum pages fetched before giving up on reaching the declared total (default: 10000)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

/// Detail enrichment settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Status whose records are exported at summary fidelity only (default: "draft")
    #[serde(default)]
    pub minimal_status: RecordStatus,
}

/// Bundle output settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the bundle is written (default: "./migration.bundle.json")
    #[serde(default = "default_bundle_path")]
    pub bundle_path: PathBuf,

    /// Size budget for the bundle; exceeding it is reported, not fatal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bundle_bytes: Option<u64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bundle_path: default_bundle_path(),
            max_bundle_bytes: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("env-migrate/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    10_000
}

fn default_bundle_path() -> PathBuf {
    PathBuf::from("./migration.bundle.json")
}

// Duration serialization helper (seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
