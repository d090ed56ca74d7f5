//! Test configuration helpers for loading .env settings and building pipeline configs

use env_migrate::{MigrationConfig, RetryConfig};
use std::path::Path;
use std::time::Duration;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Config pointing at a mock source, with millisecond retry delays
pub fn mock_config(base_url: &str, bundle_path: &Path, page_size: u32) -> MigrationConfig {
    let mut config = MigrationConfig::for_source(base_url);
    config.retry = RetryConfig {
        max_attempts: 3,
        retry_delay: Duration::from_millis(10),
        ..Default::default()
    };
    config.source.request_timeout = Duration::from_secs(5);
    config.pagination.page_size = page_size;
    config.output.bundle_path = bundle_path.to_path_buf();
    config
}

/// Load live source configuration from environment variables
///
/// Required environment variables:
/// - `MIGRATE_SOURCE_URL` - Base URL of the source API
///
/// Optional environment variables:
/// - `MIGRATE_AUTH_HEADER` - Value sent as the `Authorization` header
/// - `MIGRATE_PAGE_SIZE` - Listing page size (default: 100)
/// - `MIGRATE_MAX_ATTEMPTS` - Attempts per request (default: 3)
pub fn load_live_config(bundle_path: &Path) -> Result<MigrationConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let base_url = std::env::var("MIGRATE_SOURCE_URL")
        .map_err(|_| ConfigError("MIGRATE_SOURCE_URL not set in environment".to_string()))?;

    let page_size: u32 = std::env::var("MIGRATE_PAGE_SIZE")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(100);

    let max_attempts: u32 = std::env::var("MIGRATE_MAX_ATTEMPTS")
        .ok()
        .and_then(|a| a.parse().ok())
        .unwrap_or(3);

    let mut config = MigrationConfig::for_source(base_url);
    config.source.auth_header = std::env::var("MIGRATE_AUTH_HEADER").ok();
    config.pagination.page_size = page_size;
    config.retry.max_attempts = max_attempts;
    config.output.bundle_path = bundle_path.to_path_buf();

    config
        .validate()
        .map_err(|e| ConfigError(format!("Invalid live config: {}", e)))?;
    Ok(config)
}

/// Whether a live source is configured
pub fn has_live_source() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("MIGRATE_SOURCE_URL").is_ok()
}
