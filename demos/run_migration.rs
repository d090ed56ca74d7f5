//! Migration run example
//!
//! This example demonstrates the core functionality of env-migrate:
//! - Configuring the source API and retry policy
//! - Creating a pipeline instance
//! - Subscribing to progress events
//! - Running the migration and reading the report

use std::time::Duration;

use env_migrate::config::{MigrationConfig, OutputConfig, PaginationConfig, RetryConfig};
use env_migrate::{MigrationEvent, MigrationPipeline, RecordStatus};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // Build configuration
    let mut config = MigrationConfig::for_source("https://source.example.com/api/products");
    config.source.auth_header = Some("Bearer your_token".to_string());
    config.retry = RetryConfig {
        max_attempts: 3,
        retry_delay: Duration::from_secs(2),
        ..Default::default()
    };
    config.pagination = PaginationConfig {
        page_size: 100,
        ..Default::default()
    };
    config.enrichment.minimal_status = RecordStatus::Draft;
    config.output = OutputConfig {
        bundle_path: "staging/products.bundle.json".into(),
        max_bundle_bytes: Some(512 * 1024 * 1024),
    };

    // Create pipeline instance
    let pipeline = MigrationPipeline::new(config)?;

    // Subscribe to events
    let mut events = pipeline.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                MigrationEvent::StatsFetched { declared_total } => {
                    println!("Source declares {} records", declared_total);
                }
                MigrationEvent::PageFetched {
                    offset,
                    received,
                    accumulated,
                } => {
                    println!(
                        "Page at offset {}: {} records ({} total)",
                        offset, received, accumulated
                    );
                }
                MigrationEvent::RecordSkipped { index } => {
                    println!("Skipped record #{} (no identifier)", index);
                }
                MigrationEvent::DetailFetched {
                    code,
                    position,
                    selected,
                } => {
                    println!("Detail {}/{}: {}", position, selected, code);
                }
                MigrationEvent::DetailFailed { code, error } => {
                    println!("Detail failed for {}: {}", code, error);
                }
                MigrationEvent::BundleWritten { path, size_bytes } => {
                    println!("Bundle written to {:?} ({} bytes)", path, size_bytes);
                }
            }
        }
    });

    let report = pipeline.run().await?;
    println!("{}", report);

    if !report.is_clean() {
        for anomaly in &report.anomalies {
            println!("anomaly: {}", anomaly);
        }
    }

    Ok(())
}
