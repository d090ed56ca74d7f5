//! End-to-end runs against a mock HTTP source
//!
//! Every route is mounted with an exact expected hit count, so the mock server verifies
//! request counts (offsets, retries, detail fetches) when it is dropped.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use env_migrate::{Anomaly, Error, MigrationEvent, MigrationPipeline, bundle};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_listing_walks_every_offset_once() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let records: Vec<_> = (0..250)
        .map(|i| product(&format!("P{i:04}"), "draft"))
        .collect();
    mount_listing(&server, &records, 250, 100).await;

    let config = mock_config(&server.uri(), &temp_dir.path().join("bundle.json"), 100);
    let report = MigrationPipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.declared_total, 250);
    assert_eq!(report.summaries_fetched, 250);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.details_succeeded, 0);
    assert_eq!(report.not_selected, 250);
    assert!(report.is_clean());

    let bundle = bundle::load(&report.bundle_path).await.unwrap();
    let codes: Vec<_> = bundle
        .summaries
        .iter()
        .map(|s| s.code().unwrap().into_owned())
        .collect();
    let expected: Vec<_> = (0..250).map(|i| format!("P{i:04}")).collect();
    assert_eq!(codes, expected);
}

#[tokio::test]
async fn test_transient_stats_failures_are_retried() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_listing(&server, &[product("A", "draft")], 1, 10).await;

    let config = mock_config(&server.uri(), &temp_dir.path().join("bundle.json"), 10);
    let report = MigrationPipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.declared_total, 1);
    assert_eq!(report.summaries_fetched, 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_stats_exhaustion_aborts_the_run() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let bundle_path = temp_dir.path().join("bundle.json");

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let config = mock_config(&server.uri(), &bundle_path, 10);
    let err = MigrationPipeline::new(config).unwrap().run().await.unwrap_err();

    match err {
        Error::Fetch { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Fetch error, got {other:?}"),
    }
    assert!(!bundle_path.exists());
}

#[tokio::test]
async fn test_huge_backoff_multiplier_still_returns_fetch_error() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = mock_config(&server.uri(), &temp_dir.path().join("bundle.json"), 10);
    config.retry.backoff_multiplier = 1e30;
    config.retry.max_delay = Duration::from_millis(20);
    config.validate().unwrap();

    let err = MigrationPipeline::new(config).unwrap().run().await.unwrap_err();
    assert!(matches!(err, Error::Fetch { attempts: 3, .. }));
}

#[tokio::test]
async fn test_selective_enrichment_with_failures() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let records = vec![
        product("A", "draft"),
        product("B", "published"),
        product("C", "validated"),
        product("D", "draft"),
        product("E", "published"),
        product("F", "published"),
        product("G", "validated"),
        product("H", "draft"),
        product("I", "published"),
        product("J", "validated"),
    ];
    mount_listing(&server, &records, 10, 4).await;
    for code in ["B", "C", "E", "G", "J"] {
        mount_detail(&server, code).await;
    }
    // Each failing detail is attempted max_attempts times, then given up on
    mount_failing_detail(&server, "F", 3).await;
    mount_failing_detail(&server, "I", 3).await;

    let config = mock_config(&server.uri(), &temp_dir.path().join("bundle.json"), 4);
    let report = MigrationPipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.summaries_fetched, 10);
    assert_eq!(report.details_succeeded, 5);
    assert_eq!(report.failed_codes(), vec!["F", "I"]);
    assert_eq!(report.not_selected, 3);

    let bundle = bundle::load(&report.bundle_path).await.unwrap();
    assert_eq!(bundle.summaries.len(), 10);
    let detail_codes: Vec<_> = bundle.details.keys().map(String::as_str).collect();
    assert_eq!(detail_codes, vec!["B", "C", "E", "G", "J"]);
    assert_eq!(
        bundle.details["E"].get("attributes"),
        Some(&json!({"origin": "Curaçao", "weight_g": 125}))
    );
}

#[tokio::test]
async fn test_bundle_keeps_non_ascii_text_verbatim() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_listing(&server, &[product("Z1", "published")], 1, 10).await;
    mount_detail(&server, "Z1").await;

    let config = mock_config(&server.uri(), &temp_dir.path().join("bundle.json"), 10);
    let report = MigrationPipeline::new(config).unwrap().run().await.unwrap();

    let text = std::fs::read_to_string(&report.bundle_path).unwrap();
    assert!(text.contains("Produit Z1 — édition spéciale"));
    assert!(text.contains("Größe, Gewicht, 価格"));
    assert!(!text.contains("\\u"));

    let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(raw["declared_total"], json!(1));
    assert_eq!(raw["summaries"][0]["code"], json!("Z1"));
    assert_eq!(raw["details"]["Z1"]["attributes"]["origin"], json!("Curaçao"));
}

#[tokio::test]
async fn test_under_reported_total_keeps_extra_records_with_mismatch() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let records: Vec<_> = (0..12).map(|i| product(&format!("Q{i}"), "draft")).collect();

    // Stats claims 5, the listing returns a full page of 10 at offset 0
    mount_stats(&server, 5).await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": &records[..10]})))
        .expect(1)
        .mount(&server)
        .await;

    let config = mock_config(&server.uri(), &temp_dir.path().join("bundle.json"), 10);
    let report = MigrationPipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.summaries_fetched, 10);
    assert_eq!(
        report.anomalies,
        vec![Anomaly::CountMismatch {
            declared_total: 5,
            fetched: 10
        }]
    );
}

#[tokio::test]
async fn test_progress_events_over_http() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_listing(&server, &products(3), 3, 2).await;
    for code in ["P0000", "P0001", "P0002"] {
        mount_detail(&server, code).await;
    }

    let config = mock_config(&server.uri(), &temp_dir.path().join("bundle.json"), 2);
    let pipeline = MigrationPipeline::new(config).unwrap();
    let mut rx = pipeline.subscribe();
    let report = pipeline.run().await.unwrap();

    let mut pages = 0;
    let mut details = 0;
    let mut written = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            MigrationEvent::PageFetched { .. } => pages += 1,
            MigrationEvent::DetailFetched { .. } => details += 1,
            MigrationEvent::BundleWritten { size_bytes, .. } => {
                assert_eq!(size_bytes, report.bundle_size_bytes);
                written = true;
            }
            _ => {}
        }
    }
    assert_eq!(pages, 2);
    assert_eq!(details, 3);
    assert!(written);
}
