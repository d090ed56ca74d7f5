//! Mock source fixtures: listing records and wiremock route mounting

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A listing entry with localized text
pub fn product(code: &str, status: &str) -> Value {
    json!({
        "code": code,
        "status": status,
        "name": format!("Produit {code} — édition spéciale"),
    })
}

/// The detail document served for `code`
pub fn product_detail(code: &str) -> Value {
    json!({
        "code": code,
        "description": format!("Beschreibung für {code}: Größe, Gewicht, 価格"),
        "attributes": {"origin": "Curaçao", "weight_g": 125},
    })
}

/// `count` published products named `P0000`, `P0001`, ...
pub fn products(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| product(&format!("P{i:04}"), "published"))
        .collect()
}

/// Mount `/stats` answering `declared_total`, expected exactly once
pub async fn mount_stats(server: &MockServer, declared_total: u64) {
    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": declared_total})))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount `/list` pages slicing `records`, each expected exactly once
pub async fn mount_listing(server: &MockServer, records: &[Value], declared_total: u64, page_size: u32) {
    mount_stats(server, declared_total).await;

    let mut offset = 0u64;
    while offset < declared_total {
        let start = (offset as usize).min(records.len());
        let end = (start + page_size as usize).min(records.len());
        Mock::given(method("GET"))
            .and(path("/list"))
            .and(query_param("limit", page_size.to_string()))
            .and(query_param("offset", offset.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"results": &records[start..end]})),
            )
            .expect(1)
            .mount(server)
            .await;
        offset += u64::from(page_size);
    }
}

/// Mount a successful `/detail/{code}`, expected exactly once
pub async fn mount_detail(server: &MockServer, code: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/detail/{code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_detail(code)))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount a `/detail/{code}` that always fails with a JSON error body
pub async fn mount_failing_detail(server: &MockServer, code: &str, attempts: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/detail/{code}")))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "detail backend unavailable"})),
        )
        .expect(attempts)
        .mount(server)
        .await;
}
