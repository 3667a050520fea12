//! Integration tests for the Vultr API client
//!
//! Tests the client stack as the server builds it from configuration:
//! config file -> retry policy + response cache -> client -> mock transport

use reqwest::Method;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use vultr_mcp::cache::ResponseCache;
use vultr_mcp::client::{MockTransport, RecordRequest};
use vultr_mcp::config::Config;
use vultr_mcp::retry::RetryPolicy;
use vultr_mcp::{ApiError, VultrClient};

const TEST_CONFIG: &str = r#"
[api]
per_page = 2

[cache]
enabled = true
max_size = 100

[retry]
max_attempts = 3
min_wait_ms = 1
max_wait_ms = 5
multiplier = 2.0
jitter = false
"#;

async fn load_test_config() -> Config {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(TEST_CONFIG.as_bytes()).unwrap();
    Config::load(file.path()).await.unwrap()
}

/// Build a client the way `VultrClient::from_config` does, over a mock transport
async fn configured_client() -> (Arc<MockTransport>, VultrClient) {
    let config = load_test_config().await;
    let mock = Arc::new(MockTransport::new());
    let client = VultrClient::new(mock.clone())
        .with_retry(RetryPolicy::from(&config.retry))
        .with_per_page(config.api.per_page)
        .with_cache(Arc::new(ResponseCache::new(&config.cache)));
    (mock, client)
}

fn page(items: Value, next: &str) -> Value {
    json!({"records": items, "meta": {"total": 3, "links": {"next": next, "prev": ""}}})
}

/// Test that a config file on disk is loaded with its overrides and defaults
#[tokio::test]
async fn test_config_file_loading() {
    let config = load_test_config().await;

    assert_eq!(config.api.per_page, 2);
    assert_eq!(config.api.base_url, "https://api.vultr.com/v2");
    assert!(config.cache.enabled);
    assert_eq!(config.retry.max_attempts, 3);
    assert!(!config.retry.jitter);
    assert_eq!(config.mcp.name, "mcp-vultr");

    let missing = Config::load("/nonexistent/vultr-mcp.toml").await;
    assert!(missing.is_err());
}

/// Test that list calls follow cursors until the last page
#[tokio::test]
async fn test_list_follows_cursors() {
    let (mock, client) = configured_client().await;
    mock.on_query(
        Method::GET,
        "/domains/example.com/records",
        &[("per_page", "2")],
        200,
        page(json!([{"id": "r-1"}, {"id": "r-2"}]), "c2"),
    );
    mock.on_query(
        Method::GET,
        "/domains/example.com/records",
        &[("per_page", "2"), ("cursor", "c2")],
        200,
        page(json!([{"id": "r-3"}]), ""),
    );

    let records = client.list_records("example.com").await.unwrap();
    let ids: Vec<&str> = records.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["r-1", "r-2", "r-3"]);

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1]
        .query
        .contains(&("cursor".to_string(), "c2".to_string())));
}

/// Test that GETs are served from cache and writes invalidate them
#[tokio::test]
async fn test_cache_hits_and_write_invalidation() {
    let (mock, client) = configured_client().await;
    mock.on(
        Method::GET,
        "/domains/example.com/records",
        200,
        page(json!([{"id": "r-1", "type": "A", "name": "", "data": "192.0.2.1"}]), ""),
    );
    mock.on(
        Method::POST,
        "/domains/example.com/records",
        201,
        json!({"record": {"id": "r-2", "type": "A", "name": "www", "data": "192.0.2.2"}}),
    );

    client.list_records("example.com").await.unwrap();
    client.list_records("example.com").await.unwrap();
    assert_eq!(mock.count(Method::GET, "/domains/example.com/records"), 1);

    let stats = client.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.sets, 1);

    let created = client
        .create_record(
            "example.com",
            &RecordRequest {
                record_type: "A".to_string(),
                name: "www".to_string(),
                data: "192.0.2.2".to_string(),
                ttl: Some(300),
                priority: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(created["id"], "r-2");

    client.list_records("example.com").await.unwrap();
    assert_eq!(mock.count(Method::GET, "/domains/example.com/records"), 2);

    client.clear_cache(None);
    client.list_records("example.com").await.unwrap();
    assert_eq!(mock.count(Method::GET, "/domains/example.com/records"), 3);
}

/// Test that transient server errors are retried up to the configured limit
#[tokio::test]
async fn test_retry_on_server_errors() {
    let (mock, client) = configured_client().await;
    mock.on(Method::GET, "/regions", 500, json!({"error": "temporarily unavailable"}));
    mock.on(
        Method::GET,
        "/regions",
        200,
        json!({"regions": [{"id": "ewr", "city": "New Jersey"}], "meta": {"links": {"next": ""}}}),
    );

    let regions = client.list_regions().await.unwrap();
    assert_eq!(regions[0]["id"], "ewr");
    assert_eq!(mock.count(Method::GET, "/regions"), 2);

    mock.on(Method::GET, "/ssh-keys", 503, json!({"error": "down"}));
    let err = client.list_ssh_keys().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
    assert_eq!(mock.count(Method::GET, "/ssh-keys"), 3);
}

/// Test that client errors map to typed errors without retries
#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (mock, client) = configured_client().await;
    mock.on(Method::GET, "/instances/gone", 404, json!({"error": "Not found"}));
    mock.on(Method::POST, "/domains", 400, json!({"error": "Invalid domain"}));

    let err = client.get_instance("gone").await.unwrap_err();
    assert_eq!(err, ApiError::NotFound);
    assert_eq!(mock.count(Method::GET, "/instances/gone"), 1);

    let err = client
        .create_domain(&vultr_mcp::client::CreateDomainRequest {
            domain: "bad..example".to_string(),
            ip: None,
            dns_sec: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation { status: 400, .. }));
    assert!(err.to_string().contains("Invalid domain"));
    assert_eq!(mock.count(Method::POST, "/domains"), 1);
}

/// Test zone import in dry-run and live modes
#[tokio::test]
async fn test_zone_import() {
    let (mock, client) = configured_client().await;
    let zone = "$TTL 600\n\
                ; web servers\n\
                www IN A 192.0.2.10\n\
                @ 3600 IN MX 10 mail.example.com.\n\
                mail IN MX x mail.example.com\n";

    let planned = client.import_zone_file("example.com", zone, true).await.unwrap();
    assert_eq!(planned.len(), 3);
    assert_eq!(planned[0]["action"], "create");
    assert_eq!(planned[0]["ttl"], 600);
    assert_eq!(planned[1]["priority"], 10);
    assert_eq!(planned[2]["line"], "mail IN MX x mail.example.com");
    assert!(mock.requests().is_empty());

    mock.on(
        Method::POST,
        "/domains/example.com/records",
        201,
        json!({"record": {"id": "r-10", "type": "A", "name": "www"}}),
    );
    mock.on(Method::POST, "/domains/example.com/records", 422, json!({"error": "Duplicate record"}));

    let results = client.import_zone_file("example.com", zone, false).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["id"], "r-10");
    assert!(results[1]["error"].as_str().unwrap().contains("Duplicate record"));
    assert_eq!(mock.count(Method::POST, "/domains/example.com/records"), 2);
}
