//! Integration tests for `HttpSource` against a local HTTP server.
//!
//! Uses `wiremock` so no real network traffic is made. Covers the happy
//! path and each failure class the adapter reports.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use uvdash::config::SourcesConfig;
use uvdash::data::{param, HttpSource, JsonSource};
use uvdash::types::FetchError;

fn test_source(timeout_secs: u64) -> HttpSource {
    let cfg = SourcesConfig {
        timeout_secs,
        user_agent: "uvdash-test/0.1".to_string(),
        ..SourcesConfig::default()
    };
    HttpSource::new(&cfg).expect("failed to build test HttpSource")
}

#[tokio::test]
async fn get_json_returns_decoded_body_and_sends_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("past_days", "10"))
        .and(query_param("timezone", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "daily": { "time": [] } })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/v1/forecast", server.uri());
    let body = test_source(5)
        .get_json(&url, vec![param("past_days", 10), param("timezone", "auto")])
        .await
        .expect("expected Ok");

    assert_eq!(body, json!({ "daily": { "time": [] } }));
}

#[tokio::test]
async fn get_json_maps_non_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let url = format!("{}/v1/archive", server.uri());
    let err = test_source(5).get_json(&url, Vec::new()).await.unwrap_err();

    assert_eq!(err, FetchError::Status { endpoint: url, status: 500 });
    assert_eq!(err.kind(), "transport");
}

#[tokio::test]
async fn get_json_maps_invalid_body_to_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/dolar"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let url = format!("{}/api/dolar", server.uri());
    let err = test_source(5).get_json(&url, Vec::new()).await.unwrap_err();

    assert_eq!(err.kind(), "parse");
    assert!(err.to_string().contains("invalid JSON"), "got: {err}");
}

#[tokio::test]
async fn get_json_times_out_as_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/v1/archive", server.uri());
    let err = test_source(1).get_json(&url, Vec::new()).await.unwrap_err();

    match err {
        FetchError::Transport { message, .. } => {
            assert!(message.starts_with("timed out"), "got: {message}")
        }
        other => panic!("expected Transport, got {other:?}"),
    }
}
