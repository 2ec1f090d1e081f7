//! Tests del endpoint /health.

mod helpers;

use axum::http::StatusCode;
use davgit_server::HealthResponse;
use helpers::{Fixture, client};
use serde_json::Value;

#[tokio::test]
async fn stateless_health_reports_up() {
    let response = client().get("/health").await;

    response
        .assert_status(StatusCode::OK)
        .assert_content_type_contains("application/json");
    assert_eq!(response.json::<Value>(), serde_json::json!({ "status": "UP" }));
}

#[test]
fn health_response_omits_unknown_fields() {
    let json = serde_json::to_string(&HealthResponse::default()).unwrap();

    assert_eq!(json, r#"{"status":"UP"}"#);
}

#[tokio::test]
async fn health_is_served_before_repository_dispatch() {
    let fixture = Fixture::new();

    let response = fixture.client().get("/health").await;

    response.assert_status(StatusCode::OK);
    let health = response.json::<Value>();
    assert_eq!(health["status"], "UP");
    assert_eq!(health["repository_root"], true);
}

#[tokio::test]
async fn health_stays_up_without_backend() {
    let fixture = Fixture::new();

    let health = fixture.client().get("/health").await.json::<Value>();

    assert_eq!(health["status"], "UP");
    assert_eq!(health["smart_http"], false);
}

#[tokio::test]
async fn health_reports_missing_root() {
    let fixture = Fixture::new();
    let client = fixture.client();
    std::fs::remove_dir(fixture.root()).unwrap();

    let health = client.get("/health").await.json::<Value>();

    assert_eq!(health["status"], "UP");
    assert_eq!(health["repository_root"], false);
}

#[cfg(unix)]
#[tokio::test]
async fn health_reports_available_backend() {
    let bin = tempfile::tempdir().unwrap();
    let backend = helpers::fixture::script(bin.path(), "git-http-backend", "exit 0");
    let fixture = Fixture::with_backend(backend);

    let health = fixture.client().get("/health").await.json::<Value>();

    assert_eq!(health["smart_http"], true);
}
