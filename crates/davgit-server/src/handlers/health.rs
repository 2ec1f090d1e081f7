//! Liveness endpoint.

use std::path::Path;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether `git-http-backend` can be started; absent without state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_http: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_root: Option<bool>,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "UP",
            smart_http: None,
            repository_root: None,
        }
    }
}

/// Reports liveness only.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Reports liveness plus backend and root availability.
///
/// The service stays `UP` without a backend: the dumb protocol and WebDAV
/// keep working.
pub async fn repository_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        smart_http: Some(state.backend().is_available()),
        repository_root: Some(Path::new(state.converter().root_path()).is_dir()),
        ..HealthResponse::default()
    })
}
