//! HTTP metrics middleware.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use davgit_core::path::{GitService, is_git_protocol_path};
use metrics::{counter, histogram};
use std::time::Instant;

/// Middleware que registra metricas HTTP para cada request.
pub async fn http_metrics_middleware(
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = match matched_path {
        Some(path) => path.as_str().to_string(),
        None => route_label(request.method(), request.uri().path(), request.uri().query())
            .to_string(),
    };

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    let duration = start.elapsed();

    // Registrar metricas
    counter!(
        "davgit_http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "davgit_http_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(duration.as_secs_f64());

    response
}

/// Etiqueta de baja cardinalidad para requests sin ruta explicita.
pub fn route_label(method: &Method, path: &str, query: Option<&str>) -> &'static str {
    match *method {
        Method::GET | Method::HEAD | Method::POST => {
            if *method == Method::POST
                || GitService::from_query(query).is_some()
                || is_git_protocol_path(path)
            {
                "git"
            } else {
                "static"
            }
        },
        _ => "webdav",
    }
}

/// Registra las metricas HTTP
pub fn register_http_metrics() {
    metrics::describe_counter!(
        "davgit_http_requests_total",
        "Total number of HTTP requests"
    );
    metrics::describe_histogram!(
        "davgit_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
}
