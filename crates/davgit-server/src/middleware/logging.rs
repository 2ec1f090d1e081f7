//! Middleware de logging estructurado.

use axum::{
    body::Body,
    http::{HeaderName, Request, Response, header},
};
use std::{
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{Instrument, info, info_span, warn};

use super::request_id::RequestId;
use crate::metrics::http::route_label;

/// Sent by Git clients that speak protocol v2.
const GIT_PROTOCOL_HEADER: HeaderName = HeaderName::from_static("git-protocol");

/// Layer that logs requests and responses.
#[derive(Clone, Default)]
pub struct LoggingLayer;

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddleware { inner }
    }
}

/// Middleware that opens one span per request and logs its outcome.
#[derive(Clone)]
pub struct LoggingMiddleware<S> {
    inner: S,
}

fn header_str<'a>(request: &'a Request<Body>, name: &HeaderName) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

impl<S> Service<Request<Body>> for LoggingMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let start = Instant::now();
        let kind = route_label(request.method(), request.uri().path(), request.uri().query());
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let span = info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
            kind,
            user_agent = %header_str(&request, &header::USER_AGENT),
            git_protocol = %header_str(&request, &GIT_PROTOCOL_HEADER),
        );

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                info!("Request started");

                let response = inner.call(request).await?;

                let status = response.status();
                let duration_ms = start.elapsed().as_millis() as u64;
                // Streamed backend bodies have no length yet.
                let length = response
                    .headers()
                    .get(header::CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                if status.is_server_error() {
                    warn!(status = status.as_u16(), duration_ms, length, "Request failed");
                } else {
                    info!(status = status.as_u16(), duration_ms, length, "Request completed");
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}
