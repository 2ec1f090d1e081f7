//! Git backend relay and static file serving.

use std::io;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderName, HeaderValue, Method, StatusCode, header, request::Parts},
    response::Response,
};
use davgit_core::{DavGitError, LinkContext};
use davgit_git::{BackendError, BackendResponse, CgiRequest};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::metrics::backend::{SpawnOutcome, record_spawn};
use crate::state::AppState;

const OCTET_STREAM: &str = "application/octet-stream";

/// Runs `git-http-backend` for `request` and relays its response.
///
/// POST bodies are streamed to the backend's stdin. The response body is
/// streamed from its stdout and dropped for HEAD requests.
pub async fn exec_backend(
    state: &AppState,
    ctx: &LinkContext,
    user: Option<String>,
    request: Request,
) -> Result<Response, BackendError> {
    let (parts, body) = request.into_parts();
    let cgi = cgi_request(&parts, ctx, user);

    let input = (parts.method == Method::POST)
        .then(|| StreamReader::new(body.into_data_stream().map_err(io::Error::other)));

    let response = match state.backend().exec(&cgi, input).await {
        Ok(response) => {
            record_spawn(SpawnOutcome::Started);
            response
        },
        Err(e) => {
            record_spawn(if e.is_unavailable() {
                SpawnOutcome::Unavailable
            } else {
                SpawnOutcome::Failed
            });
            return Err(e);
        },
    };

    debug!(status = response.status, headers = response.headers.len(), "Backend responded");
    relay(response, parts.method == Method::HEAD)
}

/// Describes the request in CGI terms.
fn cgi_request(parts: &Parts, ctx: &LinkContext, user: Option<String>) -> CgiRequest {
    let header_value = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    CgiRequest {
        method: parts.method.to_string(),
        query_string: parts.uri.query().unwrap_or_default().to_string(),
        content_type: header_value(header::CONTENT_TYPE),
        content_length: header_value(header::CONTENT_LENGTH).and_then(|v| v.parse().ok()),
        request_uri: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string()),
        server_protocol: format!("{:?}", parts.version),
        remote_addr: parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
        remote_user: user,
        headers: parts
            .headers
            .iter()
            // Credentials are not passed on to the backend.
            .filter(|(name, _)| *name != header::AUTHORIZATION)
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
        document_root: ctx.root_path().to_string(),
        repository_path: ctx
            .repository_path()
            .unwrap_or(ctx.root_path())
            .to_string(),
        path_info: ctx.path_in_repository().to_string(),
    }
}

fn relay(response: BackendResponse, is_head: bool) -> Result<Response, BackendError> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|_| BackendError::protocol(format!("invalid status {}", response.status)))?;

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => builder = builder.header(name, value),
            _ => warn!(header = %name, "Dropping invalid backend header"),
        }
    }

    let body = if is_head {
        Body::empty()
    } else {
        Body::from_stream(ReaderStream::new(response.body))
    };
    builder
        .body(body)
        .map_err(|e| BackendError::protocol(e.to_string()))
}

/// Serves the context's file as raw bytes, or 404.
pub async fn serve_static(ctx: &LinkContext, is_head: bool) -> Result<Response, AppError> {
    let path = ctx.current_fs_path();
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(AppError::NotFound),
    };

    let body = if is_head {
        Body::empty()
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|_| AppError::NotFound)?;
        Body::from_stream(ReaderStream::new(file))
    };

    debug!(path = %path.display(), bytes = metadata.len(), "Serving static file");
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, OCTET_STREAM)
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(body)
        .map_err(|e| DavGitError::internal(e.to_string()).into())
}
