//! WebDAV request execution.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use davgit_core::{LinkContext, LinkConverter};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use super::error::WebDavError;
use super::lock::{lock_discovery, marker_path, new_token, parse_lockinfo};
use super::method::WebDavMethod;
use super::props::{collect_entries, multistatus, parse_propfind};
use crate::extractors::depth::Depth;
use crate::metrics::webdav::record_operation;

/// Largest PROPFIND or LOCK body accepted.
pub const MAX_XML_BODY: usize = 1024 * 1024;

const XML_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";
const DAV_HEADER: HeaderName = HeaderName::from_static("dav");
const LOCK_TOKEN_HEADER: HeaderName = HeaderName::from_static("lock-token");
const DESTINATION_HEADER: HeaderName = HeaderName::from_static("destination");

/// Executes WebDAV methods against the repository tree.
#[derive(Clone)]
pub struct WebDavEngine {
    converter: Arc<dyn LinkConverter>,
}

impl WebDavEngine {
    pub fn new(converter: Arc<dyn LinkConverter>) -> Self {
        Self { converter }
    }

    /// Runs `method` on the resource of `ctx`.
    #[instrument(skip_all, fields(method = %method, path = %ctx.current_path()))]
    pub async fn handle(
        &self,
        method: &Method,
        ctx: &LinkContext,
        headers: &HeaderMap,
        depth: Depth,
        body: Body,
    ) -> Result<Response, WebDavError> {
        let method = WebDavMethod::from_method(method)?;

        let result = match method {
            WebDavMethod::Options => Ok(self.options()),
            WebDavMethod::Propfind => self.propfind(ctx, depth, body).await,
            WebDavMethod::Mkcol => self.mkcol(ctx).await,
            WebDavMethod::Lock => self.lock(ctx, body).await,
            WebDavMethod::Unlock => self.unlock(ctx).await,
            WebDavMethod::Put => self.put(ctx, body).await,
            WebDavMethod::Move => self.move_resource(ctx, headers).await,
        };

        let status = match &result {
            Ok(response) => response.status(),
            Err(e) => e.status(),
        };
        record_operation(method, status);
        result
    }

    /// Advertises the supported methods and DAV compliance classes.
    pub fn options(&self) -> Response {
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        if let Ok(allow) = HeaderValue::from_str(&WebDavMethod::allow_header()) {
            headers.insert(header::ALLOW, allow);
        }
        headers.insert(DAV_HEADER, HeaderValue::from_static("1, 2"));
        response
    }

    /// Lists properties of the resource and, depending on `Depth`, its
    /// descendants.
    pub async fn propfind(
        &self,
        ctx: &LinkContext,
        depth: Depth,
        body: Body,
    ) -> Result<Response, WebDavError> {
        let body = read_xml_body(body).await?;
        let requested = parse_propfind(&body)?;

        let path = ctx.current_fs_path().to_path_buf();
        let entries = tokio::task::spawn_blocking(move || collect_entries(&path, depth.levels()))
            .await
            .map_err(|e| WebDavError::failed(format!("listing task failed: {e}")))?
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => WebDavError::not_found("resource does not exist"),
                _ => WebDavError::failed(e.to_string()),
            })?;

        debug!(entries = entries.len(), depth = depth.levels(), "PROPFIND listing");
        let document = multistatus(self.converter.as_ref(), &entries, &requested);

        Ok((
            StatusCode::MULTI_STATUS,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            document.to_document(true),
        )
            .into_response())
    }

    /// Creates the collection. Succeeds when it already exists; the parent
    /// must exist.
    pub async fn mkcol(&self, ctx: &LinkContext) -> Result<Response, WebDavError> {
        let path = ctx.current_fs_path();
        match tokio::fs::create_dir(path).await {
            Ok(()) => info!(path = %path.display(), "Collection created"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
                debug!(path = %path.display(), "Collection already exists");
            },
            Err(e) => return Err(fs_failure("create directory", path, e)),
        }
        Ok(StatusCode::CREATED.into_response())
    }

    /// Replaces the file with the request body.
    pub async fn put(&self, ctx: &LinkContext, body: Body) -> Result<Response, WebDavError> {
        let path = ctx.current_fs_path();
        if path.is_dir() {
            return Err(WebDavError::failed("cannot PUT onto a collection"));
        }
        remove_existing_file(path).await?;
        create_parent(path).await?;

        if let Err(e) = write_body(path, body).await {
            if let Err(remove) = tokio::fs::remove_file(path).await {
                if remove.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %remove, "Failed to remove partial file");
                }
            }
            return Err(e);
        }

        info!(path = %path.display(), "File stored");
        Ok(StatusCode::CREATED.into_response())
    }

    /// Renames a file to the `Destination` link, replacing what is there.
    pub async fn move_resource(
        &self,
        ctx: &LinkContext,
        headers: &HeaderMap,
    ) -> Result<Response, WebDavError> {
        let destination = headers
            .get(&DESTINATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| WebDavError::failed("missing Destination header"))?;
        let target = self
            .converter
            .link_to_path(destination)
            .map(PathBuf::from)
            .map_err(|e| WebDavError::failed(e.to_string()))?;

        let source = ctx.current_fs_path();
        if !source.is_file() {
            return Err(WebDavError::failed("source is not a file"));
        }
        if target == source {
            return Err(WebDavError::failed("source and destination are the same"));
        }
        if target.is_dir() {
            return Err(WebDavError::failed("destination is a collection"));
        }

        remove_existing_file(&target).await?;
        create_parent(&target).await?;
        tokio::fs::rename(source, &target)
            .await
            .map_err(|e| fs_failure("rename", source, e))?;

        info!(from = %source.display(), to = %target.display(), "Resource moved");
        Ok(StatusCode::OK.into_response())
    }

    /// Writes a fresh lock marker and returns its token.
    pub async fn lock(&self, ctx: &LinkContext, body: Body) -> Result<Response, WebDavError> {
        let body = read_xml_body(body).await?;
        parse_lockinfo(&body)?;

        let marker = marker_path(ctx.current_fs_path());
        match tokio::fs::remove_file(&marker).await {
            Ok(()) => debug!(marker = %marker.display(), "Replaced stale lock"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => return Err(WebDavError::forbidden(format!("cannot remove lock: {e}"))),
        }

        let token = new_token();
        tokio::fs::write(&marker, &token)
            .await
            .map_err(|e| WebDavError::forbidden(format!("cannot create lock: {e}")))?;
        info!(marker = %marker.display(), "Lock acquired");

        let mut response = (
            StatusCode::OK,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            lock_discovery(Some(&token)).to_document(true),
        )
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&format!("<{token}>")) {
            response.headers_mut().insert(LOCK_TOKEN_HEADER, value);
        }
        Ok(response)
    }

    /// Removes the lock marker. Unlocking an unlocked resource succeeds.
    pub async fn unlock(&self, ctx: &LinkContext) -> Result<Response, WebDavError> {
        let marker = marker_path(ctx.current_fs_path());
        match tokio::fs::remove_file(&marker).await {
            Ok(()) => info!(marker = %marker.display(), "Lock released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => return Err(WebDavError::forbidden(format!("cannot remove lock: {e}"))),
        }

        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            lock_discovery(None).to_document(true),
        )
            .into_response())
    }
}

async fn read_xml_body(body: Body) -> Result<Vec<u8>, WebDavError> {
    let bytes = axum::body::to_bytes(body, MAX_XML_BODY)
        .await
        .map_err(|e| WebDavError::parsing_input(format!("cannot read body: {e}")))?;
    if bytes.is_empty() {
        return Err(WebDavError::parsing_input("missing body"));
    }
    Ok(bytes.to_vec())
}

async fn write_body(path: &Path, body: Body) -> Result<(), WebDavError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| fs_failure("create file", path, e))?;

    let mut stream = body.into_data_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| WebDavError::failed(format!("body read failed: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| fs_failure("write", path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| fs_failure("flush", path, e))?;

    debug!(path = %path.display(), bytes = written, "Body written");
    Ok(())
}

async fn remove_existing_file(path: &Path) -> Result<(), WebDavError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fs_failure("remove", path, e)),
    }
}

async fn create_parent(path: &Path) -> Result<(), WebDavError> {
    match path.parent() {
        Some(parent) if !parent.is_dir() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fs_failure("create parent of", path, e)),
        _ => Ok(()),
    }
}

fn fs_failure(action: &str, path: &Path, error: io::Error) -> WebDavError {
    warn!(path = %path.display(), error = %error, "Failed to {action}");
    WebDavError::failed(format!("{action} {}: {error}", path.display()))
}
