//! Git HTTP backend execution.
//!
//! Runs `git-http-backend` as a CGI program for one request: the request
//! is described by a [`CgiRequest`], its body is streamed to the backend's
//! stdin from a separate task, and the CGI response on stdout is split
//! into status, headers and a streaming [`BackendBody`].

use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use indexmap::IndexMap;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, Chain, ReadBuf};
use tokio::process::ChildStdout;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cgi::{CgiHeader, parse_header};
use crate::config::BackendConfig;
use crate::error::{BackendError, ProcessError};
use crate::process::ProcessHandle;

/// Largest header block accepted from the backend.
const MAX_HEADER_SIZE: usize = 64 * 1024;

/// The parts of an HTTP request handed to the backend as CGI variables.
#[derive(Debug, Clone, Default)]
pub struct CgiRequest {
    pub method: String,
    pub query_string: String,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub request_uri: String,
    pub server_protocol: String,
    pub remote_addr: Option<String>,
    pub remote_user: Option<String>,
    /// Request headers, mirrored as `HTTP_*` variables.
    pub headers: Vec<(String, String)>,
    /// Root directory served by the server.
    pub document_root: String,
    /// Repository directory; the backend runs here.
    pub repository_path: String,
    /// Path below the repository, e.g. `/info/refs`.
    pub path_info: String,
}

impl CgiRequest {
    /// Builds the CGI environment for this request.
    pub fn environment(&self) -> IndexMap<String, String> {
        let mut env = IndexMap::new();

        for (name, value) in &self.headers {
            let key = format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"));
            // Content type and length have dedicated variables.
            if key == "HTTP_CONTENT_TYPE" || key == "HTTP_CONTENT_LENGTH" {
                continue;
            }
            env.insert(key, value.clone());
        }

        env.insert("GATEWAY_INTERFACE".into(), "CGI/1.1".into());
        env.insert("REQUEST_METHOD".into(), self.method.clone());
        env.insert("QUERY_STRING".into(), self.query_string.clone());
        env.insert("REQUEST_URI".into(), self.request_uri.clone());
        env.insert("SERVER_PROTOCOL".into(), self.server_protocol.clone());
        env.insert("DOCUMENT_ROOT".into(), self.document_root.clone());
        env.insert("CONTEXT_DOCUMENT_ROOT".into(), self.document_root.clone());
        env.insert("GIT_PROJECT_ROOT".into(), self.repository_path.clone());
        env.insert("GIT_HTTP_EXPORT_ALL".into(), String::new());
        env.insert("PATH_INFO".into(), self.path_info.clone());
        if let Some(content_type) = &self.content_type {
            env.insert("CONTENT_TYPE".into(), content_type.clone());
        }
        if let Some(length) = self.content_length {
            env.insert("CONTENT_LENGTH".into(), length.to_string());
        }
        if let Some(addr) = &self.remote_addr {
            env.insert("REMOTE_ADDR".into(), addr.clone());
        }
        if let Some(user) = &self.remote_user {
            env.insert("REMOTE_USER".into(), user.clone());
        }
        env
    }
}

/// Status, headers and body of a backend response.
pub struct BackendResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BackendBody,
}

impl std::fmt::Debug for BackendResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Streaming body of a backend response.
///
/// Yields the bytes that followed the header block, then the rest of the
/// backend's stdout. Dropping the body before the end kills the backend.
pub struct BackendBody {
    reader: Chain<Cursor<Vec<u8>>, BufReader<ChildStdout>>,
    cancel: Option<oneshot::Sender<()>>,
    finished: bool,
}

impl AsyncRead for BackendBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.reader).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            if buf.filled().len() == before && buf.remaining() > 0 {
                this.finished = true;
            }
        }
        poll
    }
}

impl Drop for BackendBody {
    fn drop(&mut self) {
        if !self.finished {
            if let Some(cancel) = self.cancel.take() {
                let _ = cancel.send(());
            }
        }
    }
}

/// Runs `git-http-backend` for single requests.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: BackendConfig,
}

impl HttpBackend {
    /// Creates a backend runner from configuration.
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Returns true if a backend executable can be located.
    pub fn is_available(&self) -> bool {
        self.config.resolve_http_backend().is_some()
    }

    /// Executes the backend for `request`, streaming `body` to its stdin.
    ///
    /// Returns once the CGI header block has been read; the body streams
    /// afterwards. The header phase is bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// [`BackendError::is_unavailable`] is true when the backend could not
    /// be started at all.
    pub async fn exec<R>(
        &self,
        request: &CgiRequest,
        body: Option<R>,
    ) -> Result<BackendResponse, BackendError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let executable = self
            .config
            .resolve_http_backend()
            .ok_or(BackendError::NotAvailable)?;

        let mut process = ProcessHandle::new(&executable, &request.repository_path)
            .clear_env(true)
            .envs(request.environment());
        process.start(Vec::<&str>::new())?;

        debug!(
            method = %request.method,
            path_info = %request.path_info,
            repository = %request.repository_path,
            "Backend started"
        );

        match (body, process.take_stdin()) {
            (Some(mut body), Some(mut stdin)) => {
                tokio::spawn(async move {
                    match tokio::io::copy(&mut body, &mut stdin).await {
                        Ok(bytes) => debug!(bytes, "Request body sent to backend"),
                        Err(e) => warn!(error = %e, "Failed to stream request body to backend"),
                    }
                });
            },
            (_, stdin) => drop(stdin),
        }

        let mut stdout = process.take_stdout().ok_or(ProcessError::StdoutTaken)?;
        let limit = self.config.timeout();
        let (header, buffer) = match tokio::time::timeout(limit, read_header(&mut stdout)).await {
            Ok(result) => result?,
            Err(_) => {
                process.kill().await?;
                return Err(ProcessError::timeout(limit).into());
            },
        };

        if !header.is_terminated() {
            let stderr = process.stderr_output().await;
            warn!(
                stderr = %String::from_utf8_lossy(&stderr).trim_end(),
                "Backend output has no header terminator"
            );
            return Err(BackendError::protocol(if buffer.is_empty() {
                "backend produced no output"
            } else {
                "missing blank line after headers"
            }));
        }

        let status = header.status()?.unwrap_or(200);
        let headers = header.fields()?;
        let leftover = buffer[header.body_offset()..].to_vec();

        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(reap(process, cancel_rx));

        Ok(BackendResponse {
            status,
            headers,
            body: BackendBody {
                reader: Cursor::new(leftover).chain(stdout),
                cancel: Some(cancel_tx),
                finished: false,
            },
        })
    }
}

/// Reads stdout until the CGI header block is complete or EOF.
async fn read_header(
    stdout: &mut BufReader<ChildStdout>,
) -> Result<(CgiHeader, Vec<u8>), BackendError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = stdout.read(&mut chunk).await.map_err(ProcessError::from)?;
        if read == 0 {
            return Ok((parse_header(&buffer), buffer));
        }
        buffer.extend_from_slice(&chunk[..read]);

        let header = parse_header(&buffer);
        if header.is_terminated() {
            return Ok((header, buffer));
        }
        if buffer.len() > MAX_HEADER_SIZE {
            return Err(BackendError::protocol("header block too large"));
        }
    }
}

/// Waits for the backend to exit, or kills it when the client goes away.
async fn reap(mut process: ProcessHandle, cancel: oneshot::Receiver<()>) {
    tokio::select! {
        result = process.wait_finished(None) => match result {
            Ok(0) => debug!("Backend finished"),
            Ok(code) => {
                let stderr = process.stderr_output().await;
                warn!(
                    code,
                    stderr = %String::from_utf8_lossy(&stderr).trim_end(),
                    "Backend exited with an error"
                );
            },
            Err(e) => warn!(error = %e, "Failed to wait for backend"),
        },
        Ok(()) = cancel => {
            info!("Response body dropped, stopping backend");
            if let Err(e) = process.kill().await {
                warn!(error = %e, "Failed to kill backend");
            }
        },
    }
}
