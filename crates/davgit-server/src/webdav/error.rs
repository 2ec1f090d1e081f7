//! WebDAV error codes.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Why a WebDAV request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebDavErrorCode {
    Unknown,
    InvalidMethod,
    ParsingInput,
    MethodNotMatchingInputData,
    UnknownInputData,
}

impl WebDavErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::InvalidMethod => "InvalidMethod",
            Self::ParsingInput => "ParsingInput",
            Self::MethodNotMatchingInputData => "MethodNotMatchingInputData",
            Self::UnknownInputData => "UnknownInputData",
        }
    }
}

impl fmt::Display for WebDavErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed WebDAV operation. Rendered as a bare status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct WebDavError {
    code: WebDavErrorCode,
    status: StatusCode,
    message: String,
}

impl WebDavError {
    pub fn new(code: WebDavErrorCode, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    pub fn invalid_method(method: &str) -> Self {
        Self::new(
            WebDavErrorCode::InvalidMethod,
            StatusCode::NOT_ACCEPTABLE,
            format!("unsupported method {method}"),
        )
    }

    pub fn parsing_input(message: impl Into<String>) -> Self {
        Self::new(
            WebDavErrorCode::ParsingInput,
            StatusCode::BAD_REQUEST,
            message,
        )
    }

    pub fn not_matching(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(WebDavErrorCode::MethodNotMatchingInputData, status, message)
    }

    pub fn unknown_input(message: impl Into<String>) -> Self {
        Self::new(
            WebDavErrorCode::UnknownInputData,
            StatusCode::BAD_REQUEST,
            message,
        )
    }

    /// A filesystem operation failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(
            WebDavErrorCode::Unknown,
            StatusCode::NOT_ACCEPTABLE,
            message,
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(WebDavErrorCode::Unknown, StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(WebDavErrorCode::Unknown, StatusCode::NOT_FOUND, message)
    }

    pub fn code(&self) -> WebDavErrorCode {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for WebDavError {
    fn into_response(self) -> Response {
        tracing::debug!(
            code = %self.code,
            status = self.status.as_u16(),
            message = %self.message,
            "WebDAV request rejected"
        );
        self.status.into_response()
    }
}
