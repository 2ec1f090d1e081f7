use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use super::error::WebDavError;

/// Methods handled by the WebDAV engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebDavMethod {
    Propfind,
    Mkcol,
    Lock,
    Unlock,
    Put,
    Move,
    Options,
}

impl WebDavMethod {
    /// All supported methods, in `Allow` header order.
    pub const ALL: [WebDavMethod; 7] = [
        Self::Propfind,
        Self::Mkcol,
        Self::Lock,
        Self::Unlock,
        Self::Put,
        Self::Move,
        Self::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Propfind => "PROPFIND",
            Self::Mkcol => "MKCOL",
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
            Self::Put => "PUT",
            Self::Move => "MOVE",
            Self::Options => "OPTIONS",
        }
    }

    pub fn from_method(method: &Method) -> Result<Self, WebDavError> {
        method.as_str().parse()
    }

    /// Value of the `Allow` header.
    pub fn allow_header() -> String {
        Self::ALL
            .iter()
            .map(WebDavMethod::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for WebDavMethod {
    type Err = WebDavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| WebDavError::invalid_method(s))
    }
}

impl fmt::Display for WebDavMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
