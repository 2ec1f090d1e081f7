//! Error types for DavGit.
//!
//! This module defines the error hierarchy shared by the server and the
//! Git bridge. All errors implement `std::error::Error` via `thiserror`.
//!
//! # Error Handling Philosophy
//!
//! - Functions that can fail return `Result<T, DavGitError>`
//! - Nothing is retried: every operation is attempted once and its
//!   outcome is final for the request
//! - Errors are mapped to an HTTP status at the server boundary with
//!   [`DavGitError::status_code`]
//!
//! # Example
//!
//! ```
//! use davgit_core::{DavGitError, Result};
//!
//! fn repository_name(path: &str) -> Result<&str> {
//!     path.rsplit('/')
//!         .find(|segment| segment.ends_with(".git"))
//!         .ok_or_else(|| DavGitError::path_validation(path, "no repository segment"))
//! }
//!
//! assert_eq!(repository_name("/srv/git/demo.git/HEAD").unwrap(), "demo.git");
//! assert!(repository_name("/srv/git/readme").is_err());
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for DavGit operations.
#[derive(Debug, Error)]
pub enum DavGitError {
    /// The path escapes the root or does not match the repository grammar.
    #[error("Invalid path '{path}': {reason}")]
    PathValidation {
        /// The rejected path or link
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// The repository directory does not exist.
    #[error("Repository not found: {0}")]
    RepositoryNotFound(PathBuf),

    /// The backend could not be started (missing executable or working directory).
    #[error("Failed to spawn '{program}': {message}")]
    ProcessSpawn {
        /// Executable that failed to start
        program: String,
        /// Description of the failure
        message: String,
    },

    /// The backend produced a malformed CGI header block.
    #[error("Backend protocol error: {0}")]
    BackendProtocol(String),

    /// A WebDAV request body is missing, malformed or asks for nothing.
    #[error("WebDAV input error: {0}")]
    WebDavInput(String),

    /// A filesystem create/delete/rename/write failed.
    #[error("Filesystem error on '{}': {source}", path.display())]
    Filesystem {
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Credentials are required but were not presented or are invalid.
    #[error("Authentication required for realm '{realm}'")]
    AuthRequired {
        /// Basic auth realm to challenge with
        realm: String,
    },

    /// Credentials are valid but lack the required privilege.
    #[error("Access denied: {0}")]
    AuthDenied(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DavGitError {
    // ============================================
    // Convenience constructors
    // ============================================

    /// Creates a PathValidation error.
    ///
    /// # Example
    ///
    /// ```
    /// use davgit_core::DavGitError;
    ///
    /// let error = DavGitError::path_validation("/etc/passwd", "outside of root");
    /// assert!(error.is_path_validation());
    /// assert_eq!(error.status_code(), 406);
    /// ```
    pub fn path_validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathValidation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a RepositoryNotFound error.
    pub fn repository_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RepositoryNotFound(path.into())
    }

    /// Creates a ProcessSpawn error.
    pub fn process_spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Creates a BackendProtocol error.
    pub fn backend_protocol(message: impl Into<String>) -> Self {
        Self::BackendProtocol(message.into())
    }

    /// Creates a WebDavInput error.
    pub fn webdav_input(message: impl Into<String>) -> Self {
        Self::WebDavInput(message.into())
    }

    /// Creates a Filesystem error.
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Creates an AuthRequired error.
    pub fn auth_required(realm: impl Into<String>) -> Self {
        Self::AuthRequired {
            realm: realm.into(),
        }
    }

    /// Creates an AuthDenied error.
    pub fn auth_denied(message: impl Into<String>) -> Self {
        Self::AuthDenied(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================
    // Query methods
    // ============================================

    /// Returns true if the path was rejected.
    pub fn is_path_validation(&self) -> bool {
        matches!(self, Self::PathValidation { .. })
    }

    /// Returns true if the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RepositoryNotFound(_))
    }

    /// Returns true if the backend could not be started.
    ///
    /// Callers may fall back to static file serving for these.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::ProcessSpawn { .. })
    }

    /// Returns true if this is an authentication or authorization failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthRequired { .. } | Self::AuthDenied(_))
    }

    /// Returns true if this error was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns the HTTP status code this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PathValidation { .. } => 406,
            Self::RepositoryNotFound(_) => 404,
            Self::ProcessSpawn { .. } => 404,
            Self::BackendProtocol(_) => 502,
            Self::WebDavInput(_) => 400,
            Self::Filesystem { .. } => 406,
            Self::AuthRequired { .. } => 401,
            Self::AuthDenied(_) => 403,
            Self::Io(_) | Self::Internal(_) => 500,
        }
    }
}

/// Errors produced while converting links to filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The link could not be parsed into a path.
    #[error("malformed link: {0}")]
    MalformedLink(String),

    /// The resolved path is not below the configured root.
    #[error("path '{0}' is outside of the repository root")]
    OutsideRoot(String),

    /// The resolved path has no `*.git` segment.
    #[error("path '{0}' does not point into a repository")]
    NotARepository(String),
}

impl From<PathError> for DavGitError {
    fn from(err: PathError) -> Self {
        let path = match &err {
            PathError::MalformedLink(p) | PathError::OutsideRoot(p) | PathError::NotARepository(p) => {
                p.clone()
            },
        };
        Self::PathValidation {
            path,
            reason: err.to_string(),
        }
    }
}

/// Errors produced by the XML parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// The input contained no root element.
    #[error("empty document")]
    Empty,

    /// The input ended before the document was complete.
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    /// A syntax error at the given byte offset.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset into the input
        offset: usize,
        /// Description of the problem
        message: String,
    },

    /// A closing tag did not match the open element.
    #[error("mismatched closing tag: expected '</{expected}>', found '</{found}>'")]
    MismatchedTag {
        /// Tag that was open
        expected: String,
        /// Tag that was closed
        found: String,
    },

    /// Elements are nested deeper than the parser accepts.
    #[error("elements nested deeper than {0} levels")]
    TooDeep(usize),
}

impl XmlError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}

impl From<XmlError> for DavGitError {
    fn from(err: XmlError) -> Self {
        Self::WebDavInput(err.to_string())
    }
}

/// Result type alias for DavGit operations.
pub type Result<T> = std::result::Result<T, DavGitError>;
