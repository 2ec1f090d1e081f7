//! Error types for backend processes and Git operations.

use std::path::PathBuf;

use davgit_core::DavGitError;

/// Errors raised by [`ProcessHandle`](crate::ProcessHandle).
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The working directory does not exist.
    #[error("working directory does not exist: {}", .0.display())]
    WorkingDirMissing(PathBuf),

    /// The executable could not be spawned.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process has not been started yet.
    #[error("process not started")]
    NotStarted,

    /// The process was already started.
    #[error("process already started")]
    AlreadyStarted,

    /// Standard input was already closed or handed off.
    #[error("stdin is closed")]
    StdinClosed,

    /// Standard output was already handed off.
    #[error("stdout is not available")]
    StdoutTaken,

    /// The process did not finish in time and was killed.
    #[error("process timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// An I/O error on one of the pipes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Creates a new spawn error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            seconds: duration.as_secs(),
        }
    }

    /// Returns true if the process never started running.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::WorkingDirMissing(_))
    }
}

/// Errors raised while running the Git HTTP backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No backend executable is configured or installed.
    #[error("git-http-backend is not available")]
    NotAvailable,

    /// The backend process failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The backend wrote a malformed CGI response.
    #[error("malformed backend response: {0}")]
    Protocol(String),
}

impl BackendError {
    /// Creates a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Returns true if the backend could not be run at all.
    ///
    /// Requests that do not need the smart protocol may fall back to
    /// static file serving in this case.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::NotAvailable => true,
            Self::Process(err) => err.is_spawn_failure(),
            Self::Protocol(_) => false,
        }
    }
}

impl From<BackendError> for DavGitError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotAvailable => {
                DavGitError::process_spawn("git-http-backend", "executable not found")
            },
            BackendError::Process(ProcessError::Spawn { program, source }) => {
                DavGitError::process_spawn(program, source.to_string())
            },
            BackendError::Process(ProcessError::WorkingDirMissing(path)) => {
                DavGitError::repository_not_found(path)
            },
            BackendError::Process(other) => DavGitError::internal(other.to_string()),
            BackendError::Protocol(msg) => DavGitError::backend_protocol(msg),
        }
    }
}

/// Errors raised by `git` CLI operations.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The target repository path is already taken.
    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// A git command exited unsuccessfully.
    #[error("git {command} failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The remote URL cannot carry credentials.
    #[error("invalid remote url: {0}")]
    InvalidUrl(String),

    /// The git process could not be run.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Creates a command failure from the arguments and captured stderr.
    pub fn command_failed(args: &[&str], code: i32, stderr: &[u8]) -> Self {
        Self::CommandFailed {
            command: args.join(" "),
            code,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// Returns true if the target path was already taken.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}
