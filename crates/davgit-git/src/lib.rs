//! # DavGit Git Bridge
//!
//! Process-level access to Git for the DavGit server.
//!
//! ## Features
//!
//! - [`ProcessHandle`]: child processes with piped stdin/stdout/stderr,
//!   explicit environment maps and real (timeout-aware) waits
//! - [`parse_header`]: splits CGI output into header lines and body
//! - [`HttpBackend`]: runs `git-http-backend` for a request and streams
//!   its response
//! - [`RepositoryManager`]: creates seeded bare repositories and mirrors
//!
//! ## Example
//!
//! ```ignore
//! use davgit_git::{BackendConfig, RepositoryManager};
//!
//! let config = BackendConfig::builder()
//!     .timeout(std::time::Duration::from_secs(60))
//!     .build()?;
//!
//! let manager = RepositoryManager::new(&config);
//! let path = manager.create_repository("/srv/git/demo").await?;
//! assert!(path.ends_with("demo.git"));
//! ```

pub mod backend;
pub mod cgi;
pub mod config;
pub mod error;
pub mod git;
pub mod process;
pub mod repository;

// Re-exports
pub use backend::{BackendBody, BackendResponse, CgiRequest, HttpBackend};
pub use cgi::{CgiHeader, parse_header};
pub use config::{BackendConfig, BackendConfigBuilder, DEFAULT_BACKEND_LOCATIONS};
pub use error::{BackendError, GitError, ProcessError};
pub use git::GitCli;
pub use process::ProcessHandle;
pub use repository::{RepositoryManager, SEED_FILE, bare_repository_path};

// Re-export davgit_core for consumers
pub use davgit_core;
