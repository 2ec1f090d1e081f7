//! DavGit Server - HTTP server for bare Git repositories
//!
//! Serves the Git smart and dumb HTTP protocols through
//! `git-http-backend` and a minimal WebDAV interface for browsing and
//! editing repository files.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod state;
pub mod webdav;

pub use auth::{Access, AuthError, AuthPolicy, Credentials, User, UserListAuth, hash_password};
pub use config::{ServerConfig, UserConfig};
pub use error::AppError;
pub use handlers::health::HealthResponse;
pub use server::{create_app_router, create_router, create_router_with_state, run_server_with_state};
pub use state::AppState;
pub use webdav::{WebDavEngine, WebDavError, WebDavErrorCode, WebDavMethod};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
