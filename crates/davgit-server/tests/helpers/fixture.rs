//! Repository tree fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use davgit_core::PathResolver;
use davgit_git::{BackendConfig, HttpBackend};
use davgit_server::{AppState, User, UserListAuth, create_app_router};
use tempfile::TempDir;

use super::client::TestClient;

pub const ROOT_LINK: &str = "http://localhost:8080";
pub const USER: &str = "alice";
pub const PASSWORD: &str = "secret";

/// Backend path that never exists, so tests do not depend on an installed git.
pub const MISSING_BACKEND: &str = "/nonexistent/git-http-backend";

/// A temporary repository root served by a full application router.
pub struct Fixture {
    pub root: TempDir,
    backend: PathBuf,
}

impl Fixture {
    /// Creates an empty root with the backend unavailable.
    pub fn new() -> Self {
        Self::with_backend(MISSING_BACKEND)
    }

    /// Creates an empty root that runs `backend` as git-http-backend.
    pub fn with_backend(backend: impl Into<PathBuf>) -> Self {
        Self {
            root: tempfile::tempdir().expect("Failed to create temp root"),
            backend: backend.into(),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Absolute path of `relative` below the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative.trim_start_matches('/'))
    }

    /// Creates a repository directory.
    pub fn repository(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    /// Writes a file, creating parent directories.
    pub fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn state(&self) -> AppState {
        let converter = PathResolver::new(ROOT_LINK, self.root().to_string_lossy());
        let auth = UserListAuth::new("davgit", [User::with_password(USER, PASSWORD)]);
        let backend = BackendConfig::builder()
            .http_backend(&self.backend)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        AppState::new(
            Arc::new(converter),
            Arc::new(auth),
            HttpBackend::new(backend),
        )
    }

    /// Anonymous client.
    pub fn client(&self) -> TestClient {
        TestClient::new(create_app_router(self.state()))
    }

    /// Client authenticated as the configured user.
    pub fn user_client(&self) -> TestClient {
        self.client().with_credentials(USER, PASSWORD)
    }
}

/// Writes an executable shell script.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
