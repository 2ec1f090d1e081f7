//! Git backend configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Locations probed for `git-http-backend` when none is configured.
pub const DEFAULT_BACKEND_LOCATIONS: &[&str] = &[
    "/usr/lib/git-core/git-http-backend",
    "/usr/libexec/git-core/git-http-backend",
];

/// Configuration for the Git HTTP backend and `git` CLI operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Explicit `git-http-backend` executable (auto-detected if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_backend: Option<PathBuf>,

    /// `git` executable used for repository creation and mirroring.
    #[serde(default = "default_git_executable")]
    git_executable: PathBuf,

    /// Limit for the backend's header phase and for each git command.
    #[serde(default = "default_timeout", with = "duration_secs")]
    timeout: Duration,

    /// Author name of the seed commit.
    #[serde(default = "default_committer_name")]
    committer_name: String,

    /// Author email of the seed commit.
    #[serde(default = "default_committer_email")]
    committer_email: String,
}

fn default_git_executable() -> PathBuf {
    PathBuf::from("git")
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_committer_name() -> String {
    "davgit".to_string()
}

fn default_committer_email() -> String {
    "server@davgit.local".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            http_backend: None,
            git_executable: default_git_executable(),
            timeout: default_timeout(),
            committer_name: default_committer_name(),
            committer_email: default_committer_email(),
        }
    }
}

impl BackendConfig {
    /// Creates a new builder for BackendConfig.
    pub fn builder() -> BackendConfigBuilder {
        BackendConfigBuilder::default()
    }

    /// Returns the explicitly configured backend executable.
    pub fn http_backend(&self) -> Option<&Path> {
        self.http_backend.as_deref()
    }

    /// Returns the backend executable to run: the configured one, else
    /// the first default location that exists.
    pub fn resolve_http_backend(&self) -> Option<PathBuf> {
        if let Some(path) = &self.http_backend {
            return Some(path.clone());
        }
        DEFAULT_BACKEND_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    }

    /// Returns the `git` executable.
    pub fn git_executable(&self) -> &Path {
        &self.git_executable
    }

    /// Returns the process timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the seed commit author name.
    pub fn committer_name(&self) -> &str {
        &self.committer_name
    }

    /// Returns the seed commit author email.
    pub fn committer_email(&self) -> &str {
        &self.committer_email
    }
}

/// Builder for BackendConfig.
#[derive(Debug, Default)]
pub struct BackendConfigBuilder {
    http_backend: Option<PathBuf>,
    git_executable: Option<PathBuf>,
    timeout: Option<Duration>,
    committer_name: Option<String>,
    committer_email: Option<String>,
}

impl BackendConfigBuilder {
    /// Sets the `git-http-backend` executable.
    pub fn http_backend(mut self, path: impl Into<PathBuf>) -> Self {
        self.http_backend = Some(path.into());
        self
    }

    /// Sets the `git` executable.
    pub fn git_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.git_executable = Some(path.into());
        self
    }

    /// Sets the process timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the identity used for the seed commit.
    pub fn committer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.committer_name = Some(name.into());
        self.committer_email = Some(email.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is empty or the timeout is zero.
    pub fn build(self) -> Result<BackendConfig, &'static str> {
        let timeout = self.timeout.unwrap_or_else(default_timeout);
        if timeout.is_zero() {
            return Err("timeout must be greater than zero");
        }

        let git_executable = self.git_executable.unwrap_or_else(default_git_executable);
        if git_executable.as_os_str().is_empty() {
            return Err("git_executable must not be empty");
        }

        let committer_name = self.committer_name.unwrap_or_else(default_committer_name);
        let committer_email = self.committer_email.unwrap_or_else(default_committer_email);
        if committer_name.trim().is_empty() || committer_email.trim().is_empty() {
            return Err("committer name and email must not be empty");
        }

        Ok(BackendConfig {
            http_backend: self.http_backend,
            git_executable,
            timeout,
            committer_name,
            committer_email,
        })
    }
}


mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
