//! Server configuration.
//!
//! Values are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `DAVGIT_*` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use davgit_core::PathResolver;
use davgit_git::BackendConfig;
use serde::{Deserialize, Serialize};

use crate::auth::{User, UserListAuth};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "davgit";

/// A configured account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_sha256: String,
    #[serde(default)]
    pub admin: bool,
}

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the bare repositories.
    pub root_path: PathBuf,
    /// External base URL; derived from host and port when unset.
    pub root_link: Option<String>,
    /// URL prefix the repositories are mounted under, e.g. `/git/repositories`.
    pub mount_prefix: String,
    /// `git-http-backend` executable; auto-detected when unset.
    pub backend_executable: Option<PathBuf>,
    pub git_executable: PathBuf,
    pub backend_timeout_secs: u64,
    pub realm: String,
    pub users: Vec<UserConfig>,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            root_path: PathBuf::from("/var/lib/davgit/repositories"),
            root_link: None,
            mount_prefix: String::new(),
            backend_executable: None,
            git_executable: PathBuf::from("git"),
            backend_timeout_secs: 300,
            realm: "davgit".to_string(),
            users: Vec::new(),
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist; otherwise `davgit.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("DAVGIT").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Address the server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// External base URL of the server.
    pub fn root_link(&self) -> String {
        match &self.root_link {
            Some(link) => link.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Builds the Git backend configuration.
    pub fn backend_config(&self) -> Result<BackendConfig, &'static str> {
        let mut builder = BackendConfig::builder()
            .git_executable(&self.git_executable)
            .timeout(self.backend_timeout());
        if let Some(executable) = &self.backend_executable {
            builder = builder.http_backend(executable);
        }
        builder.build()
    }

    /// Builds the link converter for the configured root.
    pub fn link_converter(&self) -> PathResolver {
        PathResolver::new(self.root_link(), self.root_path.to_string_lossy())
            .with_mount_prefix(&self.mount_prefix)
    }

    /// Builds the user list policy.
    pub fn auth_policy(&self) -> UserListAuth {
        UserListAuth::new(
            &self.realm,
            self.users.iter().map(|user| {
                User::new(&user.username, &user.password_sha256).with_admin(user.admin)
            }),
        )
    }

    /// Default log filter.
    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
