//! `git` command line runner.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{GitError, ProcessError};
use crate::process::ProcessHandle;

/// Runs `git` subcommands through a [`ProcessHandle`].
#[derive(Debug, Clone)]
pub struct GitCli {
    executable: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    /// Creates a runner using the configured executable and timeout.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.git_executable(), config.timeout())
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Runs `git <args>` in `dir` and returns its stdout.
    ///
    /// Interactive credential prompts are disabled.
    ///
    /// # Errors
    ///
    /// Fails if git cannot be started, exceeds the timeout or exits with a
    /// non-zero code.
    pub async fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        debug!(dir = %dir.display(), command = %args.join(" "), "Running git");

        let mut process =
            ProcessHandle::new(&self.executable, dir).env("GIT_TERMINAL_PROMPT", "0");
        process.start(args)?;
        process.close_write();

        let stdout = match tokio::time::timeout(self.timeout, process.read_all()).await {
            Ok(output) => output?,
            Err(_) => {
                process.kill().await?;
                return Err(ProcessError::timeout(self.timeout).into());
            },
        };
        let code = process.wait_finished(Some(self.timeout)).await?;

        if code != 0 {
            let stderr = process.stderr_output().await;
            return Err(GitError::command_failed(args, code, &stderr));
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Returns true if `dir` is a bare repository.
    pub async fn is_bare(&self, dir: &Path) -> Result<bool, GitError> {
        let output = self.run(dir, &["rev-parse", "--is-bare-repository"]).await?;
        Ok(output.trim() == "true")
    }
}
