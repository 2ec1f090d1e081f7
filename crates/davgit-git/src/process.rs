//! Child process with piped standard streams.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ProcessError;

const READ_CHUNK: usize = 8192;

/// Most stderr output kept per process; older bytes are discarded.
pub const STDERR_LIMIT: usize = 64 * 1024;

/// A child process with stdin, stdout and stderr pipes.
///
/// The environment is an explicit map handed to the child; the server's
/// own environment and working directory are never changed. The child is
/// killed when the handle is dropped while it is still running, so an
/// aborted request cannot leak a process.
///
/// stderr is drained in the background so the child never blocks on it.
///
/// # Example
///
/// ```ignore
/// let mut process = ProcessHandle::new("git", "/srv/git/demo.git");
/// process.start(["rev-parse", "--is-bare-repository"])?;
/// process.close_write();
/// let output = process.read_all().await?;
/// let code = process.wait_finished(Some(Duration::from_secs(10))).await?;
/// ```
pub struct ProcessHandle {
    program: PathBuf,
    working_dir: PathBuf,
    env: IndexMap<String, String>,
    clear_env: bool,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr: Arc<Mutex<Vec<u8>>>,
    stderr_task: Option<JoinHandle<()>>,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    /// Creates a handle for `program`, to be run in `working_dir`.
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            env: IndexMap::new(),
            clear_env: false,
            child: None,
            stdin: None,
            stdout: None,
            stderr: Arc::new(Mutex::new(Vec::new())),
            stderr_task: None,
            exit_code: None,
        }
    }

    /// Adds an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Adds several environment variables for the child.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Starts the child from an empty environment (only `PATH` is kept).
    pub fn clear_env(mut self, clear: bool) -> Self {
        self.clear_env = clear;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Environment handed to the child, in insertion order.
    pub fn environment(&self) -> &IndexMap<String, String> {
        &self.env
    }

    /// Spawns the process.
    ///
    /// # Errors
    ///
    /// Fails if the working directory is missing, the process was already
    /// started, or the executable cannot be spawned.
    pub fn start<I, S>(&mut self, args: I) -> Result<(), ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if self.child.is_some() {
            return Err(ProcessError::AlreadyStarted);
        }
        if !self.working_dir.is_dir() {
            return Err(ProcessError::WorkingDirMissing(self.working_dir.clone()));
        }

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if self.clear_env {
            command.env_clear();
            if let Some(path) = std::env::var_os("PATH") {
                command.env("PATH", path);
            }
        }
        command.envs(&self.env);

        let mut child = command
            .spawn()
            .map_err(|e| ProcessError::spawn(self.program.display().to_string(), e))?;

        debug!(
            program = %self.program.display(),
            working_dir = %self.working_dir.display(),
            pid = child.id(),
            "Process started"
        );

        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take().map(BufReader::new);
        if let Some(stderr) = child.stderr.take() {
            self.stderr_task = Some(tokio::spawn(drain_stderr(
                stderr,
                Arc::clone(&self.stderr),
                self.program.display().to_string(),
            )));
        }
        self.child = Some(child);
        Ok(())
    }

    /// Writes all of `data` to the child's stdin.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, ProcessError> {
        let stdin = self.stdin.as_mut().ok_or(ProcessError::StdinClosed)?;
        stdin.write_all(data).await?;
        stdin.flush().await?;
        Ok(data.len())
    }

    /// Reads up to `max_len` bytes from stdout; an empty result means EOF.
    pub async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, ProcessError> {
        let stdout = self.stdout.as_mut().ok_or(ProcessError::StdoutTaken)?;
        let mut buffer = vec![0; max_len];
        let read = stdout.read(&mut buffer).await?;
        buffer.truncate(read);
        Ok(buffer)
    }

    /// Reads one line (including its `\n`) of at most `max_len` bytes.
    pub async fn read_line(&mut self, max_len: usize) -> Result<Vec<u8>, ProcessError> {
        let stdout = self.stdout.as_mut().ok_or(ProcessError::StdoutTaken)?;
        let mut line = Vec::new();

        while line.len() < max_len {
            let available = stdout.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            let take = available.len().min(max_len - line.len());
            if let Some(pos) = available[..take].iter().position(|b| *b == b'\n') {
                line.extend_from_slice(&available[..=pos]);
                stdout.consume(pos + 1);
                break;
            }
            line.extend_from_slice(&available[..take]);
            stdout.consume(take);
        }
        Ok(line)
    }

    /// Reads stdout until EOF.
    pub async fn read_all(&mut self) -> Result<Vec<u8>, ProcessError> {
        let mut output = Vec::new();
        loop {
            let chunk = self.read(READ_CHUNK).await?;
            if chunk.is_empty() {
                return Ok(output);
            }
            output.extend_from_slice(&chunk);
        }
    }

    /// Closes stdin so the child sees EOF; the other pipes stay open.
    pub fn close_write(&mut self) {
        self.stdin = None;
    }

    /// Hands stdin to the caller, e.g. to feed it from another task.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Hands stdout to the caller for streaming. Buffered bytes are kept.
    pub fn take_stdout(&mut self) -> Option<BufReader<ChildStdout>> {
        self.stdout.take()
    }

    /// Returns true while the child has not exited.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                self.exit_code = Some(status.code().unwrap_or(-1));
                false
            },
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Waits for the child to exit and returns its exit code.
    ///
    /// stdin is closed first. Without a timeout this waits indefinitely;
    /// on timeout the child is killed. Callers must consume stdout (or
    /// hand it off) before waiting, or a child with a full pipe never exits.
    pub async fn wait_finished(&mut self, timeout: Option<Duration>) -> Result<i32, ProcessError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        self.close_write();
        let child = self.child.as_mut().ok_or(ProcessError::NotStarted)?;

        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(program = %self.program.display(), "Process timed out, killing it");
                    child.kill().await?;
                    return Err(ProcessError::timeout(limit));
                },
            },
            None => child.wait().await?,
        };

        let code = status.code().unwrap_or(-1);
        self.exit_code = Some(code);
        debug!(program = %self.program.display(), code, "Process finished");
        Ok(code)
    }

    /// Kills the child if it is still running.
    pub async fn kill(&mut self) -> Result<(), ProcessError> {
        if let Some(child) = self.child.as_mut() {
            if self.exit_code.is_none() {
                child.kill().await?;
                self.exit_code = Some(-1);
            }
        }
        Ok(())
    }

    /// Last known exit code, if the child has exited.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// The last [`STDERR_LIMIT`] bytes the child has written to stderr.
    ///
    /// Once the child has exited this waits for the drain to finish, so
    /// the output is complete.
    pub async fn stderr_output(&mut self) -> Vec<u8> {
        if self.exit_code.is_some() {
            if let Some(task) = self.stderr_task.take() {
                let _ = task.await;
            }
        }
        self.stderr.lock().clone()
    }

    /// Closes all pipes, reaps the child and returns its exit code.
    ///
    /// Returns -1 if the process was never started.
    pub async fn close(mut self) -> i32 {
        self.stdin = None;
        self.stdout = None;
        if self.child.is_none() {
            return -1;
        }
        self.wait_finished(None).await.unwrap_or(-1)
    }
}

async fn drain_stderr(mut stderr: ChildStderr, sink: Arc<Mutex<Vec<u8>>>, program: String) {
    let mut chunk = [0u8; 1024];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                debug!(program = %program, stderr = %String::from_utf8_lossy(&chunk[..n]).trim_end());
                append_bounded(&mut sink.lock(), &chunk[..n], STDERR_LIMIT);
            },
            Err(e) => {
                warn!(program = %program, error = %e, "Failed to read stderr");
                break;
            },
        }
    }
}

/// Appends `data`, then drops the oldest bytes beyond `limit`.
fn append_bounded(buf: &mut Vec<u8>, data: &[u8], limit: usize) {
    buf.extend_from_slice(data);
    if buf.len() > limit {
        let excess = buf.len() - limit;
        buf.drain(..excess);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> (ProcessHandle, Vec<String>) {
        let dir = std::env::temp_dir();
        (
            ProcessHandle::new("/bin/sh", dir),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let (mut process, args) = sh("cat");
        process.start(&args).unwrap();

        assert_eq!(process.write(b"hello\nworld").await.unwrap(), 11);
        process.close_write();

        assert_eq!(process.read_line(64).await.unwrap(), b"hello\n");
        assert_eq!(process.read_all().await.unwrap(), b"world");
        assert_eq!(process.wait_finished(None).await.unwrap(), 0);
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_read_line_respects_max_len() {
        let (mut process, args) = sh("printf 'abcdef\\n'");
        process.start(&args).unwrap();

        assert_eq!(process.read_line(4).await.unwrap(), b"abcd");
        assert_eq!(process.read_line(4).await.unwrap(), b"ef\n");
        assert!(process.read_line(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_environment_is_explicit() {
        let (process, args) = sh("printf '%s' \"$DAVGIT_TEST_VAR\"");
        let mut process = process.env("DAVGIT_TEST_VAR", "from-map").clear_env(true);
        process.start(&args).unwrap();

        assert_eq!(process.read_all().await.unwrap(), b"from-map");
        assert!(std::env::var("DAVGIT_TEST_VAR").is_err());
    }

    #[tokio::test]
    async fn test_exit_code_and_stderr() {
        let (mut process, args) = sh("echo oops >&2; exit 3");
        process.start(&args).unwrap();

        assert_eq!(process.wait_finished(None).await.unwrap(), 3);
        assert_eq!(process.stderr_output().await, b"oops\n");
        assert_eq!(process.close().await, 3);
    }

    #[test]
    fn test_append_bounded_keeps_tail() {
        let mut buf = Vec::new();
        append_bounded(&mut buf, b"abcdef", 4);
        assert_eq!(buf, b"cdef");
        append_bounded(&mut buf, b"gh", 4);
        assert_eq!(buf, b"efgh");
        append_bounded(&mut buf, b"i", 8);
        assert_eq!(buf, b"efghi");
    }

    #[tokio::test]
    async fn test_stderr_is_bounded() {
        let (mut process, args) = sh("head -c 200000 /dev/zero >&2; printf tail >&2");
        process.start(&args).unwrap();

        assert_eq!(process.wait_finished(None).await.unwrap(), 0);
        let stderr = process.stderr_output().await;
        assert_eq!(stderr.len(), STDERR_LIMIT);
        assert!(stderr.ends_with(b"\0tail"));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let (mut process, args) = sh("sleep 30");
        process.start(&args).unwrap();
        assert!(process.is_running());

        let err = process
            .wait_finished(Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_working_dir() {
        let mut process = ProcessHandle::new("/bin/sh", "/definitely/not/here");
        let err = process.start(["-c", "true"]).unwrap_err();
        assert!(matches!(err, ProcessError::WorkingDirMissing(_)));
        assert!(err.is_spawn_failure());
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let mut process = ProcessHandle::new("/no/such/binary", std::env::temp_dir());
        let err = process.start(Vec::<String>::new()).unwrap_err();
        assert!(err.is_spawn_failure());
        assert_eq!(process.close().await, -1);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (mut process, args) = sh("true");
        process.start(&args).unwrap();
        assert!(matches!(
            process.start(&args),
            Err(ProcessError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let (mut process, args) = sh("cat >/dev/null");
        process.start(&args).unwrap();
        process.close_write();
        assert!(matches!(
            process.write(b"late").await,
            Err(ProcessError::StdinClosed)
        ));
    }
}
