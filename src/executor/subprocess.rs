//! Subprocess execution.
//!
//! Runs external commands with:
//! - No shell interpretation (direct exec)
//! - A cleared environment with explicitly listed variables
//! - Optional stdin payload
//! - Captured stdout/stderr
//! - An optional timeout (the default is to wait for the child indefinitely)

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{AdminError, CommandErrorKind};

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl SubprocessResult {
    fn new(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
    }
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    stdin: Option<String>,
    timeout: Option<Duration>,
    clear_env: bool,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder.
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            stdin: None,
            timeout: None,
            clear_env: false,
        }
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Feed `input` to the child's stdin, then close it.
    pub fn stdin(mut self, input: &str) -> Self {
        self.stdin = Some(input.to_string());
        self
    }

    /// Kill the child if it has not exited after `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clear the environment before running (then add only specified env vars).
    pub fn clear_env(mut self) -> Self {
        self.clear_env = true;
        self
    }

    /// Execute the command and wait for completion.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`SubprocessResult::success`]. Errors are reserved for spawn failures,
    /// I/O failures while talking to the child, and timeouts.
    pub fn run(self) -> Result<SubprocessResult, AdminError> {
        debug!(
            program = %self.program,
            args = ?self.args,
            timeout_secs = ?self.timeout.map(|t| t.as_secs()),
            "Executing subprocess"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        if self.clear_env {
            cmd.env_clear();
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| AdminError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: format!("Failed to spawn {}: {}", self.program, e),
            },
        })?;

        // Readers drain the pipes while we wait so a chatty child cannot block
        // on a full pipe buffer.
        let stdout_reader = spawn_stdout_reader(child.stdout.take());
        let stderr_reader = spawn_stderr_reader(child.stderr.take());

        if let (Some(input), Some(mut pipe)) = (self.stdin.as_deref(), child.stdin.take()) {
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                // The child may exit before reading everything; its exit
                // status tells the real story.
                warn!(program = %self.program, error = %e, "Failed to write subprocess stdin");
            }
        }

        let start = Instant::now();
        let status = match self.timeout {
            None => child.wait().map_err(|e| self.wait_error(e))?,
            Some(timeout) => self.wait_with_deadline(&mut child, timeout)?,
        };

        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);
        let result = SubprocessResult::new(status, stdout, stderr);
        debug!(
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Subprocess completed"
        );
        Ok(result)
    }

    fn wait_with_deadline(
        &self,
        child: &mut Child,
        timeout: Duration,
    ) -> Result<ExitStatus, AdminError> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start.elapsed() > timeout {
                        warn!(
                            program = %self.program,
                            timeout_secs = timeout.as_secs(),
                            "Process timed out, killing"
                        );
                        if let Err(e) = child.kill() {
                            warn!(error = %e, "Failed to kill timed-out process");
                        }
                        // Reap the zombie process
                        let _ = child.wait();
                        return Err(AdminError::Command {
                            kind: CommandErrorKind::Timeout {
                                timeout_secs: timeout.as_secs(),
                            },
                        });
                    }
                    thread::sleep(poll_interval);
                }
                Err(e) => return Err(self.wait_error(e)),
            }
        }
    }

    fn wait_error(&self, e: std::io::Error) -> AdminError {
        AdminError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: format!("Failed to wait for {}: {}", self.program, e),
            },
        }
    }
}

fn spawn_stdout_reader(pipe: Option<ChildStdout>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| thread::spawn(move || read_all(&mut pipe)))
}

fn spawn_stderr_reader(pipe: Option<ChildStderr>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| thread::spawn(move || read_all(&mut pipe)))
}

fn read_all(pipe: &mut impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf) {
        warn!(error = %e, "Failed to read subprocess output");
    }
    buf
}

fn join_reader(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
