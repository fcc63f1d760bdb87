// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Process runner
//!
//! Executes rendered command templates through a shell.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::errors::{StepflowError, StepflowResult};

/// Exit code and captured output of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,

    /// stdout and stderr lines in arrival order
    pub lines: Vec<String>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell commands for the engine
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` in `cwd` with `env` added to the inherited environment.
    ///
    /// A non-zero exit is not an error here; the caller decides.
    async fn execute(
        &self,
        command: &str,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> StepflowResult<ProcessOutput>;

    /// Whether the runner can execute anything at all
    async fn check_available(&self) -> StepflowResult<bool> {
        Ok(true)
    }
}

/// Runs commands with `<shell> -c`
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn execute(
        &self,
        command: &str,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> StepflowResult<ProcessOutput> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        cmd.current_dir(cwd);
        cmd.envs(env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| StepflowError::Io {
            message: format!("failed to start '{}': {}", self.shell, e),
        })?;

        let stdout = child.stdout.take().ok_or_else(|| StepflowError::Io {
            message: "child stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| StepflowError::Io {
            message: "child stderr was not captured".to_string(),
        })?;

        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);
        let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
        let (mut stdout_done, mut stderr_done) = (false, false);
        let mut lines = Vec::new();
        let mut read_error = None;

        // read_until keeps partial bytes in the buffer when the other branch wins
        while !(stdout_done && stderr_done) {
            let read = tokio::select! {
                n = stdout.read_until(b'\n', &mut out_buf), if !stdout_done => {
                    n.map(|n| collect_line(n, &mut out_buf, &mut lines, &mut stdout_done))
                }
                n = stderr.read_until(b'\n', &mut err_buf), if !stderr_done => {
                    n.map(|n| collect_line(n, &mut err_buf, &mut lines, &mut stderr_done))
                }
            };

            if let Err(e) = read {
                read_error = Some(e);
                let _ = child.start_kill();
                break;
            }
        }

        let status = child.wait().await?;
        if let Some(e) = read_error {
            return Err(e.into());
        }

        Ok(ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            lines,
        })
    }

    async fn check_available(&self) -> StepflowResult<bool> {
        Ok(which::which(&self.shell).is_ok())
    }
}

/// Move one complete line out of `buf`; zero bytes read marks end of stream.
/// Bytes that are not UTF-8 are replaced rather than rejected.
fn collect_line(read: usize, buf: &mut Vec<u8>, lines: &mut Vec<String>, done: &mut bool) {
    if read == 0 {
        *done = true;
        if buf.is_empty() {
            return;
        }
    }

    let mut end = buf.len();
    if buf[..end].ends_with(b"\n") {
        end -= 1;
    }
    if buf[..end].ends_with(b"\r") {
        end -= 1;
    }

    let line = String::from_utf8_lossy(&buf[..end]).into_owned();
    tracing::debug!(target: "stepflow::process", "{}", line);
    lines.push(line);
    buf.clear();
}
