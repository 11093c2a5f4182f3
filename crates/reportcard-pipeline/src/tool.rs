//! External tool execution.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::AnalyzerError;

/// Captured output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Tool name, for diagnostics.
    pub tool: String,

    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,

    pub success: bool,
}

impl ToolOutput {
    /// Non-zero exit with output on stderr only. Lint tools may report
    /// findings there, so callers check for parseable lines first.
    pub fn is_crash(&self) -> bool {
        !self.success && self.stdout.trim().is_empty() && !self.stderr.trim().is_empty()
    }
}

/// Runs tool commands with a working directory and a timeout.
pub struct ToolRunner;

impl ToolRunner {
    /// Run `command` followed by `args` inside `cwd`.
    ///
    /// `timeout` of zero means unbounded. On timeout the child is killed.
    pub async fn execute<I, S>(
        name: &str,
        command: &[String],
        args: I,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<ToolOutput, AnalyzerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let start = Instant::now();

        let (exe, fixed_args) = command.split_first().ok_or_else(|| {
            AnalyzerError::ToolUnavailable {
                tool: name.to_string(),
                reason: "empty command".to_string(),
            }
        })?;

        let child = Command::new(exe)
            .args(fixed_args)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    AnalyzerError::ToolUnavailable {
                        tool: name.to_string(),
                        reason: format!("{exe}: {e}"),
                    }
                }
                _ => AnalyzerError::Io(e),
            })?;

        let output = if timeout.is_zero() {
            child.wait_with_output().await?
        } else {
            tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| AnalyzerError::ToolTimeout {
                    tool: name.to_string(),
                    timeout,
                })??
        };

        Ok(ToolOutput {
            tool: name.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            success: output.status.success(),
        })
    }
}
