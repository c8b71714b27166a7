//! External command-line tool capability.
//!
//! Every build/save/load/run (and template clone) invocation goes through [`ExternalTool`] so
//! pipelines can be driven by a scripted fake in tests. [`CliTool`] is the
//! real implementation backed by `tokio::process`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio::process::Command;

use crate::error::{PipeError, Result};

/// Exit code reported when a command is killed for exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Captured result of a finished (or timed out) tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Combined stderr and stdout for error reports.
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        match (stderr.is_empty(), stdout.is_empty()) {
            (false, false) => format!("{stderr}\n{stdout}"),
            (false, true) => stderr.to_string(),
            (true, false) => stdout.to_string(),
            (true, true) => String::new(),
        }
    }

    /// Short description of why the command did not succeed.
    pub fn failure_summary(&self, timeout: Duration) -> String {
        if self.timed_out {
            format!("timed out after {}s", timeout.as_secs())
        } else {
            format!("exit code {}", self.exit_code)
        }
    }
}

/// An external CLI: docker (or a compatible runtime) and git.
#[async_trait]
pub trait ExternalTool: Send + Sync {
    /// Executable name, used in messages.
    fn program(&self) -> &str;

    /// Run to completion with captured output, killing the process on timeout.
    ///
    /// Returns `Err` only if the process could not be spawned.
    async fn execute(&self, args: &[String], timeout: Duration) -> Result<CommandOutput>;

    /// Run with stdout/stderr forwarded live to this process's streams.
    ///
    /// Returns the child's exit code.
    async fn run_attached(&self, args: &[String]) -> Result<i32>;
}

/// Tool backed by a real executable.
#[derive(Debug, Clone)]
pub struct CliTool {
    program: String,
}

impl CliTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> PipeError {
        PipeError::SpawnFailed {
            program: self.program.clone(),
            message: e.to_string(),
        }
    }
}

impl Default for CliTool {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TOOL_PROGRAM)
    }
}

#[async_trait]
impl ExternalTool for CliTool {
    fn program(&self) -> &str {
        &self.program
    }

    async fn execute(&self, args: &[String], timeout: Duration) -> Result<CommandOutput> {
        tracing::debug!(program = %self.program, ?args, "Executing tool");

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the wait future on timeout kills the child.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                timed_out: false,
            }),
            Ok(Err(e)) => Err(PipeError::Io(e)),
            Err(_) => {
                tracing::warn!(program = %self.program, ?args, "Tool timed out");
                Ok(CommandOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    timed_out: true,
                    ..Default::default()
                })
            }
        }
    }

    async fn run_attached(&self, args: &[String]) -> Result<i32> {
        let mut out = tokio::io::stdout();
        let mut err = tokio::io::stderr();
        self.run_forwarding(args, &mut out, &mut err).await
    }
}

impl CliTool {
    /// Run with stdin inherited, copying the child's stdout and stderr into
    /// `out` and `err` as they arrive. Returns the child's exit code.
    pub async fn run_forwarding<O, E>(
        &self,
        args: &[String],
        out: &mut O,
        err: &mut E,
    ) -> Result<i32>
    where
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        tracing::debug!(program = %self.program, ?args, "Running attached");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut child_stdout = child.stdout.take().ok_or_else(|| {
            PipeError::Io(std::io::Error::other("child stdout was not captured"))
        })?;
        let mut child_stderr = child.stderr.take().ok_or_else(|| {
            PipeError::Io(std::io::Error::other("child stderr was not captured"))
        })?;

        let forward_stdout = async {
            if let Err(e) = tokio::io::copy(&mut child_stdout, out).await {
                tracing::warn!("Error forwarding stdout: {}", e);
            }
        };
        let forward_stderr = async {
            if let Err(e) = tokio::io::copy(&mut child_stderr, err).await {
                tracing::warn!("Error forwarding stderr: {}", e);
            }
        };

        let (_, _, status) = tokio::join!(forward_stdout, forward_stderr, child.wait());
        let status = status?;
        Ok(status.code().unwrap_or(-1))
    }
}
