//! External command execution

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{DeployError, DeployResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Render a command line for logs and errors
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs a program and captures its output.
///
/// A non-zero exit is not an error here; callers decide with
/// [`CommandOutput::success`] or [`check`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> DeployResult<CommandOutput>;
}

/// Turn a non-zero exit into [`DeployError::Command`]
pub fn check(program: &str, args: &[String], output: CommandOutput) -> DeployResult<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(DeployError::Command {
            command: display_command(program, args),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Spawns real processes with `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> DeployResult<CommandOutput> {
        let command = display_command(program, args);
        tracing::debug!(%command, cwd = %cwd.display(), "Running");

        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DeployError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Dropping the future on timeout kills the child
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DeployError::Timeout {
                    command,
                    secs: timeout.as_secs(),
                });
            }
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
