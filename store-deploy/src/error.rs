//! Deployment errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    /// A required tool is missing or unusable
    #[error("{0}")]
    Prerequisite(String),

    /// Could not start the process at all
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited non-zero
    #[error("command failed: `{command}` (exit code {code:?}): {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command timed out after {secs}s: `{command}`")]
    Timeout { command: String, secs: u64 },

    #[error("backup failed: {0}")]
    Backup(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("GitHub Actions workflow file missing: {0}")]
    WorkflowMissing(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DeployResult<T> = Result<T, DeployError>;
