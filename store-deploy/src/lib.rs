//! Anthony Store deployment tool
//!
//! Builds, migrates and ships the store to a local checkout, Docker
//! Compose, a Kubernetes cluster via Helm, or GitHub Actions.

pub mod backup;
pub mod cli;
pub mod config;
pub mod deployer;
pub mod error;
pub mod health;
pub mod logger;
pub mod runner;

pub use config::{DeploymentConfig, EnvConfig, Environment};
pub use deployer::{DeployOptions, DeployOutcome, Deployer};
pub use error::{DeployError, DeployResult};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
