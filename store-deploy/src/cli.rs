//! Command line

use clap::Parser;
use std::path::PathBuf;

use crate::config::Environment;

#[derive(Debug, Parser)]
#[command(
    name = "store-deploy",
    version,
    about = "Deploy Anthony Store to various environments"
)]
pub struct Cli {
    /// Target environment
    #[arg(value_enum)]
    pub environment: Environment,

    /// Do not run the test suite
    #[arg(long)]
    pub skip_tests: bool,

    /// Do not back up the database, media and .env first
    #[arg(long)]
    pub skip_backup: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    pub project_root: Option<PathBuf>,

    /// Do not poll the health endpoint afterwards
    #[arg(long)]
    pub no_health_check: bool,
}

impl Cli {
    pub fn project_root(&self) -> std::io::Result<PathBuf> {
        match &self.project_root {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir(),
        }
    }
}
