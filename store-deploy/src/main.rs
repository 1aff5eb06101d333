use clap::Parser;
use std::process::ExitCode;

use store_deploy::cli::Cli;
use store_deploy::{DeployOptions, Deployer, SystemRunner, config, logger};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let project_root = match cli.project_root() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Cannot determine project root: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logger::init_logger(&project_root) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = config::load(&project_root);
    let options = DeployOptions {
        skip_tests: cli.skip_tests,
        skip_backup: cli.skip_backup,
        no_health_check: cli.no_health_check,
        ..Default::default()
    };
    let mut deployer = Deployer::new(
        SystemRunner,
        project_root,
        cli.environment,
        config.for_env(cli.environment).clone(),
        options,
    );

    tokio::select! {
        result = deployer.deploy() => match result {
            Ok(outcome) => {
                if !outcome.warnings.is_empty() {
                    tracing::info!(warnings = outcome.warnings.len(), "Finished with warnings");
                }
                ExitCode::SUCCESS
            }
            Err(_) => ExitCode::FAILURE,
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Deployment interrupted by user");
            ExitCode::FAILURE
        }
    }
}
