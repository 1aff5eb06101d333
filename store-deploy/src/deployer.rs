//! Deployment orchestration
//!
//! `prerequisites → backup → environment step → health check → backup
//! cleanup`. Every external program goes through a [`CommandRunner`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backup;
use crate::config::{EnvConfig, Environment};
use crate::error::{DeployError, DeployResult};
use crate::health::HealthCheck;
use crate::runner::{CommandOutput, CommandRunner, DEFAULT_TIMEOUT, check, display_command};

const IMAGE_TAG: &str = "anthony-store:latest";
const HELM_RELEASE: &str = "anthony-store";
const DEFAULT_NAMESPACE: &str = "anthony-store";
const DEFAULT_CHART: &str = "./charts/store-chart";
const COMMIT_MESSAGE: &str = "Deploy Anthony Store updates";

/// Switches from the command line
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub skip_tests: bool,
    pub skip_backup: bool,
    pub no_health_check: bool,
    pub command_timeout: Duration,
    pub health: HealthCheck,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            skip_tests: false,
            skip_backup: false,
            no_health_check: false,
            command_timeout: DEFAULT_TIMEOUT,
            health: HealthCheck::default(),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Default)]
pub struct DeployOutcome {
    pub backup: Option<PathBuf>,
    /// Non-fatal problems, in order
    pub warnings: Vec<String>,
    /// `None` when no health check ran
    pub healthy: Option<bool>,
}

pub struct Deployer<R> {
    runner: R,
    project_root: PathBuf,
    environment: Environment,
    config: EnvConfig,
    options: DeployOptions,
    outcome: DeployOutcome,
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

impl<R: CommandRunner> Deployer<R> {
    pub fn new(
        runner: R,
        project_root: impl Into<PathBuf>,
        environment: Environment,
        config: EnvConfig,
        options: DeployOptions,
    ) -> Self {
        Self {
            runner,
            project_root: project_root.into(),
            environment,
            config,
            options,
            outcome: DeployOutcome::default(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Run the whole deployment. On failure the backup location is logged
    /// before the error is returned.
    pub async fn deploy(&mut self) -> DeployResult<DeployOutcome> {
        tracing::info!(environment = %self.environment, "Starting deployment");

        match self.run_steps().await {
            Ok(()) => {
                tracing::info!(environment = %self.environment, "Deployment completed successfully!");
                Ok(std::mem::take(&mut self.outcome))
            }
            Err(e) => {
                tracing::error!(error = %e, "Deployment failed");
                if let Some(path) = &self.outcome.backup {
                    tracing::info!(path = %path.display(), "Backup available at");
                }
                Err(e)
            }
        }
    }

    /// Backup directory of the current run, if one was made
    pub fn backup_path(&self) -> Option<&Path> {
        self.outcome.backup.as_deref()
    }

    async fn run_steps(&mut self) -> DeployResult<()> {
        self.check_prerequisites().await?;

        if self.options.skip_backup {
            tracing::info!("Backup skipped");
        } else {
            let ts = chrono::Utc::now().timestamp();
            self.outcome.backup = Some(backup::create_backup(&self.project_root, self.environment, ts)?);
        }

        match self.environment {
            Environment::Local => self.deploy_local().await?,
            Environment::Docker => self.deploy_docker().await?,
            Environment::Kubernetes => self.deploy_kubernetes().await?,
            Environment::Github => self.deploy_github().await?,
        }

        self.health_check().await;

        let backup_dir = self.project_root.join(backup::BACKUP_DIR);
        if let Err(e) = backup::cleanup_old_backups(&backup_dir, backup::KEEP_BACKUPS) {
            self.warn(format!("Failed to cleanup old backups: {e}"));
        }
        Ok(())
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.outcome.warnings.push(message);
    }

    /// Run without judging the exit code
    async fn exec(&self, program: &str, args: &[&str]) -> DeployResult<CommandOutput> {
        self.runner
            .run(program, &to_args(args), &self.project_root, self.options.command_timeout)
            .await
    }

    /// Run and fail on a non-zero exit
    async fn exec_checked(&self, program: &str, args: &[&str]) -> DeployResult<CommandOutput> {
        let output = self.exec(program, args).await?;
        check(program, &to_args(args), output)
    }

    /// Run a command whose failure only produces a warning
    async fn exec_lenient(&mut self, program: &str, args: &[&str], what: &str) -> bool {
        match self.exec_checked(program, args).await {
            Ok(_) => true,
            Err(e) => {
                self.warn(format!("{what} failed: {e}"));
                false
            }
        }
    }

    async fn require(&self, program: &str, args: &[&str], message: &str) -> DeployResult<CommandOutput> {
        self.exec_checked(program, args).await.map_err(|e| {
            tracing::error!(command = %display_command(program, &to_args(args)), error = %e, "Prerequisite missing");
            DeployError::Prerequisite(message.to_string())
        })
    }

    async fn check_prerequisites(&mut self) -> DeployResult<()> {
        tracing::info!("Checking prerequisites...");

        let cargo = self
            .require("cargo", &["--version"], "Rust toolchain (cargo) is required but not found")
            .await?;
        // "cargo 1.85.0 (d73d2caf9 2024-12-31)"
        let current = cargo.stdout.split_whitespace().nth(1).unwrap_or_default().to_string();
        if !current.starts_with(&self.config.rust_version) {
            self.warn(format!(
                "Rust version mismatch. Expected: {}, Got: {current}",
                self.config.rust_version
            ));
        }

        self.require("git", &["--version"], "Git is required but not found")
            .await?;

        match self.environment {
            Environment::Docker => {
                let message = "Docker and Docker Compose are required for Docker deployment";
                self.require("docker", &["--version"], message).await?;
                self.require("docker", &["compose", "version"], message).await?;
            }
            Environment::Kubernetes => {
                let message = "kubectl and Helm are required for Kubernetes deployment";
                self.require("kubectl", &["version", "--client"], message).await?;
                self.require("helm", &["version"], message).await?;
            }
            Environment::Local | Environment::Github => {}
        }

        tracing::info!("Prerequisites check completed successfully");
        Ok(())
    }

    async fn deploy_local(&mut self) -> DeployResult<()> {
        tracing::info!("Starting local deployment...");

        self.exec_checked("cargo", &["build", "--release"]).await?;

        if self.options.skip_tests || !self.config.run_tests {
            tracing::info!("Tests skipped");
        } else {
            tracing::info!("Running tests...");
            match self.exec("cargo", &["test", "--workspace"]).await {
                Ok(out) if out.success() => tracing::info!("All tests passed successfully"),
                Ok(out) => self.warn(format!(
                    "Some tests failed (exit code {:?}), continuing deployment",
                    out.code
                )),
                Err(e) => self.warn(format!("Test execution failed: {e}")),
            }
        }

        let server = self.project_root.join("target/release/store-server");
        let server = server.to_string_lossy().into_owned();

        if self.config.migrations {
            tracing::info!("Running database migrations...");
            self.exec_checked(&server, &["migrate"]).await?;
            tracing::info!("Migrations completed successfully");
        } else {
            tracing::info!("Migrations disabled for this environment");
        }

        if self.config.fixtures {
            tracing::info!("Loading initial data...");
            if self.exec_lenient(&server, &["seed"], "Fixture loading").await {
                tracing::info!("Demo data loaded successfully");
            }
        } else {
            tracing::info!("Fixture loading disabled for this environment");
        }

        tracing::info!(command = %format!("{server} serve"), "Local deployment completed, start the server with");
        Ok(())
    }

    async fn deploy_docker(&mut self) -> DeployResult<()> {
        tracing::info!("Starting Docker deployment...");

        if let Err(e) = self.docker_steps().await {
            tracing::error!(error = %e, "Docker deployment failed, stopping containers");
            self.exec_lenient("docker", &["compose", "down"], "docker compose down")
                .await;
            return Err(e);
        }

        tracing::info!("Application is running at http://localhost:8000");
        Ok(())
    }

    async fn docker_steps(&mut self) -> DeployResult<()> {
        self.exec_checked("docker", &["compose", "build"]).await?;
        self.exec_checked("docker", &["compose", "up", "-d"]).await?;

        let wait = Duration::from_secs(self.config.startup_wait_secs);
        tracing::info!(secs = wait.as_secs(), "Waiting for services to be ready...");
        tokio::time::sleep(wait).await;

        if self.config.migrations {
            self.exec_checked("docker", &["compose", "exec", "-T", "web", "store-server", "migrate"])
                .await?;
        }
        if self.config.fixtures {
            self.exec_lenient(
                "docker",
                &["compose", "exec", "-T", "web", "store-server", "seed"],
                "Fixture loading",
            )
            .await;
        }
        Ok(())
    }

    async fn deploy_kubernetes(&mut self) -> DeployResult<()> {
        tracing::info!("Starting Kubernetes deployment...");

        let namespace = self
            .config
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let chart = self
            .config
            .helm_chart
            .clone()
            .unwrap_or_else(|| DEFAULT_CHART.to_string());

        // Fails when the namespace already exists
        if let Ok(out) = self.exec("kubectl", &["create", "namespace", namespace.as_str()]).await
            && !out.success()
        {
            tracing::info!(namespace = %namespace, "Namespace not created: {}", out.stderr.trim());
        }

        self.exec_checked("docker", &["build", "-t", IMAGE_TAG, "."]).await?;
        self.exec_checked(
            "helm",
            &[
                "upgrade",
                "--install",
                HELM_RELEASE,
                chart.as_str(),
                "--namespace",
                namespace.as_str(),
                "--set",
                "image.tag=latest",
                "--wait",
            ],
        )
        .await?;

        let services = self
            .exec_checked("kubectl", &["get", "services", "--namespace", namespace.as_str()])
            .await?;
        tracing::info!("Service information:\n{}", services.stdout.trim_end());
        Ok(())
    }

    async fn deploy_github(&mut self) -> DeployResult<()> {
        tracing::info!("Setting up GitHub Actions deployment...");

        self.exec_checked("git", &["status"]).await?;

        let workflow = self.project_root.join(".github/workflows/ci.yml");
        if !workflow.is_file() {
            return Err(DeployError::WorkflowMissing(workflow));
        }

        self.exec_checked("git", &["add", "."]).await?;

        let status = self.exec("git", &["status", "--porcelain"]).await?;
        if status.stdout.trim().is_empty() {
            tracing::info!("No changes to deploy");
            return Ok(());
        }

        self.exec_checked("git", &["commit", "-m", COMMIT_MESSAGE]).await?;
        self.exec_checked("git", &["push", "origin", "main"]).await?;
        tracing::info!("Changes pushed, GitHub Actions will handle the deployment");
        Ok(())
    }

    async fn health_check(&mut self) {
        if self.options.no_health_check {
            tracing::info!("Health check skipped");
            return;
        }
        let Some(url) = self.config.health_url.clone() else {
            tracing::info!("Health check not applicable for this environment");
            return;
        };

        tracing::info!(url = %url, "Performing health check...");
        let healthy = self.options.health.wait_healthy(&url).await;
        if !healthy {
            self.warn(format!(
                "Health check failed after {} attempts",
                self.options.health.attempts
            ));
        }
        self.outcome.healthy = Some(healthy);
    }
}
