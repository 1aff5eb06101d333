use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use store_deploy::config::DeploymentConfig;
use store_deploy::runner::display_command;
use store_deploy::{
    CommandOutput, CommandRunner, DeployError, DeployOptions, DeployResult, Deployer, Environment,
};

/// Records every command line and answers from a table of canned outputs
#[derive(Clone, Default)]
struct RecordingRunner {
    calls: Arc<Mutex<Vec<String>>>,
    responses: Arc<Mutex<HashMap<String, CommandOutput>>>,
}

impl RecordingRunner {
    fn respond(&self, command: &str, code: i32, stdout: &str, stderr: &str) {
        self.responses.lock().unwrap().insert(
            command.to_string(),
            CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
    }

    fn fail(&self, command: &str) {
        self.respond(command, 1, "", "simulated failure");
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _cwd: &Path,
        _timeout: Duration,
    ) -> DeployResult<CommandOutput> {
        // Local server binary is an absolute path; record its file name only
        let program = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);
        let line = display_command(program, args);
        self.calls.lock().unwrap().push(line.clone());

        if let Some(canned) = self.responses.lock().unwrap().get(&line) {
            return Ok(canned.clone());
        }
        let stdout = if line == "cargo --version" {
            "cargo 1.85.0 (d73d2caf9 2024-12-31)\n".to_string()
        } else {
            String::new()
        };
        Ok(CommandOutput {
            code: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

fn options() -> DeployOptions {
    DeployOptions {
        no_health_check: true,
        ..Default::default()
    }
}

fn deployer(
    runner: &RecordingRunner,
    root: &Path,
    env: Environment,
    options: DeployOptions,
) -> Deployer<RecordingRunner> {
    let config = DeploymentConfig::default().for_env(env).clone();
    Deployer::new(runner.clone(), root, env, config, options)
}

#[tokio::test]
async fn test_local_flow() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("store.db"), b"db").unwrap();
    let runner = RecordingRunner::default();

    let outcome = deployer(&runner, root.path(), Environment::Local, options())
        .deploy()
        .await
        .unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "cargo --version",
            "git --version",
            "cargo build --release",
            "cargo test --workspace",
            "store-server migrate",
            "store-server seed",
        ]
    );
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.healthy, None);

    let backup = outcome.backup.unwrap();
    assert!(backup.join("store.db").is_file());
    assert!(
        backup
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("backup_local_")
    );
}

#[tokio::test]
async fn test_local_skip_flags_and_soft_failures() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner.fail("store-server seed");
    runner.respond("cargo --version", 0, "cargo 1.80.1 (x 2024-01-01)", "");

    let outcome = deployer(
        &runner,
        root.path(),
        Environment::Local,
        DeployOptions {
            skip_tests: true,
            skip_backup: true,
            ..options()
        },
    )
    .deploy()
    .await
    .unwrap();

    let calls = runner.calls();
    assert!(!calls.contains(&"cargo test --workspace".to_string()));
    assert!(outcome.backup.is_none());
    assert!(!root.path().join("backups").exists());
    // version mismatch and failed seed
    assert_eq!(outcome.warnings.len(), 2);
    assert!(outcome.warnings[0].contains("1.80.1"));
    assert!(outcome.warnings[1].contains("Fixture loading"));
}

#[tokio::test]
async fn test_local_failing_tests_only_warn() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner.respond("cargo test --workspace", 101, "", "test failed");

    let outcome = deployer(&runner, root.path(), Environment::Local, options())
        .deploy()
        .await
        .unwrap();
    assert!(runner.calls().contains(&"store-server migrate".to_string()));
    assert_eq!(outcome.warnings.len(), 1);
}

#[tokio::test]
async fn test_local_migration_failure_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner.fail("store-server migrate");

    let mut deployer = deployer(&runner, root.path(), Environment::Local, options());
    let err = deployer.deploy().await.unwrap_err();

    assert!(matches!(err, DeployError::Command { ref command, .. } if command.ends_with("migrate")));
    assert!(!runner.calls().contains(&"store-server seed".to_string()));
    // backup made before the failure is still there
    assert!(deployer.backup_path().unwrap().is_dir());
}

#[tokio::test]
async fn test_missing_tool_is_prerequisite_error() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner.fail("docker compose version");

    let err = deployer(&runner, root.path(), Environment::Docker, options())
        .deploy()
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Prerequisite(ref m) if m.contains("Docker")));
    assert_eq!(runner.calls().last().unwrap(), "docker compose version");
    assert!(!root.path().join("backups").exists());
}

#[tokio::test(start_paused = true)]
async fn test_docker_flow() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner.fail("docker compose exec -T web store-server seed");

    let outcome = deployer(&runner, root.path(), Environment::Docker, options())
        .deploy()
        .await
        .unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "cargo --version",
            "git --version",
            "docker --version",
            "docker compose version",
            "docker compose build",
            "docker compose up -d",
            "docker compose exec -T web store-server migrate",
            "docker compose exec -T web store-server seed",
        ]
    );
    assert_eq!(outcome.warnings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_docker_failure_tears_down() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner.fail("docker compose exec -T web store-server migrate");

    let result = deployer(&runner, root.path(), Environment::Docker, options())
        .deploy()
        .await;

    assert!(result.is_err());
    let calls = runner.calls();
    assert_eq!(calls.last().unwrap(), "docker compose down");
    assert!(!calls.contains(&"docker compose exec -T web store-server seed".to_string()));
}

#[tokio::test]
async fn test_kubernetes_flow() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    runner.respond(
        "kubectl create namespace anthony-store",
        1,
        "",
        "AlreadyExists",
    );
    runner.respond(
        "kubectl get services --namespace anthony-store",
        0,
        "NAME  TYPE\nweb   ClusterIP\n",
        "",
    );

    let outcome = deployer(&runner, root.path(), Environment::Kubernetes, options())
        .deploy()
        .await
        .unwrap();

    assert_eq!(
        runner.calls()[2..],
        [
            "kubectl version --client",
            "helm version",
            "kubectl create namespace anthony-store",
            "docker build -t anthony-store:latest .",
            "helm upgrade --install anthony-store ./charts/store-chart --namespace anthony-store --set image.tag=latest --wait",
            "kubectl get services --namespace anthony-store",
        ]
    );
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn test_github_requires_workflow() {
    let root = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();

    let err = deployer(&runner, root.path(), Environment::Github, options())
        .deploy()
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::WorkflowMissing(_)));
    assert_eq!(runner.calls().last().unwrap(), "git status");
}

#[tokio::test]
async fn test_github_pushes_changes() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join(".github/workflows")).unwrap();
    std::fs::write(root.path().join(".github/workflows/ci.yml"), "on: push").unwrap();
    let runner = RecordingRunner::default();
    runner.respond("git status --porcelain", 0, "M  src/lib.rs\n", "");

    deployer(&runner, root.path(), Environment::Github, options())
        .deploy()
        .await
        .unwrap();

    assert_eq!(
        runner.calls()[2..],
        [
            "git status",
            "git add .",
            "git status --porcelain",
            "git commit -m Deploy Anthony Store updates",
            "git push origin main",
        ]
    );
}

#[tokio::test]
async fn test_github_without_changes() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join(".github/workflows")).unwrap();
    std::fs::write(root.path().join(".github/workflows/ci.yml"), "on: push").unwrap();
    let runner = RecordingRunner::default();

    deployer(&runner, root.path(), Environment::Github, options())
        .deploy()
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.last().unwrap(), "git status --porcelain");
}

#[tokio::test]
async fn test_old_backups_are_pruned() {
    let root = tempfile::tempdir().unwrap();
    for ts in 1..=8 {
        std::fs::create_dir_all(root.path().join(format!("backups/backup_local_{ts}"))).unwrap();
    }
    let runner = RecordingRunner::default();

    deployer(&runner, root.path(), Environment::Local, options())
        .deploy()
        .await
        .unwrap();

    let remaining = std::fs::read_dir(root.path().join("backups")).unwrap().count();
    assert_eq!(remaining, 7);
    assert!(!root.path().join("backups/backup_local_1").exists());
    assert!(!root.path().join("backups/backup_local_2").exists());
}
