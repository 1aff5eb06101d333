//! `deployment-config.json`
//!
//! One object per target environment. Values in the file override the
//! built-in defaults key by key; keys the file leaves out keep their default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::{DeployError, DeployResult};

pub const CONFIG_FILE: &str = "deployment-config.json";

/// Deployment target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Docker,
    Kubernetes,
    Github,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Local,
        Environment::Docker,
        Environment::Kubernetes,
        Environment::Github,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Docker => "docker",
            Self::Kubernetes => "kubernetes",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Sqlite,
    Postgresql,
}

/// Settings of one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Expected toolchain version prefix (mismatch only warns)
    pub rust_version: String,
    pub database: DatabaseKind,
    pub migrations: bool,
    /// Load demo data after migrating
    pub fixtures: bool,
    pub run_tests: bool,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub helm_chart: Option<String>,
    /// Polled after deployment; no check when absent
    #[serde(default)]
    pub health_url: Option<String>,
    /// Pause after starting containers
    #[serde(default)]
    pub startup_wait_secs: u64,
}

/// The whole file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub local: EnvConfig,
    pub docker: EnvConfig,
    pub kubernetes: EnvConfig,
    pub github: EnvConfig,
}

impl DeploymentConfig {
    pub fn for_env(&self, env: Environment) -> &EnvConfig {
        match env {
            Environment::Local => &self.local,
            Environment::Docker => &self.docker,
            Environment::Kubernetes => &self.kubernetes,
            Environment::Github => &self.github,
        }
    }
}

fn env_defaults(database: DatabaseKind, fixtures: bool) -> EnvConfig {
    EnvConfig {
        rust_version: "1.85".into(),
        database,
        migrations: true,
        fixtures,
        run_tests: true,
        namespace: None,
        helm_chart: None,
        health_url: None,
        startup_wait_secs: 0,
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            local: EnvConfig {
                health_url: Some("http://localhost:8000/health".into()),
                ..env_defaults(DatabaseKind::Sqlite, true)
            },
            docker: EnvConfig {
                health_url: Some("http://localhost:8000/health".into()),
                startup_wait_secs: 30,
                ..env_defaults(DatabaseKind::Postgresql, true)
            },
            kubernetes: EnvConfig {
                namespace: Some("anthony-store".into()),
                helm_chart: Some("./charts/store-chart".into()),
                ..env_defaults(DatabaseKind::Postgresql, false)
            },
            github: env_defaults(DatabaseKind::Postgresql, false),
        }
    }
}

/// Overlay `user` onto `base`, one environment object at a time
fn merge(base: &mut Value, user: &Value) {
    let (Some(base), Some(user)) = (base.as_object_mut(), user.as_object()) else {
        return;
    };
    for env in Environment::ALL {
        let (Some(target), Some(overrides)) = (
            base.get_mut(env.as_str()).and_then(Value::as_object_mut),
            user.get(env.as_str()).and_then(Value::as_object),
        ) else {
            continue;
        };
        for (key, value) in overrides {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn parse(raw: &str) -> DeployResult<DeploymentConfig> {
    let user: Value =
        serde_json::from_str(raw).map_err(|e| DeployError::Config(format!("invalid JSON: {e}")))?;
    if !user.is_object() {
        return Err(DeployError::Config("top level must be an object".into()));
    }
    let mut merged = serde_json::to_value(DeploymentConfig::default())
        .map_err(|e| DeployError::Config(e.to_string()))?;
    merge(&mut merged, &user);
    serde_json::from_value(merged).map_err(|e| DeployError::Config(e.to_string()))
}

/// Load the config from `project_root`.
///
/// A missing file is created with the defaults. A file that cannot be read
/// or parsed is reported and the defaults are used.
pub fn load(project_root: &Path) -> DeploymentConfig {
    let path = project_root.join(CONFIG_FILE);

    if path.exists() {
        match std::fs::read_to_string(&path)
            .map_err(DeployError::from)
            .and_then(|raw| parse(&raw))
        {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load config file, using defaults");
                return DeploymentConfig::default();
            }
        }
    }

    let defaults = DeploymentConfig::default();
    match serde_json::to_string_pretty(&defaults) {
        Ok(body) => match std::fs::write(&path, body) {
            Ok(()) => tracing::info!(path = %path.display(), "Created default deployment config"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to save default config"),
        },
        Err(e) => tracing::warn!(error = %e, "Failed to render default config"),
    }
    defaults
}
