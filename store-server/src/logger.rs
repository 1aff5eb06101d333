//! Logging Infrastructure
//!
//! - Console output, pretty in development and JSON in production
//! - Optional daily rotating application logs under `LOG_DIR/app`
//!   (deleted after 14 days)
//! - Security events (`target: "security"`) under `LOG_DIR/security`

use std::fs;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

const APP_LOG_RETENTION_DAYS: i64 = 14;

/// Remove `app.YYYY-MM-DD` files older than the retention window.
/// Returns the number of deleted files.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date_part) = name.strip_prefix("app.")
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }

    Ok(removed)
}

/// Application and security file layers, each behind a non-blocking writer.
/// The returned guards flush pending lines when dropped.
fn file_layers<S>(log_dir: &Path) -> anyhow::Result<(impl Layer<S> + Send + Sync, Vec<WorkerGuard>)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let app_log_dir = log_dir.join("app");
    let security_log_dir = log_dir.join("security");
    fs::create_dir_all(&app_log_dir)?;
    fs::create_dir_all(&security_log_dir)?;

    let (app_writer, app_guard) =
        tracing_appender::non_blocking(RollingFileAppender::new(Rotation::DAILY, app_log_dir, "app"));
    let app_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_writer(app_writer)
        .with_filter(filter_fn(|meta| meta.target() != "security"));

    let (security_writer, security_guard) = tracing_appender::non_blocking(
        RollingFileAppender::new(Rotation::DAILY, security_log_dir, "security"),
    );
    let security_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_writer(security_writer)
        .with_filter(filter_fn(|meta| meta.target() == "security"));

    Ok((app_layer.and_then(security_layer), vec![app_guard, security_guard]))
}

/// Initialize the logging system
///
/// `RUST_LOG` wins over `level`. With `log_dir` set, application and
/// security events are also written to daily rotating files; keep the
/// returned guards alive until exit.
pub fn init_logger(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<Vec<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let (file_layers, guards) = match log_dir {
        Some(dir) => {
            let (layers, guards) = file_layers(Path::new(dir))?;
            tokio::spawn(periodic_cleanup(PathBuf::from(dir)));
            (Some(layers), guards)
        }
        None => (None, Vec::new()),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layers)
        .try_init()?;

    Ok(guards)
}

/// Runs every hour to clean old logs
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Security log helper, written under `target: "security"`
///
/// ```ignore
/// security_log!(WARN, "login_failed", email = %email, ip = %ip);
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(target: "security", event = $event, $($arg)*)
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(target: "security", event = $event, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_only_expired_app_logs() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();

        let today = chrono::Local::now().date_naive();
        let old = today - chrono::Duration::days(30);
        let old_name = format!("app.{}", old.format("%Y-%m-%d"));
        let fresh_name = format!("app.{}", today.format("%Y-%m-%d"));
        fs::write(app.join(&old_name), "old").unwrap();
        fs::write(app.join(&fresh_name), "fresh").unwrap();
        fs::write(app.join("notes.txt"), "keep").unwrap();

        let removed = cleanup_old_logs(dir.path()).unwrap();
        assert_eq!(removed, 1);
        assert!(!app.join(old_name).exists());
        assert!(app.join(fresh_name).exists());
        assert!(app.join("notes.txt").exists());
    }

    fn only_file(dir: &Path) -> String {
        let files: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
        assert_eq!(files.len(), 1);
        fs::read_to_string(&files[0]).unwrap()
    }

    #[test]
    fn test_file_layers_split_security_events() {
        let dir = tempfile::tempdir().unwrap();
        let (layers, guards) = file_layers(dir.path()).unwrap();
        let subscriber = tracing_subscriber::registry().with(layers);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(order = "ORD-1", "Order placed");
            crate::security_log!(WARN, "login_failed", email = "a@example.com");
        });
        // flushes the background writers
        drop(guards);

        let app = only_file(&dir.path().join("app"));
        assert!(app.contains("Order placed"));
        assert!(!app.contains("login_failed"));

        let security = only_file(&dir.path().join("security"));
        assert!(security.contains("login_failed"));
        assert!(!security.contains("Order placed"));
    }

    #[test]
    fn test_cleanup_without_app_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 0);
    }
}
