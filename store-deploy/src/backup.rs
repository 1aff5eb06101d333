//! Pre-deployment backups under `backups/`

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Environment;
use crate::error::{DeployError, DeployResult};

pub const BACKUP_DIR: &str = "backups";
pub const KEEP_BACKUPS: usize = 7;

/// Files SQLite keeps beside a database in WAL mode
const WAL_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// Database files the server may be using in the project root
fn database_files(project_root: &Path) -> DeployResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(project_root)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_db = match path.file_name().and_then(|n| n.to_str()) {
            Some("store.db") => true,
            Some(name) => name.ends_with(".sqlite3"),
            None => false,
        };
        if is_db {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy the database, `media/` and `.env` into
/// `backups/backup_{env}_{timestamp}` and return that directory
pub fn create_backup(project_root: &Path, env: Environment, timestamp: i64) -> DeployResult<PathBuf> {
    tracing::info!("Creating backup...");
    let backup_path = project_root
        .join(BACKUP_DIR)
        .join(format!("backup_{env}_{timestamp}"));

    let run = || -> std::io::Result<()> {
        fs::create_dir_all(&backup_path)?;

        for db in database_files(project_root).map_err(std::io::Error::other)? {
            let Some(name) = db.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // WAL before the main file so a checkpoint in between loses nothing
            for suffix in WAL_SUFFIXES {
                let sibling = project_root.join(format!("{name}{suffix}"));
                if sibling.is_file() {
                    fs::copy(&sibling, backup_path.join(format!("{name}{suffix}")))?;
                }
            }
            fs::copy(&db, backup_path.join(name))?;
            tracing::info!(file = %db.display(), "Database backup created");
        }

        let media = project_root.join("media");
        if media.is_dir() {
            copy_dir(&media, &backup_path.join("media"))?;
            tracing::info!("Media files backup created");
        }

        let env_file = project_root.join(".env");
        if env_file.is_file() {
            fs::copy(&env_file, backup_path.join(".env"))?;
            tracing::info!("Environment file backup created");
        }
        Ok(())
    };
    run().map_err(|e| DeployError::Backup(e.to_string()))?;

    tracing::info!(path = %backup_path.display(), "Backup created successfully");
    Ok(backup_path)
}

/// Sort key: the trailing unix timestamp, then the name
fn backup_key(path: &Path) -> (i64, String) {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let ts = name
        .rsplit('_')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (ts, name)
}

/// Delete all but the `keep` newest `backup_*` entries. Returns how many
/// were removed.
pub fn cleanup_old_backups(backup_dir: &Path, keep: usize) -> DeployResult<usize> {
    if !backup_dir.is_dir() {
        return Ok(0);
    }
    let mut backups: Vec<PathBuf> = fs::read_dir(backup_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("backup_"))
        })
        .collect();
    if backups.len() <= keep {
        return Ok(0);
    }
    backups.sort_by_key(|p| backup_key(p));

    let stale = backups.len() - keep;
    for path in &backups[..stale] {
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
    }
    tracing::info!(removed = stale, "Old backups cleaned up");
    Ok(stale)
}
