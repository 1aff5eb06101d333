//! Database access layer (SQLite via sqlx)

pub mod analytics;
pub mod categories;
pub mod customers;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod users;

use shared::error::{AppError, ErrorCode};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Open a pool for `url`, creating the file if needed.
///
/// In-memory databases get a single never-recycled connection so every
/// query sees the same database.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = url.contains(":memory:");
    let mut opts = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    if !in_memory {
        opts = opts.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_opts = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    pool_opts.connect_with(opts).await
}

/// Apply pending migrations
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Liveness check used by the health endpoint
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Escape clause paired with [`contains_pattern`]
pub(crate) const LIKE_ESCAPE: &str = " ESCAPE '\\'";

/// Lowercased `%term%` pattern in which `%`, `_` and `\` match literally
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// True when `err` is a UNIQUE violation on a `slug` column
pub(crate) fn is_slug_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation() && db.message().ends_with(".slug"))
}

/// Map a slug UNIQUE violation (a concurrent writer won the slug) to a 409
pub(crate) fn slug_conflict(err: sqlx::Error, slug: &str) -> crate::error::ServiceError {
    if is_slug_violation(&err) {
        AppError::with_message(ErrorCode::AlreadyExists, "Slug is already taken")
            .with_detail("slug", slug)
            .into()
    } else {
        err.into()
    }
}

/// First free slug derived from `base` in `table` (`base`, `base-2`, `base-3`, ...).
/// Words in `reserved` are treated as taken.
pub(crate) async fn unique_slug(
    conn: &mut sqlx::SqliteConnection,
    table: &'static str,
    base: &str,
    reserved: &[&str],
) -> Result<String, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE slug = ?");
    let mut candidate = base.to_string();
    let mut n = 2;
    loop {
        let taken = reserved.contains(&candidate.as_str())
            || sqlx::query_scalar::<_, i64>(&sql)
                .bind(&candidate)
                .fetch_one(&mut *conn)
                .await?
                > 0;
        if !taken {
            return Ok(candidate);
        }
        candidate = shared::util::numbered_slug(base, n);
        n += 1;
    }
}
