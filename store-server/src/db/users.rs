//! User accounts

use shared::models::User;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::util::now_millis;

/// User row including the password hash (never serialized)
#[derive(sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: i64,
    pub last_login_at: Option<i64>,
}

impl From<UserCredentials> for User {
    fn from(r: UserCredentials) -> Self {
        Self {
            id: r.id,
            email: r.email,
            is_staff: r.is_staff,
            is_active: r.is_active,
            created_at: r.created_at,
            last_login_at: r.last_login_at,
        }
    }
}

pub async fn find_credentials(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserCredentials>, sqlx::Error> {
    sqlx::query_as::<_, UserCredentials>(
        "SELECT id, email, password_hash, is_staff, is_active, created_at, last_login_at
            FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_credentials_by_id(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<UserCredentials>, sqlx::Error> {
    sqlx::query_as::<_, UserCredentials>(
        "SELECT id, email, password_hash, is_staff, is_active, created_at, last_login_at
            FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, email, is_staff, is_active, created_at, last_login_at
            FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Insert a user, returning its id
pub async fn insert(
    conn: impl SqliteExecutor<'_>,
    email: &str,
    password_hash: &str,
    is_staff: bool,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (email, password_hash, is_staff, is_active, created_at)
            VALUES (?, ?, ?, 1, ?)",
    )
    .bind(email)
    .bind(password_hash)
    .bind(is_staff)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn touch_last_login(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Promote an existing account to staff and reset its password
pub async fn promote_to_staff(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_staff = 1, is_active = 1, password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(is_active)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
