//! Customer profiles

use shared::error::{AppError, ErrorCode};
use shared::models::{Customer, CustomerCreate, CustomerUpdate};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::error::{ServiceResult, is_unique_violation};
use crate::util::{normalize_email, now_millis};

const COLUMNS: &str = "id, user_id, first_name, last_name, email, phone, address, city, country, created_at, updated_at";

fn email_taken(email: &str) -> AppError {
    AppError::new(ErrorCode::CustomerEmailExists).with_detail("email", email)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(&format!("SELECT {COLUMNS} FROM customers WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(&format!("SELECT {COLUMNS} FROM customers WHERE user_id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Insert a profile, optionally linked to a user account
pub async fn insert(
    conn: impl SqliteExecutor<'_>,
    user_id: Option<i64>,
    data: &CustomerCreate,
) -> ServiceResult<i64> {
    let now = now_millis();
    let email = normalize_email(&data.email);
    let result = sqlx::query(
        "INSERT INTO customers
            (user_id, first_name, last_name, email, phone, address, city, country, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(data.first_name.trim())
    .bind(data.last_name.trim())
    .bind(&email)
    .bind(&data.phone)
    .bind(&data.address)
    .bind(&data.city)
    .bind(&data.country)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            email_taken(&email).into()
        } else {
            crate::error::ServiceError::from(e)
        }
    })?;
    Ok(result.last_insert_rowid())
}

/// Staff listing with optional name/email search
pub async fn list(
    pool: &SqlitePool,
    q: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Customer>, u64), sqlx::Error> {
    fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, q: Option<&str>) {
        if let Some(q) = q.map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = super::contains_pattern(q);
            qb.push(" WHERE (lower(first_name) LIKE ")
                .push_bind(pattern.clone())
                .push(super::LIKE_ESCAPE)
                .push(" OR lower(last_name) LIKE ")
                .push_bind(pattern.clone())
                .push(super::LIKE_ESCAPE)
                .push(" OR lower(email) LIKE ")
                .push_bind(pattern)
                .push(super::LIKE_ESCAPE)
                .push(")");
        }
    }

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM customers");
    push_filter(&mut count_qb, q);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM customers"));
    push_filter(&mut qb, q);
    qb.push(" ORDER BY last_name, first_name, id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = qb.build_query_as::<Customer>().fetch_all(pool).await?;

    Ok((items, total.max(0) as u64))
}

/// Apply a partial update, returning the new row (None if missing)
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: &CustomerUpdate,
) -> ServiceResult<Option<Customer>> {
    let Some(mut c) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    if let Some(v) = &data.first_name {
        c.first_name = v.trim().to_string();
    }
    if let Some(v) = &data.last_name {
        c.last_name = v.trim().to_string();
    }
    if let Some(v) = &data.email {
        c.email = normalize_email(v);
    }
    if data.phone.is_some() {
        c.phone = data.phone.clone();
    }
    if data.address.is_some() {
        c.address = data.address.clone();
    }
    if data.city.is_some() {
        c.city = data.city.clone();
    }
    if data.country.is_some() {
        c.country = data.country.clone();
    }
    c.updated_at = now_millis();

    sqlx::query(
        "UPDATE customers SET first_name = ?, last_name = ?, email = ?, phone = ?,
            address = ?, city = ?, country = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&c.first_name)
    .bind(&c.last_name)
    .bind(&c.email)
    .bind(&c.phone)
    .bind(&c.address)
    .bind(&c.city)
    .bind(&c.country)
    .bind(c.updated_at)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            email_taken(&c.email).into()
        } else {
            crate::error::ServiceError::from(e)
        }
    })?;

    Ok(Some(c))
}

/// Delete a profile; customers with orders are kept
pub async fn delete(pool: &SqlitePool, id: i64) -> ServiceResult<bool> {
    let orders = super::orders::count_for_customer(pool, id).await?;
    if orders > 0 {
        return Err(AppError::new(ErrorCode::CustomerHasOrders)
            .with_detail("order_count", orders)
            .into());
    }

    let result = sqlx::query("DELETE FROM customers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(pool)
        .await
}
