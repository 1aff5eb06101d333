//! Stock levels and the movement ledger

use shared::error::{AppError, ErrorCode};
use shared::models::InventoryMovement;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::ServiceResult;
use crate::util::now_millis;

/// Largest stock change a single manual adjustment may make
pub const MAX_ADJUSTMENT: u64 = 1_000_000_000;

/// Apply `delta` to a product's stock and record the movement.
///
/// The update is conditional (`stock + delta >= 0`), so concurrent
/// decrements can never drive stock negative. Returns the new stock.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    product_id: i64,
    delta: i64,
    reason: &str,
) -> ServiceResult<i64> {
    let now = now_millis();
    let updated = sqlx::query(
        "UPDATE products SET stock = stock + ?, updated_at = ?
            WHERE id = ? AND stock + ? >= 0",
    )
    .bind(delta)
    .bind(now)
    .bind(product_id)
    .bind(delta)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;
        return Err(match stock {
            None => AppError::new(ErrorCode::ProductNotFound).with_detail("product_id", product_id),
            Some(available) => AppError::new(ErrorCode::InsufficientStock)
                .with_detail("product_id", product_id)
                .with_detail("available", available)
                .with_detail("requested", delta.unsigned_abs()),
        }
        .into());
    }

    let stock_after: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO inventory_movements (product_id, delta, reason, stock_after, created_at)
            VALUES (?, ?, ?, ?, ?)",
    )
    .bind(product_id)
    .bind(delta)
    .bind(reason)
    .bind(stock_after)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(stock_after)
}

/// Manual adjustment in its own transaction
pub async fn adjust(
    pool: &SqlitePool,
    product_id: i64,
    delta: i64,
    reason: &str,
) -> ServiceResult<i64> {
    if delta == 0 {
        return Err(AppError::with_message(
            ErrorCode::InvalidStockAdjustment,
            "Adjustment must change the stock",
        )
        .into());
    }
    if delta.unsigned_abs() > MAX_ADJUSTMENT {
        return Err(AppError::with_message(
            ErrorCode::InvalidStockAdjustment,
            format!("Adjustment must be within ±{MAX_ADJUSTMENT}"),
        )
        .with_detail("delta", delta)
        .into());
    }

    let mut tx = pool.begin().await?;
    let stock = apply_delta(&mut *tx, product_id, delta, reason).await?;
    tx.commit().await?;

    tracing::info!(product_id, delta, stock, reason, "Stock adjusted");
    Ok(stock)
}

/// Movements of one product, newest first
pub async fn movements(
    pool: &SqlitePool,
    product_id: i64,
) -> Result<Vec<InventoryMovement>, sqlx::Error> {
    sqlx::query_as::<_, InventoryMovement>(
        "SELECT id, product_id, delta, reason, stock_after, created_at
            FROM inventory_movements WHERE product_id = ?
            ORDER BY created_at DESC, id DESC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
}
