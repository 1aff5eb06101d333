//! Orders and their lines
//!
//! Placing an order and cancelling it are single transactions: order rows,
//! stock changes and inventory movements commit together or not at all.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::inventory::{order_cancelled_reason, order_placed_reason};
use shared::models::order::{line_total, normalize_items};
use shared::models::{Order, OrderCreate, OrderItem, OrderStatus};
use shared::util::round_money;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;

use super::BoxError;
use super::inventory::apply_delta;
use crate::error::ServiceResult;
use crate::util::{generate_order_number, now_millis};

const ORDER_COLUMNS: &str =
    "id, order_number, customer_id, status, total, shipping_address, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    customer_id: i64,
    status: String,
    total: String,
    shipping_address: Option<String>,
    notes: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    product_name: String,
    unit_price: String,
    quantity: i64,
    line_total: String,
}

impl TryFrom<ItemRow> for OrderItem {
    type Error = BoxError;

    fn try_from(r: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            product_id: r.product_id,
            product_name: r.product_name,
            unit_price: Decimal::from_str(&r.unit_price)?,
            quantity: r.quantity,
            line_total: Decimal::from_str(&r.line_total)?,
        })
    }
}

fn assemble(row: OrderRow, items: Vec<OrderItem>) -> Result<Order, BoxError> {
    Ok(Order {
        status: OrderStatus::from_str(&row.status)?,
        total: Decimal::from_str(&row.total)?,
        id: row.id,
        order_number: row.order_number,
        customer_id: row.customer_id,
        shipping_address: row.shipping_address,
        notes: row.notes,
        items,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Load the lines of several orders at once
async fn load_items(
    conn: &mut SqliteConnection,
    order_ids: &[i64],
) -> Result<HashMap<i64, Vec<OrderItem>>, BoxError> {
    let mut map: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(map);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT id, order_id, product_id, product_name, unit_price, quantity, line_total
            FROM order_items WHERE order_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in order_ids {
        separated.push_bind(*id);
    }
    qb.push(") ORDER BY id");

    let rows = qb.build_query_as::<ItemRow>().fetch_all(&mut *conn).await?;
    for row in rows {
        let order_id = row.order_id;
        map.entry(order_id).or_default().push(OrderItem::try_from(row)?);
    }
    Ok(map)
}

async fn load(conn: &mut SqliteConnection, id: i64) -> Result<Option<Order>, BoxError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let items = load_items(conn, &[row.id]).await?.remove(&row.id).unwrap_or_default();
    Ok(Some(assemble(row, items)?))
}

pub async fn find(pool: &SqlitePool, id: i64) -> ServiceResult<Option<Order>> {
    let mut conn = pool.acquire().await?;
    Ok(load(&mut *conn, id).await?)
}

/// Place an order for `customer_id`.
///
/// Every line reserves stock with a conditional decrement; the first line
/// that cannot be served rolls the whole order back.
pub async fn create(pool: &SqlitePool, customer_id: i64, data: &OrderCreate) -> ServiceResult<Order> {
    let lines = normalize_items(&data.items)?;
    let order_number = generate_order_number();
    let now = now_millis();

    let mut tx = pool.begin().await?;

    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        let product: Option<(String, String, bool)> =
            sqlx::query_as("SELECT name, price, is_active FROM products WHERE id = ?")
                .bind(line.product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((name, price, is_active)) = product else {
            return Err(AppError::new(ErrorCode::ProductNotFound)
                .with_detail("product_id", line.product_id)
                .into());
        };
        if !is_active {
            return Err(AppError::new(ErrorCode::ProductInactive)
                .with_detail("product_id", line.product_id)
                .into());
        }
        let unit_price = Decimal::from_str(&price).map_err(BoxError::from)?;
        priced.push((line, name, unit_price, line_total(unit_price, line.quantity)));
    }
    let total = round_money(priced.iter().map(|(_, _, _, t)| *t).sum::<Decimal>());

    let order_id = sqlx::query(
        "INSERT INTO orders (order_number, customer_id, status, total, shipping_address, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order_number)
    .bind(customer_id)
    .bind(OrderStatus::Pending.as_str())
    .bind(total.to_string())
    .bind(&data.shipping_address)
    .bind(&data.notes)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let reason = order_placed_reason(&order_number);
    for (line, name, unit_price, line_total) in &priced {
        apply_delta(&mut *tx, line.product_id, -line.quantity, &reason).await?;
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, product_name, unit_price, quantity, line_total)
                VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(name)
        .bind(unit_price.to_string())
        .bind(line.quantity)
        .bind(line_total.to_string())
        .execute(&mut *tx)
        .await?;
    }

    let order = load(&mut *tx, order_id)
        .await?
        .ok_or_else(|| AppError::internal("Order vanished inside its own transaction"))?;
    tx.commit().await?;

    tracing::info!(
        order = %order.order_number,
        customer_id,
        total = %order.total,
        lines = order.items.len(),
        "Order placed"
    );
    Ok(order)
}

/// Listing filters
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub customer_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// Page of orders, newest first, plus the total match count
pub async fn list(
    pool: &SqlitePool,
    filter: OrderFilter,
    limit: i64,
    offset: i64,
) -> ServiceResult<(Vec<Order>, u64)> {
    fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: OrderFilter) {
        qb.push(" WHERE 1 = 1");
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
    }

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
    push_where(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    push_where(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = qb.build_query_as::<OrderRow>().fetch_all(pool).await?;

    let mut conn = pool.acquire().await?;
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut items = load_items(&mut *conn, &ids).await?;
    let orders = rows
        .into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            assemble(row, lines)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((orders, total.max(0) as u64))
}

/// Move an order to `next`, releasing stock when it is cancelled.
///
/// The update only applies while the order still has the status it was
/// read with, so two concurrent changes cannot both succeed.
pub async fn change_status(
    pool: &SqlitePool,
    order: &Order,
    next: OrderStatus,
) -> ServiceResult<Order> {
    order.status.transition(next)?;

    let mut tx = pool.begin().await?;
    let updated = sqlx::query(
        "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(next.as_str())
    .bind(now_millis())
    .bind(order.id)
    .bind(order.status.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            "Order status changed concurrently",
        )
        .with_detail("order_id", order.id)
        .into());
    }

    if next == OrderStatus::Cancelled {
        let reason = order_cancelled_reason(&order.order_number);
        for item in &order.items {
            apply_delta(&mut *tx, item.product_id, item.quantity, &reason).await?;
        }
    }

    let updated = load(&mut *tx, order.id)
        .await?
        .ok_or_else(|| AppError::internal("Order vanished inside its own transaction"))?;
    tx.commit().await?;

    tracing::info!(
        order = %order.order_number,
        from = %order.status,
        to = %next,
        "Order status changed"
    );
    Ok(updated)
}

pub async fn count_for_customer(pool: &SqlitePool, customer_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = ?")
        .bind(customer_id)
        .fetch_one(pool)
        .await
}
