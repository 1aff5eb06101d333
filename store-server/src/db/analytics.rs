//! Sales and catalog aggregates (staff dashboard)

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::OrderStatus;
use shared::util::round_money;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::BoxError;
use crate::error::ServiceResult;

#[derive(Debug, Clone, Serialize)]
pub struct SalesSummary {
    pub total_orders: i64,
    /// Every status is present, zero when unused
    pub orders_by_status: BTreeMap<String, i64>,
    /// Sum of non-cancelled order totals
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub customer_count: i64,
    pub active_product_count: i64,
    pub low_stock_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: i64,
    pub name: String,
    pub units_sold: i64,
    pub order_count: i64,
}

pub async fn summary(pool: &SqlitePool, low_stock_threshold: i64) -> ServiceResult<SalesSummary> {
    let mut orders_by_status: BTreeMap<String, i64> = OrderStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
            .fetch_all(pool)
            .await?;
    let mut total_orders = 0;
    for (status, count) in counts {
        total_orders += count;
        orders_by_status.insert(status, count);
    }

    // Totals are decimal strings, so they are summed here rather than in SQL
    let totals: Vec<String> = sqlx::query_scalar("SELECT total FROM orders WHERE status <> ?")
        .bind(OrderStatus::Cancelled.as_str())
        .fetch_all(pool)
        .await?;
    let mut revenue = Decimal::ZERO;
    for raw in &totals {
        revenue += Decimal::from_str(raw).map_err(BoxError::from)?;
    }
    let average_order_value = if totals.is_empty() {
        Decimal::ZERO
    } else {
        revenue / Decimal::from(totals.len() as i64)
    };

    Ok(SalesSummary {
        total_orders,
        orders_by_status,
        revenue: round_money(revenue),
        average_order_value: round_money(average_order_value),
        customer_count: super::customers::count(pool).await?,
        active_product_count: super::products::count_active(pool).await?,
        low_stock_count: super::products::count_low_stock(pool, low_stock_threshold).await?,
    })
}

/// Best sellers by units in non-cancelled orders
pub async fn top_products(pool: &SqlitePool, limit: i64) -> Result<Vec<TopProduct>, sqlx::Error> {
    sqlx::query_as::<_, TopProduct>(
        "SELECT oi.product_id AS product_id, p.name AS name,
                SUM(oi.quantity) AS units_sold, COUNT(DISTINCT oi.order_id) AS order_count
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.status <> ?
            GROUP BY oi.product_id, p.name
            ORDER BY units_sold DESC, p.name
            LIMIT ?",
    )
    .bind(OrderStatus::Cancelled.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await
}
