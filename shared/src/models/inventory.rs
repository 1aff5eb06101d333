//! Inventory movement model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One stock change of a product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: i64,
    pub product_id: i64,
    /// Signed change (negative = stock removed)
    pub delta: i64,
    pub reason: String,
    /// Stock level after the change
    pub stock_after: i64,
    pub created_at: i64,
}

/// Manual stock adjustment payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StockAdjustment {
    pub delta: i64,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
}

/// Movement reason recorded when an order reserves stock
pub fn order_placed_reason(order_number: &str) -> String {
    format!("order:{order_number}")
}

/// Movement reason recorded when a cancelled order releases stock
pub fn order_cancelled_reason(order_number: &str) -> String {
    format!("order_cancelled:{order_number}")
}
