//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ErrorCode};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Allowed forward moves of the lifecycle
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Shipped)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Delivered and cancelled orders never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Validate a transition, returning the error clients see
    pub fn transition(&self, next: OrderStatus) -> AppResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                format!("Cannot change order status from {self} to {next}"),
            )
            .with_detail("from", self.as_str())
            .with_detail("to", next.as_str()))
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::validation(format!("Unknown order status: {other}"))),
        }
    }
}

/// Order line (product name and price are snapshots taken at order time)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub line_total: Decimal,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub total: Decimal,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Requested order line
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub items: Vec<OrderItemInput>,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    /// Only honoured for staff; customers always order for themselves
    pub customer_id: Option<i64>,
}

/// Status change payload (staff)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Largest quantity of one product in a single order
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

fn invalid_quantity(product_id: i64, quantity: i64) -> AppError {
    AppError::new(ErrorCode::InvalidQuantity)
        .with_detail("product_id", product_id)
        .with_detail("quantity", quantity)
        .with_detail("max", MAX_LINE_QUANTITY)
}

/// Validate requested lines and merge repeated products.
///
/// Lines keep the order in which each product first appears. A merged
/// quantity above [`MAX_LINE_QUANTITY`] is rejected.
pub fn normalize_items(items: &[OrderItemInput]) -> AppResult<Vec<OrderItemInput>> {
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }

    let mut merged: Vec<OrderItemInput> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 || item.quantity > MAX_LINE_QUANTITY {
            return Err(invalid_quantity(item.product_id, item.quantity));
        }
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .filter(|q| *q <= MAX_LINE_QUANTITY)
                    .ok_or_else(|| invalid_quantity(item.product_id, item.quantity))?;
            }
            None => merged.push(*item),
        }
    }
    Ok(merged)
}

/// Line total for a quantity at a unit price
pub fn line_total(unit_price: Decimal, quantity: i64) -> Decimal {
    crate::util::round_money(unit_price * Decimal::from(quantity))
}
