//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::double_option;

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: Option<String>,
    /// Unit price, 2 decimal places
    pub price: Decimal,
    pub category_id: i64,
    pub category_slug: String,
    pub category_name: String,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Category slug
    pub category: String,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    /// Category slug
    pub category: Option<String>,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

/// Highest accepted unit price
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Normalize a price: within `0..=MAX_PRICE`, kept to 2 decimal places.
pub fn normalize_price(price: Decimal) -> Option<Decimal> {
    if price < Decimal::ZERO || price > MAX_PRICE {
        return None;
    }
    Some(crate::util::round_money(price))
}
