//! Products
//!
//! Prices are stored as decimal strings; filtering and ordering by price go
//! through `CAST(price AS REAL)`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::product::{MAX_PRICE, normalize_price};
use shared::models::{Category, Product, ProductCreate, ProductUpdate};
use shared::util::slugify;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

use super::BoxError;
use super::inventory::apply_delta;
use crate::error::{ServiceError, ServiceResult, is_unique_violation};
use crate::util::now_millis;

/// Ledger reason for the stock a product is created with
pub const INITIAL_STOCK_REASON: &str = "initial_stock";
/// Ledger reason for a stock level set through a product update
pub const PRODUCT_UPDATE_REASON: &str = "product_update";

const SELECT: &str = "SELECT p.id, p.name, p.slug, p.sku, p.description, p.price, p.category_id,
        c.slug AS category_slug, c.name AS category_name, p.stock, p.is_active,
        p.created_at, p.updated_at
    FROM products p
    JOIN categories c ON c.id = p.category_id";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    slug: String,
    sku: String,
    description: Option<String>,
    price: String,
    category_id: i64,
    category_slug: String,
    category_name: String,
    stock: i64,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = BoxError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            price: Decimal::from_str(&r.price)?,
            id: r.id,
            name: r.name,
            slug: r.slug,
            sku: r.sku,
            description: r.description,
            category_id: r.category_id,
            category_slug: r.category_slug,
            category_name: r.category_name,
            stock: r.stock,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, BoxError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// `ordering` query parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ProductOrdering {
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "-price")]
    PriceDesc,
    #[serde(rename = "newest")]
    Newest,
}

impl ProductOrdering {
    fn sql(self) -> &'static str {
        match self {
            Self::Name => " ORDER BY p.name, p.id",
            Self::Price => " ORDER BY CAST(p.price AS REAL), p.id",
            Self::PriceDesc => " ORDER BY CAST(p.price AS REAL) DESC, p.id",
            Self::Newest => " ORDER BY p.created_at DESC, p.id DESC",
        }
    }
}

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to this category and its descendants (by path)
    pub category_path: Option<String>,
    /// Case-insensitive match on name, SKU or description
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub ordering: ProductOrdering,
    pub include_inactive: bool,
}

impl ProductFilter {
    pub fn for_category(category: &Category) -> Self {
        Self {
            category_path: Some(category.path.clone()),
            ..Default::default()
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if !self.include_inactive {
            qb.push(" AND p.is_active = 1");
        }
        if let Some(path) = &self.category_path {
            qb.push(" AND c.path LIKE ").push_bind(format!("{path}%"));
        }
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = super::contains_pattern(q);
            qb.push(" AND (lower(p.name) LIKE ")
                .push_bind(pattern.clone())
                .push(super::LIKE_ESCAPE)
                .push(" OR lower(p.sku) LIKE ")
                .push_bind(pattern.clone())
                .push(super::LIKE_ESCAPE)
                .push(" OR lower(coalesce(p.description, '')) LIKE ")
                .push_bind(pattern)
                .push(super::LIKE_ESCAPE)
                .push(")");
        }
        if let Some(min) = self.min_price.and_then(|d| d.to_f64()) {
            qb.push(" AND CAST(p.price AS REAL) >= ").push_bind(min);
        }
        if let Some(max) = self.max_price.and_then(|d| d.to_f64()) {
            qb.push(" AND CAST(p.price AS REAL) <= ").push_bind(max);
        }
        match self.in_stock {
            Some(true) => {
                qb.push(" AND p.stock > 0");
            }
            Some(false) => {
                qb.push(" AND p.stock = 0");
            }
            None => {}
        }
    }
}

/// Filtered page of products plus the total match count
pub async fn list(
    pool: &SqlitePool,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> ServiceResult<(Vec<Product>, u64)> {
    let mut count_qb = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM products p JOIN categories c ON c.id = p.category_id",
    );
    filter.push_where(&mut count_qb);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT);
    filter.push_where(&mut qb);
    qb.push(filter.ordering.sql());
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<ProductRow>().fetch_all(pool).await?;

    Ok((into_products(rows)?, total.max(0) as u64))
}

/// Every product matching the filter, unpaginated
pub async fn list_all(pool: &SqlitePool, filter: &ProductFilter) -> ServiceResult<Vec<Product>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT);
    filter.push_where(&mut qb);
    qb.push(filter.ordering.sql());
    let rows = qb.build_query_as::<ProductRow>().fetch_all(pool).await?;
    Ok(into_products(rows)?)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> ServiceResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Product::try_from).transpose()?)
}

/// Like [`find_by_id`] but a missing row is a `ProductNotFound` error
pub async fn get(pool: &SqlitePool, id: i64) -> ServiceResult<Product> {
    find_by_id(pool, id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::ProductNotFound)
            .with_detail("product_id", id)
            .into()
    })
}

fn checked_price(price: Decimal) -> Result<Decimal, AppError> {
    normalize_price(price).ok_or_else(|| {
        AppError::with_message(
            ErrorCode::InvalidPrice,
            format!("Price must be between 0 and {MAX_PRICE}"),
        )
            .with_detail("price", price.to_string())
    })
}

fn sku_conflict(e: sqlx::Error, sku: &str) -> ServiceError {
    if is_unique_violation(&e) && !super::is_slug_violation(&e) {
        AppError::new(ErrorCode::SkuExists).with_detail("sku", sku).into()
    } else {
        e.into()
    }
}

async fn category_id(pool: &SqlitePool, slug: &str) -> ServiceResult<i64> {
    Ok(super::categories::get_by_slug(pool, slug).await?.id)
}

pub async fn create(pool: &SqlitePool, data: &ProductCreate) -> ServiceResult<Product> {
    let price = checked_price(data.price)?;
    let category_id = category_id(pool, &data.category).await?;
    let sku = data.sku.trim().to_uppercase();
    let now = now_millis();

    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    let slug = super::unique_slug(&mut *tx, "products", &slugify(&data.name), &[]).await?;
    let id = sqlx::query(
        "INSERT INTO products (name, slug, sku, description, price, category_id, stock, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(data.name.trim())
    .bind(&slug)
    .bind(&sku)
    .bind(&data.description)
    .bind(price.to_string())
    .bind(category_id)
    .bind(0_i64)
    .bind(data.is_active.unwrap_or(true))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if super::is_slug_violation(&e) {
            super::slug_conflict(e, &slug)
        } else {
            sku_conflict(e, &sku)
        }
    })?
    .last_insert_rowid();
    let initial = data.stock.unwrap_or(0);
    if initial > 0 {
        apply_delta(&mut *tx, id, initial, INITIAL_STOCK_REASON).await?;
    }
    tx.commit().await?;

    tracing::info!(id, sku = %sku, "Product created");
    get(pool, id).await
}

/// Apply a partial update. Slugs stay stable across renames.
///
/// A new `stock` is written as a ledger movement against the stock read
/// inside the transaction, never as a bare overwrite.
pub async fn update(
    pool: &SqlitePool,
    current: &Product,
    data: &ProductUpdate,
) -> ServiceResult<Product> {
    let price = match data.price {
        Some(p) => checked_price(p)?,
        None => current.price,
    };
    let category_id = match &data.category {
        Some(slug) => category_id(pool, slug).await?,
        None => current.category_id,
    };
    let sku = data
        .sku
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_else(|| current.sku.clone());
    let description = match &data.description {
        Some(d) => d.clone(),
        None => current.description.clone(),
    };

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE products SET name = ?, sku = ?, description = ?, price = ?, category_id = ?,
            is_active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(data.name.as_deref().map(str::trim).unwrap_or(&current.name))
    .bind(&sku)
    .bind(&description)
    .bind(price.to_string())
    .bind(category_id)
    .bind(data.is_active.unwrap_or(current.is_active))
    .bind(now_millis())
    .bind(current.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| sku_conflict(e, &sku))?;

    if let Some(target) = data.stock {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
            .bind(current.id)
            .fetch_optional(&mut *tx)
            .await?;
        let stock = stock.ok_or_else(|| {
            AppError::new(ErrorCode::ProductNotFound).with_detail("product_id", current.id)
        })?;
        if target != stock {
            apply_delta(&mut *tx, current.id, target - stock, PRODUCT_UPDATE_REASON).await?;
        }
    }
    tx.commit().await?;

    get(pool, current.id).await
}

/// Delete a product that no order references
pub async fn delete(pool: &SqlitePool, id: i64) -> ServiceResult<bool> {
    let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE product_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if lines > 0 {
        return Err(AppError::with_message(
            ErrorCode::ProductInUse,
            "Product is referenced by orders; deactivate it instead",
        )
        .with_detail("product_id", id)
        .into());
    }

    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Active products with stock at or below `threshold`, lowest first
pub async fn low_stock(pool: &SqlitePool, threshold: i64) -> ServiceResult<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "{SELECT} WHERE p.is_active = 1 AND p.stock <= ? ORDER BY p.stock, p.name"
    ))
    .bind(threshold)
    .fetch_all(pool)
    .await?;
    Ok(into_products(rows)?)
}

pub async fn count_active(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
        .fetch_one(pool)
        .await
}

pub async fn count_low_stock(pool: &SqlitePool, threshold: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1 AND stock <= ?")
        .bind(threshold)
        .fetch_one(pool)
        .await
}
