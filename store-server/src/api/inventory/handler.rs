//! Inventory API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{InventoryMovement, Product, StockAdjustment};
use validator::Validate;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i64>,
}

/// GET /api/inventory/low-stock
pub async fn low_stock(
    State(state): State<AppState>,
    Query(query): Query<LowStockQuery>,
) -> ServiceResult<Json<Vec<Product>>> {
    let threshold = query
        .threshold
        .unwrap_or(state.config.low_stock_threshold)
        .max(0);
    Ok(Json(db::products::low_stock(&state.pool, threshold).await?))
}

/// POST /api/inventory/{product_id}/adjust
///
/// Returns the product with its new stock level.
pub async fn adjust(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(payload): Json<StockAdjustment>,
) -> ServiceResult<Json<Product>> {
    payload.validate()?;
    db::inventory::adjust(
        &state.pool,
        product_id,
        payload.delta,
        payload.reason.trim(),
    )
    .await?;
    Ok(Json(db::products::get(&state.pool, product_id).await?))
}

/// GET /api/inventory/{product_id}/movements
pub async fn movements(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ServiceResult<Json<Vec<InventoryMovement>>> {
    // 404 for unknown products instead of an empty ledger
    db::products::get(&state.pool, product_id).await?;
    Ok(Json(db::inventory::movements(&state.pool, product_id).await?))
}
