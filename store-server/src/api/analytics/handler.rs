//! Analytics API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::db;
use crate::db::analytics::{SalesSummary, TopProduct};
use crate::error::ServiceResult;
use crate::state::AppState;

const DEFAULT_TOP_LIMIT: i64 = 5;
const MAX_TOP_LIMIT: i64 = 50;

/// GET /api/analytics/summary
pub async fn summary(State(state): State<AppState>) -> ServiceResult<Json<SalesSummary>> {
    Ok(Json(
        db::analytics::summary(&state.pool, state.config.low_stock_threshold).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

/// GET /api/analytics/top-products
pub async fn top_products(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ServiceResult<Json<Vec<TopProduct>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TOP_LIMIT)
        .clamp(1, MAX_TOP_LIMIT);
    Ok(Json(db::analytics::top_products(&state.pool, limit).await?))
}
