//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Product, ProductCreate, ProductUpdate};
use shared::response::{PageParams, PaginatedResponse};
use validator::Validate;

use crate::db;
use crate::db::products::{ProductFilter, ProductOrdering};
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Category slug; matches the whole subtree
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub ordering: ProductOrdering,
    #[serde(default)]
    pub include_inactive: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ServiceResult<Json<PaginatedResponse<Product>>> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price)
        && min > max
    {
        return Err(AppError::validation("min_price must not exceed max_price")
            .with_detail("min_price", min.to_string())
            .with_detail("max_price", max.to_string())
            .into());
    }

    let category_path = match query.category.as_deref() {
        Some(slug) => Some(db::categories::get_by_slug(&state.pool, slug).await?.path),
        None => None,
    };
    let filter = ProductFilter {
        category_path,
        q: query.q,
        min_price: query.min_price,
        max_price: query.max_price,
        in_stock: query.in_stock,
        ordering: query.ordering,
        include_inactive: query.include_inactive,
    };

    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    let (page, per_page) = params.resolve();
    let (limit, offset) = params.limit_offset();
    let (items, total) = db::products::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServiceResult<Json<Product>> {
    Ok(Json(db::products::get(&state.pool, id).await?))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ProductCreate>,
) -> ServiceResult<(StatusCode, Json<Product>)> {
    payload.validate()?;
    let product = db::products::create(&state.pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> ServiceResult<Json<Product>> {
    payload.validate()?;
    let current = db::products::get(&state.pool, id).await?;
    Ok(Json(db::products::update(&state.pool, &current, &payload).await?))
}

/// DELETE /api/products/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServiceResult<StatusCode> {
    if db::products::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::new(ErrorCode::ProductNotFound)
            .with_detail("product_id", id)
            .into())
    }
}
