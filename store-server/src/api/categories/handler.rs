//! Category API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::models::category::build_tree;
use shared::models::{
    Category, CategoryCreate, CategoryDetail, CategoryNode, CategoryPriceStats, CategoryUpdate,
    Product,
};
use validator::Validate;

use crate::db;
use crate::db::categories::ListFilter;
use crate::db::products::ProductFilter;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Parent slug: list its direct children
    pub parent: Option<String>,
    #[serde(default)]
    pub roots: bool,
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/categories
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ServiceResult<Json<Vec<Category>>> {
    let parent_id = match query.parent.as_deref() {
        Some(slug) => Some(db::categories::get_by_slug(&state.pool, slug).await?.id),
        None => None,
    };
    let filter = ListFilter {
        parent_id,
        roots_only: query.roots,
        include_inactive: query.include_inactive,
    };
    Ok(Json(db::categories::list(&state.pool, filter).await?))
}

/// GET /api/categories/tree - nested tree of active categories
pub async fn tree(State(state): State<AppState>) -> ServiceResult<Json<Vec<CategoryNode>>> {
    let all = db::categories::list(&state.pool, ListFilter::default()).await?;
    Ok(Json(build_tree(all)))
}

/// GET /api/categories/{slug} - detail with breadcrumb
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ServiceResult<Json<CategoryDetail>> {
    let category = db::categories::get_by_slug(&state.pool, &slug).await?;
    let ancestors = db::categories::ancestors(&state.pool, &category).await?;
    let children_count = db::categories::children_count(&state.pool, category.id).await?;
    Ok(Json(CategoryDetail {
        category,
        ancestors,
        children_count,
    }))
}

/// GET /api/categories/{slug}/descendants
pub async fn descendants(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ServiceResult<Json<Vec<Category>>> {
    let category = db::categories::get_by_slug(&state.pool, &slug).await?;
    Ok(Json(
        db::categories::descendants(&state.pool, &category, false).await?,
    ))
}

/// GET /api/categories/{slug}/products - active products of the subtree
pub async fn products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ServiceResult<Json<Vec<Product>>> {
    let category = db::categories::get_by_slug(&state.pool, &slug).await?;
    let filter = ProductFilter::for_category(&category);
    Ok(Json(db::products::list_all(&state.pool, &filter).await?))
}

/// GET /api/categories/{slug}/average-price
pub async fn average_price(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ServiceResult<Json<CategoryPriceStats>> {
    let category = db::categories::get_by_slug(&state.pool, &slug).await?;
    Ok(Json(db::categories::price_stats(&state.pool, &category).await?))
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CategoryCreate>,
) -> ServiceResult<(StatusCode, Json<Category>)> {
    payload.validate()?;
    let category = db::categories::create(&state.pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/categories/{slug}
pub async fn update(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<CategoryUpdate>,
) -> ServiceResult<Json<Category>> {
    payload.validate()?;
    let current = db::categories::get_by_slug(&state.pool, &slug).await?;
    Ok(Json(
        db::categories::update(&state.pool, &current, &payload).await?,
    ))
}

/// DELETE /api/categories/{slug}
pub async fn delete(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ServiceResult<StatusCode> {
    let category = db::categories::get_by_slug(&state.pool, &slug).await?;
    db::categories::delete(&state.pool, &category).await?;
    Ok(StatusCode::NO_CONTENT)
}
