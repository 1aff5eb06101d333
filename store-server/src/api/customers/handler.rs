//! Customer API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Customer, CustomerCreate, CustomerUpdate};
use shared::response::{PageParams, PaginatedResponse};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

fn not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::CustomerNotFound).with_detail("customer_id", id)
}

/// Profile linked to the caller's account
async fn own_profile(state: &AppState, user: &CurrentUser) -> ServiceResult<Customer> {
    db::customers::find_by_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CustomerProfileMissing).into())
}

/// GET /api/customers/me
pub async fn get_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ServiceResult<Json<Customer>> {
    Ok(Json(own_profile(&state, &current).await?))
}

/// PATCH /api/customers/me
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<CustomerUpdate>,
) -> ServiceResult<Json<Customer>> {
    payload.validate()?;
    let profile = own_profile(&state, &current).await?;
    let updated = db::customers::update(&state.pool, profile.id, &payload)
        .await?
        .ok_or_else(|| not_found(profile.id))?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/customers - staff listing with search
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ServiceResult<Json<PaginatedResponse<Customer>>> {
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    let (page, per_page) = params.resolve();
    let (limit, offset) = params.limit_offset();

    let (items, total) = db::customers::list(&state.pool, query.q.as_deref(), limit, offset).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

/// POST /api/customers - staff creates a profile without an account
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CustomerCreate>,
) -> ServiceResult<(StatusCode, Json<Customer>)> {
    payload.validate()?;
    let id = db::customers::insert(&state.pool, None, &payload).await?;
    let customer = db::customers::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(customer_id = id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/customers/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServiceResult<Json<Customer>> {
    let customer = db::customers::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(customer))
}

/// PATCH /api/customers/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CustomerUpdate>,
) -> ServiceResult<Json<Customer>> {
    payload.validate()?;
    let customer = db::customers::update(&state.pool, id, &payload)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(customer))
}

/// DELETE /api/customers/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServiceResult<StatusCode> {
    if !db::customers::delete(&state.pool, id).await? {
        return Err(not_found(id).into());
    }
    tracing::info!(customer_id = id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
