//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Customer, Order, OrderCreate, OrderStatus, OrderStatusUpdate};
use shared::response::{PageParams, PaginatedResponse};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::orders::OrderFilter;
use crate::error::ServiceResult;
use crate::notify::{OrderEvent, OrderNotification};
use crate::state::AppState;

fn order_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", id)
}

async fn customer(state: &AppState, id: i64) -> ServiceResult<Customer> {
    db::customers::find_by_id(&state.pool, id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::CustomerNotFound)
            .with_detail("customer_id", id)
            .into()
    })
}

async fn own_profile(state: &AppState, user: &CurrentUser) -> ServiceResult<Option<Customer>> {
    Ok(db::customers::find_by_user(&state.pool, user.id).await?)
}

/// Load an order the caller may see. Other customers' orders are
/// reported as missing rather than forbidden.
async fn visible_order(state: &AppState, user: &CurrentUser, id: i64) -> ServiceResult<Order> {
    let order = db::orders::find(&state.pool, id)
        .await?
        .ok_or_else(|| order_not_found(id))?;
    if user.is_staff {
        return Ok(order);
    }
    match own_profile(state, user).await? {
        Some(profile) if profile.id == order.customer_id => Ok(order),
        _ => Err(order_not_found(id).into()),
    }
}

/// Queue a notification for the order's customer. Runs after the change
/// has committed, so a failure here is logged and never fails the request.
async fn announce(state: &AppState, event: OrderEvent, order: &Order) {
    match customer(state, order.customer_id).await {
        Ok(customer) => state
            .notifier
            .notify(OrderNotification::new(event, order, &customer)),
        Err(e) => tracing::warn!(
            order = %order.order_number,
            customer_id = order.customer_id,
            error = %e,
            "Order notification skipped"
        ),
    }
}

/// POST /api/orders
///
/// Staff may place an order on behalf of `customer_id`; everyone else
/// orders for their own profile.
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<OrderCreate>,
) -> ServiceResult<(StatusCode, Json<Order>)> {
    let buyer = match payload.customer_id {
        Some(id) if current.is_staff => customer(&state, id).await?,
        _ => own_profile(&state, &current)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::CustomerProfileMissing))?,
    };

    let order = db::orders::create(&state.pool, buyer.id, &payload).await?;
    state.notifier.notify(OrderNotification::new(
        OrderEvent::Created,
        &order,
        &buyer,
    ));
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    /// Staff only; ignored for customers
    pub customer_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ServiceResult<Json<PaginatedResponse<Order>>> {
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    let (page, per_page) = params.resolve();

    let customer_id = if current.is_staff {
        query.customer_id
    } else {
        match own_profile(&state, &current).await? {
            Some(profile) => Some(profile.id),
            None => return Ok(Json(PaginatedResponse::new(Vec::new(), 0, page, per_page))),
        }
    };

    let filter = OrderFilter {
        customer_id,
        status: query.status,
    };
    let (limit, offset) = params.limit_offset();
    let (items, total) = db::orders::list(&state.pool, filter, limit, offset).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ServiceResult<Json<Order>> {
    Ok(Json(visible_order(&state, &current, id).await?))
}

/// POST /api/orders/{id}/cancel
///
/// Owners may cancel while the order is pending, staff also once it is
/// confirmed.
pub async fn cancel(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ServiceResult<Json<Order>> {
    let order = visible_order(&state, &current, id).await?;

    let allowed = match order.status {
        OrderStatus::Pending => true,
        OrderStatus::Confirmed => current.is_staff,
        _ => false,
    };
    if !allowed {
        return Err(AppError::new(ErrorCode::OrderNotCancellable)
            .with_detail("order_id", id)
            .with_detail("status", order.status.as_str())
            .into());
    }

    let updated = db::orders::change_status(&state.pool, &order, OrderStatus::Cancelled).await?;
    announce(
        &state,
        OrderEvent::StatusChanged {
            from: order.status,
            to: updated.status,
        },
        &updated,
    )
    .await;
    Ok(Json(updated))
}

/// PATCH /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> ServiceResult<Json<Order>> {
    let order = db::orders::find(&state.pool, id)
        .await?
        .ok_or_else(|| order_not_found(id))?;

    let updated = db::orders::change_status(&state.pool, &order, payload.status).await?;
    announce(
        &state,
        OrderEvent::StatusChanged {
            from: order.status,
            to: updated.status,
        },
        &updated,
    )
    .await;
    Ok(Json(updated))
}
