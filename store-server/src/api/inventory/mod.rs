//! Inventory API (staff only)

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{require_auth, require_staff};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/inventory", routes(state))
}

fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(handler::low_stock))
        .route("/{product_id}/adjust", post(handler::adjust))
        .route("/{product_id}/movements", get(handler::movements))
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
