//! Order API
//!
//! Every route requires a signed-in user. Customers see their own orders;
//! staff see all of them and drive the status machine.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::{require_auth, require_staff};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/orders", routes(state))
}

fn routes(state: &AppState) -> Router<AppState> {
    let staff = Router::new()
        .route("/{id}/status", patch(handler::update_status))
        .route_layer(middleware::from_fn(require_staff));

    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel))
        .merge(staff)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
