//! Sales analytics (staff only)

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::{require_auth, require_staff};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/analytics", routes(state))
}

fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/summary", get(handler::summary))
        .route("/top-products", get(handler::top_products))
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
