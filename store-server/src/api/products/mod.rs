//! Product API
//!
//! Catalog reads are public; create, update and delete require staff.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::{require_auth, require_staff};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/products", routes(state))
}

fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id));

    let staff = Router::new()
        .route("/", post(handler::create))
        .route("/{id}", patch(handler::update).delete(handler::delete))
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public.merge(staff)
}
