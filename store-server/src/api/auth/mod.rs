//! Auth API
//!
//! Registration and login are rate limited per client IP.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::auth::require_auth;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/auth", routes(state))
}

fn routes(state: &AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/register", post(handler::register))
        .route_layer(middleware::from_fn_with_state(state.clone(), register_rate_limit));

    let login = Router::new()
        .route("/login", post(handler::login))
        .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    let protected = Router::new()
        .route("/me", get(handler::me))
        .route("/change-password", post(handler::change_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(register)
        .merge(login)
        .route("/refresh", post(handler::refresh))
        .merge(protected)
}
