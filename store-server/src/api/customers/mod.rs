//! Customer API
//!
//! `/me` serves the caller's own profile; everything else is staff only.

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::{require_auth, require_staff};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/customers", routes(state))
}

fn routes(state: &AppState) -> Router<AppState> {
    let own = Router::new().route("/me", get(handler::get_me).patch(handler::update_me));

    let staff = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .patch(handler::update)
                .delete(handler::delete),
        )
        .route_layer(middleware::from_fn(require_staff));

    own.merge(staff)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
