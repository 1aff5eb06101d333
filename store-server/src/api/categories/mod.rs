//! Category API
//!
//! Reads are public, writes are staff only. Categories are addressed by slug.

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::{require_auth, require_staff};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().nest("/api/categories", routes(state))
}

fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handler::list))
        // Fixed segment, must not be taken as a slug
        .route("/tree", get(handler::tree))
        .route("/{slug}", get(handler::get_by_slug))
        .route("/{slug}/descendants", get(handler::descendants))
        .route("/{slug}/products", get(handler::products))
        .route("/{slug}/average-price", get(handler::average_price));

    let staff = Router::new()
        .route("/", axum::routing::post(handler::create))
        .route(
            "/{slug}",
            axum::routing::patch(handler::update).delete(handler::delete),
        )
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public.merge(staff)
}
