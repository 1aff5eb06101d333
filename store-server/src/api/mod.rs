//! HTTP API
//!
//! # Structure
//!
//! - [`health`] - liveness and service info (public)
//! - [`auth`] - registration, login, token refresh
//! - [`customers`] - own profile, staff customer management
//! - [`categories`] - category hierarchy
//! - [`products`] - product catalog
//! - [`inventory`] - stock adjustments and ledger (staff)
//! - [`orders`] - order placement and status machine
//! - [`analytics`] - sales aggregates (staff)

pub mod analytics;
pub mod auth;
pub mod categories;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod products;

use axum::Router;
use http::{HeaderName, HeaderValue};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// UUID v4 request ids
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// All routes, no middleware and no state
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        // Public
        .merge(health::router())
        .merge(auth::router(state))
        .merge(categories::router(state))
        .merge(products::router(state))
        // Authenticated
        .merge(customers::router(state))
        .merge(orders::router(state))
        // Staff
        .merge(inventory::router(state))
        .merge(analytics::router(state))
}

/// Fully configured application, used by the server and by tests
pub fn build_app(state: AppState) -> Router {
    build_router(&state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        // Outermost, so the trace span and handlers see the id
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .with_state(state)
}
