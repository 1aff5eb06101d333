//! Health check routes
//!
//! | Path | Method | Description | Auth |
//! |------|--------|-------------|------|
//! | / | GET | Redirect to /health | none |
//! | /health | GET | Liveness + database check | none |
//! | /health/info | GET | Service and business info | none |
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "service": "Anthony Store API",
//!   "version": "0.1.0",
//!   "timestamp": "2026-01-01T12:00:00Z",
//!   "checks": { "database": "healthy" }
//! }
//! ```

mod handler;

use axum::{Router, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::health))
        .route("/health/info", get(handler::info))
}
