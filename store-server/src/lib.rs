//! Anthony Store server
//!
//! REST API over SQLite: catalog with a category hierarchy, customers,
//! orders with stock reservation, staff inventory and analytics.
//!
//! # Modules
//!
//! - [`api`] - axum routers and handlers
//! - [`auth`] - JWT, auth middleware, rate limiting
//! - [`db`] - sqlx data access
//! - [`notify`] - order notification queue
//! - [`seed`] - demo data

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod notify;
pub mod seed;
pub mod state;
pub mod util;

pub use api::build_app;
pub use config::Config;
pub use state::AppState;
