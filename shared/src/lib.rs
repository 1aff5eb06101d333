//! Shared types for the Anthony Store workspace
//!
//! Error codes and the API error envelope, domain models exchanged over the
//! REST API, pagination types and small utilities.

pub mod error;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use response::{PageParams, PaginatedResponse};
