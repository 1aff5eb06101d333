//! Data models
//!
//! Shared between store-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod category;
pub mod customer;
pub mod inventory;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use category::*;
pub use customer::*;
pub use inventory::*;
pub use order::*;
pub use product::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
/// in PATCH payloads. Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
