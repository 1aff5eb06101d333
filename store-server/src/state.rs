//! Application state

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::{JwtConfig, JwtService, RateLimiter};
use crate::config::Config;
use crate::notify::{LogSink, NotificationSink, Notifier};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtService>,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
    /// Order notification queue
    pub notifier: Notifier,
}

impl AppState {
    /// Connect, migrate and assemble the state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = crate::db::connect(&config.database_url).await?;
        crate::db::migrate(&pool).await?;
        Ok(Self::from_pool(pool, config.clone(), Arc::new(LogSink)))
    }

    /// Assemble the state around an existing (already migrated) pool
    pub fn from_pool(pool: SqlitePool, config: Config, sink: Arc<dyn NotificationSink>) -> Self {
        let jwt = JwtService::with_config(JwtConfig::from_config(&config));
        Self {
            pool,
            jwt: Arc::new(jwt),
            rate_limiter: RateLimiter::new(),
            notifier: Notifier::spawn(sink),
            config: Arc::new(config),
        }
    }
}
