use axum::{Json, extract::State, http::StatusCode, response::Redirect};
use serde::Serialize;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "Anthony Store API";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct HealthChecks {
    database: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// healthy | unhealthy
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    checks: HealthChecks,
}

/// GET / - redirect to the health check
pub async fn index() -> Redirect {
    Redirect::temporary("/health")
}

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match crate::db::ping(&state.pool).await {
        Ok(()) => ("healthy", StatusCode::OK, "healthy".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Health check database ping failed");
            (
                "unhealthy",
                StatusCode::SERVICE_UNAVAILABLE,
                format!("unhealthy: {e}"),
            )
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            service: SERVICE_NAME,
            version: VERSION,
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks: HealthChecks { database },
        }),
    )
}

#[derive(Serialize)]
pub struct Contact {
    email: &'static str,
    phone: &'static str,
}

#[derive(Serialize)]
pub struct Business {
    name: &'static str,
    location: &'static str,
}

#[derive(Serialize)]
pub struct DatabaseInfo {
    backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

#[derive(Serialize)]
pub struct InfoResponse {
    service: &'static str,
    version: &'static str,
    environment: String,
    contact: Contact,
    business: Business,
    database: DatabaseInfo,
}

/// GET /health/info - static service information
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let config = &state.config;
    Json(InfoResponse {
        service: SERVICE_NAME,
        version: VERSION,
        environment: config.environment.clone(),
        contact: Contact {
            email: "anthonymakori2@gmail.com",
            phone: "+254707497200",
        },
        business: Business {
            name: "Anthony Store",
            location: "Nairobi, Kenya",
        },
        database: DatabaseInfo {
            backend: config.database_backend(),
            host: config.db_host.clone(),
            port: config.db_port,
        },
    })
}
