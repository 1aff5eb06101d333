//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEV_JWT_SECRET: &str = "dev-jwt-secret-not-for-production-use-only";
const DEV_ADMIN_PASSWORD: &str = "admin12345";
pub const MIN_PASSWORD_LEN: usize = 8;
const DEFAULT_DATABASE_URL: &str = "sqlite://store.db?mode=rwc";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    /// Host/port of a server-based database, as given in `.env` (informational)
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    /// HTTP bind host
    pub http_host: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Access token lifetime (minutes)
    pub jwt_access_minutes: i64,
    /// Refresh token lifetime (days)
    pub jwt_refresh_days: i64,
    /// Stock level at or below which a product counts as low stock
    pub low_stock_threshold: i64,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// JSON log output
    pub log_json: bool,
    /// Directory for rotating log files (console only when unset)
    pub log_dir: Option<String>,
    /// Honour `X-Forwarded-For` when keying rate limits (behind a proxy)
    pub trust_proxy: bool,
    /// Seed admin account
    pub admin_email: String,
    /// Only `seed` reads it; see [`Config::seed_admin_password`]
    pub admin_password: Option<String>,
}

impl Config {
    /// Require a secret env var: must be set, non-empty and at least 32
    /// characters outside development.
    fn require_secret(name: &str, environment: &str, dev_default: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                return Ok(dev_default.to_string());
            }
        };
        if environment != "development" && val.len() < 32 {
            return Err(format!("{name} must be at least 32 characters in {environment}").into());
        }
        Ok(val)
    }

    /// Resolve the database URL: `DATABASE_URL` wins, then `DB_NAME` as a
    /// SQLite file name, then the default file.
    fn database_url() -> String {
        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.is_empty()
        {
            return url;
        }
        match std::env::var("DB_NAME") {
            Ok(name) if !name.is_empty() => format!("sqlite://{name}.sqlite3?mode=rwc"),
            _ => DEFAULT_DATABASE_URL.to_string(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_dev = environment == "development";

        Ok(Self {
            database_url: Self::database_url(),
            db_host: std::env::var("DB_HOST").ok().filter(|s| !s.is_empty()),
            db_port: std::env::var("DB_PORT").ok().and_then(|p| p.parse().ok()),
            db_user: std::env::var("DB_USER").ok().filter(|s| !s.is_empty()),
            http_host: std::env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment, DEV_JWT_SECRET)?,
            jwt_access_minutes: std::env::var("JWT_ACCESS_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            jwt_refresh_days: std::env::var("JWT_REFRESH_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            low_stock_threshold: std::env::var("LOW_STOCK_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(!is_dev),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            trust_proxy: std::env::var("TRUST_PROXY")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            admin_email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@anthonystore.local".into()),
            admin_password: std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
            environment,
        })
    }

    /// Development defaults with an in-memory database (tests, local tooling)
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            db_host: None,
            db_port: None,
            db_user: None,
            http_host: "127.0.0.1".into(),
            http_port: 0,
            environment: "development".into(),
            jwt_secret: DEV_JWT_SECRET.into(),
            jwt_access_minutes: 60,
            jwt_refresh_days: 7,
            low_stock_threshold: 10,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            trust_proxy: false,
            admin_email: "admin@anthonystore.local".into(),
            admin_password: None,
        }
    }

    /// Password for the seeded admin account. Development falls back to a
    /// fixed default; other environments must set `ADMIN_PASSWORD`.
    pub fn seed_admin_password(&self) -> Result<String, BoxError> {
        let password = match &self.admin_password {
            Some(p) => p.clone(),
            None if self.environment == "development" => DEV_ADMIN_PASSWORD.to_string(),
            None => {
                return Err(format!(
                    "ADMIN_PASSWORD must be set to seed the admin account in {}",
                    self.environment
                )
                .into());
            }
        };
        if password.len() < MIN_PASSWORD_LEN {
            return Err(format!("ADMIN_PASSWORD must be at least {MIN_PASSWORD_LEN} characters").into());
        }
        Ok(password)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Backend name reported by the info endpoint
    pub fn database_backend(&self) -> &'static str {
        if self.database_url.starts_with("sqlite") {
            "sqlite"
        } else {
            "unknown"
        }
    }
}
