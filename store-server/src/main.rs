use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use store_server::{AppState, Config, build_app, db, logger, seed};

const RATE_LIMIT_CLEANUP: Duration = Duration::from_secs(300);

#[derive(Debug, Parser)]
#[command(name = "store-server", version, about = "Anthony Store API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations and serve the HTTP API (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Load demo data (safe to run repeatedly)
    Seed,
    /// Create a staff account or promote an existing one
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("configuration: {e}"))?;
    let _log_guards = logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let pool = db::connect(&config.database_url).await?;
            db::migrate(&pool).await?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Seed => {
            let pool = db::connect(&config.database_url).await?;
            db::migrate(&pool).await?;
            seed::run(&pool, &config).await?;
            Ok(())
        }
        Command::CreateAdmin { email, password } => {
            if password.len() < store_server::config::MIN_PASSWORD_LEN {
                anyhow::bail!(
                    "password must be at least {} characters",
                    store_server::config::MIN_PASSWORD_LEN
                );
            }
            let pool = db::connect(&config.database_url).await?;
            db::migrate(&pool).await?;
            let created = seed::ensure_admin(&pool, &email, &password).await?;
            tracing::info!(email = %email, created, "Admin account ready");
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        environment = %config.environment,
        database = %config.database_backend(),
        "Anthony Store API starting"
    );

    let state = AppState::new(&config)
        .await
        .map_err(|e| anyhow::anyhow!("startup: {e}"))?;

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP listener ready");

    axum::serve(
        listener,
        build_app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
