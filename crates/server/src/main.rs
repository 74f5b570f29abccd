use anyhow::Context;
use db::DBService;
use server::{AppState, config::Config, router};
use services::services::{database_validator::DatabaseValidator, session_sweeper::SessionSweeper};
use tokio::{net::TcpListener, signal::ctrl_c};
use tracing::{error, info, warn};
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {e}");
        }
    }
    init_tracing();

    let config = Config::load();

    info!("Initializing database...");
    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let validation = DatabaseValidator::new(db.pool.clone())
        .ensure_ready()
        .await
        .context("database schema check failed")?;
    info!("{}", validation.summary());

    let state = AppState::new(db.clone(), config.clone())?;

    state
        .auth
        .ensure_admin(&config.admin_email, &config.admin_password, &config.admin_name)
        .await
        .context("failed to seed admin account")?;
    if config.admin_password == "admin123" {
        warn!("ADMIN_PASSWORD is the built-in default; set it before exposing the server");
    }
    if !state.rakuten.is_configured() {
        warn!("RAKUTEN_APPLICATION_ID not set, Rakuten endpoints will serve mock data");
    }

    SessionSweeper::new(db, config.session_sweep_interval()).spawn();

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Server running on http://{address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
