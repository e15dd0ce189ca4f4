use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auth::{
    AppState,
    accounts::AccountService,
    config::{AdminConfig, ServerConfig, SessionConfig},
    database::run_migrations,
    jwt::{JwtConfig, JwtService},
    purge::spawn_session_purge,
    repositories::{PgAccountRepository, PgSessionRepository},
    routes,
    session::SessionManager,
};
use common::database;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let session_config = SessionConfig::from_env();
    let server_config = ServerConfig::from_env()?;

    let accounts = Arc::new(PgAccountRepository::new(pool.clone()));
    let sessions = Arc::new(PgSessionRepository::new(pool));

    let session_manager = SessionManager::new(
        accounts.clone(),
        sessions,
        jwt_service,
        session_config.clone(),
    );
    let account_service = AccountService::new(
        accounts,
        session_manager.clone(),
        session_config.store_timeout,
    );

    match AdminConfig::from_env() {
        Some(admin) => {
            account_service
                .ensure_admin(&admin.email, &admin.password)
                .await?;
        }
        None => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin account seeded"),
    }

    spawn_session_purge(session_manager.clone(), session_config.purge_interval);

    let app_state = AppState {
        session_manager,
        account_service,
    };

    info!("Authentication service initialized successfully");

    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(server_config.addr).await?;
    info!("Authentication service listening on {}", server_config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Authentication service stopped");
    Ok(())
}

/// Resolve on SIGINT or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
