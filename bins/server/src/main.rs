//! Lectern API Server
//!
//! Main entry point for the Lectern backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lectern_api::{AppState, create_router};
use lectern_core::storage::{StorageConfig, StorageService};
use lectern_db::connect;
use lectern_db::migration::{Migrator, MigratorTrait};
use lectern_shared::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let json = config.log.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectern=debug,tower_http=debug".into()),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();

    // Connect to database
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    Migrator::up(&db, None)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations applied");

    // Create file store
    let storage_config = StorageConfig::new(config.storage.clone())
        .with_max_file_size(config.server.max_upload_bytes);
    let storage = StorageService::from_config(storage_config)
        .context("Failed to configure file storage")?;
    match storage.verify().await {
        Ok(()) => info!(provider = storage.provider_name(), "File storage ready"),
        Err(e) => warn!(
            provider = storage.provider_name(),
            error = %e,
            "File storage check failed, uploads may not work"
        ),
    }

    // Create application state
    let state = AppState {
        db: Arc::new(db.clone()),
        storage: Arc::new(storage),
    };

    // Create router
    let app = create_router(state, &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await?;
    info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received terminate signal"),
    }

    info!("Shutting down gracefully...");
}
