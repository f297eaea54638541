use std::sync::Arc;

use axum::Server;
use tracing_subscriber::EnvFilter;

use kanban_board::{config::Config, route::create_app, store, AppState};

const DEFAULT_LOG_FILTER: &str = "kanban_board=info,tower_http=info";

// Entry point of the application
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    // Connect to the database, creating it and its tables when missing
    let pool = match store::connect(&config.database_url, config.max_connections).await {
        Ok(pool) => {
            tracing::info!(url = %config.database_url, "connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to the database");
            std::process::exit(1);
        }
    };

    let app_state = Arc::new(AppState::new(pool));
    let app = create_app(app_state, &config.cors_origin);

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!(error = %err, "invalid listen address");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "server started successfully");

    if let Err(err) = Server::bind(&addr).serve(app.into_make_service()).await {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}
