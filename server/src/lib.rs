//! EDA Lab HTTP service.
//!
//! Upload a CSV, inspect and plot it, preprocess it into a modelling table
//! and evaluate a model on that table with time-series cross-validation.
//!
//! | Method & path            | Handler                          |
//! |--------------------------|----------------------------------|
//! | `GET /`                  | liveness message                 |
//! | `POST /upload-csv/`      | [`handlers::upload_csv`]         |
//! | `GET /data-info/`        | [`handlers::data_info`]          |
//! | `GET /generate-eda/`     | [`handlers::generate_eda`]       |
//! | `POST /preprocess/`      | [`handlers::preprocess`]         |
//! | `POST /predict/`         | [`handlers::predict`]            |
//! | `GET /download-results/` | [`handlers::download_results`]   |
//!
//! Tables live in per-client sessions selected by the `x-session-id` header.

mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod state;

pub use api::create_router;
pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

/// Start the server and run until Ctrl-C.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let started_at = chrono::Local::now();

    if config.allowed_origins.iter().any(|origin| origin != "*") {
        warn!(
            origins = ?config.allowed_origins,
            "ALLOWED_ORIGINS is set but CORS allows any origin"
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config.clone())?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        models_dir = %config.models_dir.display(),
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        evaluation = %config.evaluation,
        "EDA Lab server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(started_at))
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

async fn shutdown_signal(started_at: chrono::DateTime<chrono::Local>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until killed.
        warn!(error = %err, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }

    let uptime = chrono::Local::now().signed_duration_since(started_at);
    info!(
        uptime_secs = uptime.num_seconds(),
        "Shutdown signal received, stopping server"
    );
}
