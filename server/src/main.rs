//! `edalab-server` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use edalab_learning::EvaluationStrategy;
use edalab_server::ServerConfig;
use edalab_server::logging::init_logging;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "EDA Lab API server",
    long_about = "HTTP service for CSV upload, exploratory plots, preprocessing and \
                  time-series model evaluation.\n\n\
                  ENVIRONMENT VARIABLES (flags take precedence):\n  \
                  HOST, PORT, MODELS_DIR, ALLOWED_ORIGINS, MAX_UPLOAD_SIZE, EVALUATION,\n  \
                  MAX_SESSIONS, SESSION_TTL_SECS\n\n\
                  A .env file in the working directory is loaded first."
)]
struct Args {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (default: 8000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for persisted model artifacts
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Evaluation protocol: timeseries or holdout
    #[arg(long)]
    evaluation: Option<EvaluationStrategy>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry RUST_LOG, so load it before logging starts
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.models_dir {
        config.models_dir = dir;
    }
    if let Some(evaluation) = args.evaluation {
        config.evaluation = evaluation;
    }
    debug!(?config, "Resolved configuration");

    edalab_server::run_server(config).await
}
