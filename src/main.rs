//! UVDASH — UV index and copper price dashboard backend.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the upstream clients and serves the dashboard API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use uvdash::config::{self, AppConfig};
use uvdash::dashboard::{self, DashboardState};
use uvdash::data::HttpSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Initialise structured logging
    init_logging();

    // Load configuration from TOML, falling back to defaults
    let path = AppConfig::resolve_path();
    let cfg = if std::path::Path::new(&path).exists() {
        AppConfig::load(&path)?
    } else {
        warn!(path = %path, "Config file not found, using defaults");
        AppConfig::default()
    };

    info!(
        port = cfg.server.port,
        archive = %cfg.sources.archive_url,
        forecast = %cfg.sources.forecast_url,
        indicators = %cfg.sources.indicators_url,
        max_lookback_days = cfg.history.lookback_ceiling(),
        cache = cfg.cache.enabled,
        "UVDASH starting up"
    );

    let source = Arc::new(HttpSource::new(&cfg.sources)?);
    let state = Arc::new(DashboardState::new(source, &cfg));

    dashboard::serve(state, cfg.server.port).await?;

    info!("UVDASH shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", env!("CARGO_CRATE_NAME"))));

    let json_logging = std::env::var(config::LOG_JSON_ENV).is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
