mod application;
mod domain;
mod infrastructure;
mod interfaces;

use std::sync::{Arc, Mutex};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::ConfigService;
use crate::interfaces::http::{add_log, start_server};
use crate::interfaces::state::AppState;

pub use crate::domain::error::{AppError, Result};

/// Load configuration, wire the services and serve the dashboard API
/// until the server stops.
pub async fn run() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = match ConfigService::from_env().load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    let host = config.server.host.clone();
    let port = config.server.port;
    let logs = Arc::new(Mutex::new(Vec::new()));
    let state = Arc::new(AppState::new(config));

    let server = start_server(state, logs.clone())?;
    add_log(
        &logs,
        "INFO",
        "System",
        &format!("Traffic Insight API started on {}:{}", host, port),
    );
    info!(%host, port, "Traffic Insight API started");

    server.await
}
