use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use fleettrack_auth::IdentityGate;
use fleettrack_store::{Database, LocationRepo, LocationStore};

/// Fallback signing secret for local development only.
const DEV_SECRET: &str = "supersecretkey";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting FleetTrack location relay");

    let secret = match std::env::var("JWT_SECRET") {
        Ok(s) if !s.is_empty() => s,
        _ => {
            tracing::warn!("JWT_SECRET not set, using built-in development secret");
            DEV_SECRET.to_string()
        }
    };

    let db_path = std::env::var("FLEETTRACK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("fleettrack.db"));
    let db = Database::open(&db_path).context("failed to open database")?;
    tracing::info!(path = %db_path.display(), "Database opened");

    let store: Arc<dyn LocationStore> = Arc::new(LocationRepo::new(db));

    let port = configured_port(std::env::var("PORT").ok())?;

    let config = fleettrack_server::ServerConfig {
        port,
        ..Default::default()
    };
    let handle = fleettrack_server::start(config, IdentityGate::new(secret.as_bytes()), store)
        .await
        .context("failed to start server")?;

    tracing::info!(port = handle.port, "FleetTrack relay ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("Shutting down");
    Ok(())
}

/// Resolve the listen port from the environment. Unset or empty means
/// the default; anything else must parse.
fn configured_port(value: Option<String>) -> anyhow::Result<u16> {
    match value {
        Some(p) if !p.is_empty() => p.parse().context("PORT is not a valid port number"),
        _ => Ok(8080),
    }
}
