//! Engine binary for the fleet live-tracking service.
//!
//! This is the main entry point that wires together the state store, the
//! position simulator, the subscriber fan-out, and the HTTP/`WebSocket`
//! server. It loads configuration, seeds the store, and runs the tick loop
//! until Ctrl-C or the configured tick limit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `fleet-config.yaml` (or `$FLEET_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the seed (YAML file or the built-in Hyderabad fleet)
//! 4. Create the state store and broadcaster
//! 5. Start the HTTP server on a background task
//! 6. Run the tick loop until shutdown or `max_ticks`
//! 7. Log the result

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fleet_core::broadcast::Broadcaster;
use fleet_core::config::FleetConfig;
use fleet_core::runner;
use fleet_core::store::StateStore;
use fleet_core::tick::Simulator;
use fleet_observer::server::ServerConfig;
use fleet_observer::state::AppState;
use fleet_world::FleetSeed;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file used when `FLEET_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "fleet-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, seed data, or the HTTP bind fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("fleet-engine starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        tick_interval_seconds = config.simulation.tick_interval_seconds,
        notification_probability = config.simulation.notification_probability,
        max_ticks = config.simulation.max_ticks,
        seed = ?config.simulation.seed,
        "Configuration loaded"
    );

    // 3. Load the seed.
    let seed = load_seed(&config)?;

    // 4. Create the store and broadcaster.
    let store = Arc::new(StateStore::from_seed(seed)?);
    let broadcaster = Arc::new(Broadcaster::new(&config.broadcast));
    let bus_count = store.bus_count().await;
    info!(
        routes = store.network().route_count(),
        stops = store.network().stop_count(),
        buses = bus_count,
        subscriber_buffer = config.broadcast.subscriber_buffer,
        "State store ready"
    );

    // 5. Start the HTTP server.
    let app_state = Arc::new(AppState::new(
        Arc::clone(&store),
        Arc::clone(&broadcaster),
        config.arrivals,
    ));
    let server_config = ServerConfig::from(&config.server);
    let server_handle = fleet_observer::spawn_observer(&server_config, app_state)
        .await
        .map_err(EngineError::from)?;

    // 6. Run the tick loop.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    let mut simulator = Simulator::new(store, broadcaster, &config.simulation);
    let result = runner::run_simulation(
        &mut simulator,
        config.simulation.tick_interval(),
        config.simulation.max_ticks,
        shutdown_rx,
    )
    .await;

    // 7. Log results.
    runner::log_simulation_end(&result);
    server_handle.abort();

    info!(
        end_reason = ?result.end_reason,
        ticks_run = result.ticks_run,
        "fleet-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `$FLEET_CONFIG` or `fleet-config.yaml`.
fn load_config() -> Result<(FleetConfig, bool), EngineError> {
    let explicit = std::env::var_os("FLEET_CONFIG").map(PathBuf::from);
    load_config_from(explicit.as_deref())
}

/// Load configuration from an explicit path, or from the default path.
///
/// Only a missing default file falls back to defaults (with env overrides
/// applied); an explicit path must exist. Also returns whether a file was
/// read.
fn load_config_from(explicit: Option<&Path>) -> Result<(FleetConfig, bool), EngineError> {
    if let Some(path) = explicit {
        return Ok((FleetConfig::from_file(path)?, true));
    }
    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        Ok((FleetConfig::from_file(path)?, true))
    } else {
        let mut config = FleetConfig::default();
        config.server.apply_env_overrides();
        Ok((config, false))
    }
}

/// Load the seed named in the config, or the built-in fleet.
fn load_seed(config: &FleetConfig) -> Result<FleetSeed, EngineError> {
    match &config.seed.file {
        Some(path) => Ok(FleetSeed::from_file(path)?),
        None => {
            info!("No seed file configured, using the built-in Hyderabad fleet");
            Ok(fleet_world::create_starting_fleet())
        }
    }
}
