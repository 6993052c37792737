use bridge::error::BridgeError;
use bridge::logger::initialize as LoggerInitialize;
use bridge::services::bridge_services;

use mux_core::{BridgeConfig, start_rpc_server};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};

/// Usage: `callmux-bridge [CONFIG_DIR]`
///
/// Loads `CONFIG_DIR/callmux.json` (platform config dir by default), logs to
/// `CONFIG_DIR/logs`, and serves the bridge services until Ctrl-C.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            match serde_json::to_string(&e) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{e}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BridgeError> {
    let config_dir = match std::env::args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => BridgeConfig::default_dir()?,
    };

    let log_dir = config_dir.join("logs");
    create_dir_all(&log_dir).map_err(|e| BridgeError::Bridge {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    LoggerInitialize(&log_dir)?;

    info!("callmux bridge starting");
    info!("Config directory: {}", config_dir.display());

    let config = BridgeConfig::load(&config_dir)?;
    let services = bridge_services()?;
    let handle = start_rpc_server(&config, services).await?;

    info!("Serving on {}", handle.url());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| BridgeError::Bridge {
            message: format!("Failed to listen for shutdown signal: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Shutdown requested");
    handle.shutdown().await;
    Ok(())
}
