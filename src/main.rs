//! Resource Server
//!
//! Serves JSON CRUD endpoints for named document collections.

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use resource_server::core::{config::StorageType, create_app_state, logging::init_logging, Config};
use resource_server::{log_error, log_info, log_warn};
use std::path::PathBuf;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let matches = Command::new("resource-server")
        .version(resource_server::VERSION)
        .about("JSON CRUD server for named document collections.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
        )
        .arg(
            Arg::new("http-addr")
                .long("http-addr")
                .value_name("ADDR")
                .help("HTTP server bind address")
        )
        .arg(
            Arg::new("storage-type")
                .long("storage-type")
                .value_name("TYPE")
                .help("Storage backend type (memory, file)")
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Data directory for the file store")
        )
        .arg(
            Arg::new("static-dir")
                .long("static-dir")
                .value_name("DIR")
                .help("Directory of static files served outside the API prefix")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("dynamic-resources")
                .long("dynamic-resources")
                .action(ArgAction::SetTrue)
                .help("Serve any path-safe resource name, not only declared ones")
        )
        .get_matches();

    // Load configuration, then apply CLI overrides
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;
    apply_cli_overrides(&mut config, &matches)?;
    config.validate()?;

    init_logging(&config.logging);

    log_info!("Starting {} v{}", resource_server::NAME, resource_server::VERSION);

    // Open the store once and build the shared state
    let configured_app_state = create_app_state(config)
        .await
        .context("failed to create application state")?;
    log_info!("AppState created with {} storage", configured_app_state.storage_type().as_str());

    resource_server::api::start_api_server(configured_app_state, setup_shutdown_handler())
        .await
        .context("HTTP server failed")?;

    log_info!("Shutdown complete");
    Ok(())
}

/// Apply command line argument overrides to configuration
fn apply_cli_overrides(config: &mut Config, matches: &clap::ArgMatches) -> resource_server::Result<()> {
    if let Some(addr) = matches.get_one::<String>("http-addr") {
        config.server.http_addr = addr.parse()
            .map_err(|e| resource_server::Error::config(format!("Invalid HTTP address: {}", e)))?;
    }

    if let Some(storage_type) = matches.get_one::<String>("storage-type") {
        config.storage.storage_type = storage_type.parse::<StorageType>()?;
    }

    if let Some(data_dir) = matches.get_one::<String>("data-dir") {
        config.storage.data_dir = data_dir.into();
    }

    if let Some(static_dir) = matches.get_one::<String>("static-dir") {
        config.server.static_dir = Some(static_dir.into());
    }

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }

    if matches.get_flag("dynamic-resources") {
        config.api.dynamic_resources = true;
    }

    Ok(())
}

/// Setup graceful shutdown signal handling
async fn setup_shutdown_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log_error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log_error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_warn!("Received Ctrl+C signal, shutting down");
        },
        _ = terminate => {
            log_warn!("Received terminate signal, shutting down");
        },
    }
}
