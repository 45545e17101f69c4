//! Application Factory
//!
//! This module provides factory functions for creating and initializing the AppState
//! with all required services based on configuration.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::core::app_state::AppState;
use crate::core::config::{Config, StorageType};
use crate::storage::{FileStore, MemStore, StoreError};
use crate::log_info;

/// AppState factory errors
#[derive(Debug)]
pub enum AppStateFactoryError {
    /// Storage initialization failed
    StorageInitializationFailed(StoreError),
    /// Configuration or service setup error
    ConfigError(String),
}

impl std::fmt::Display for AppStateFactoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppStateFactoryError::StorageInitializationFailed(err) => {
                write!(f, "Storage initialization failed: {}", err)
            }
            AppStateFactoryError::ConfigError(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppStateFactoryError {}

/// Enum to hold different AppState configurations
pub enum ConfiguredAppState {
    /// Configuration using the in-memory store
    Memory {
        /// The application state with MemStore
        app_state: Arc<AppState<MemStore>>,
    },
    /// Configuration using the file-backed store
    File {
        /// The application state with FileStore
        app_state: Arc<AppState<FileStore>>,
    },
}

impl ConfiguredAppState {
    /// Get the HTTP address from config
    pub fn http_addr(&self) -> SocketAddr {
        match self {
            ConfiguredAppState::Memory { app_state } => app_state.config.server.http_addr,
            ConfiguredAppState::File { app_state } => app_state.config.server.http_addr,
        }
    }

    /// Backend name for logs and `/info`
    pub fn storage_type(&self) -> StorageType {
        match self {
            ConfiguredAppState::Memory { .. } => StorageType::Memory,
            ConfiguredAppState::File { .. } => StorageType::File,
        }
    }
}

/// Create AppState based on configuration
///
/// The store is opened exactly once here and shared by every request.
pub async fn create_app_state(config: Config) -> Result<ConfiguredAppState, AppStateFactoryError> {
    log_info!("Creating AppState with storage type: {:?}", config.storage.storage_type);

    match config.storage.storage_type {
        StorageType::Memory => {
            let store = Arc::new(MemStore::new());
            log_info!("MemStore initialized successfully");

            let app_state = AppState::new(store, config)
                .map_err(|e| AppStateFactoryError::ConfigError(e.to_string()))?;
            Ok(ConfiguredAppState::Memory {
                app_state: Arc::new(app_state),
            })
        }
        StorageType::File => {
            let store = FileStore::open(config.storage.data_dir.clone())
                .await
                .map_err(AppStateFactoryError::StorageInitializationFailed)?;
            log_info!("FileStore initialized at {}", store.data_dir().display());

            let app_state = AppState::new(Arc::new(store), config)
                .map_err(|e| AppStateFactoryError::ConfigError(e.to_string()))?;
            Ok(ConfiguredAppState::File {
                app_state: Arc::new(app_state),
            })
        }
    }
}
