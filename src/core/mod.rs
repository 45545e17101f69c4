//! Core system types and foundations
//!
//! This module contains the fundamental building blocks of the resource server:
//! error handling, configuration, logging and application state.

/// Error types
pub mod error;
/// Logging macros and subscriber setup
pub mod logging;
/// Configuration management
pub mod config;
/// Application state management
pub mod app_state;
/// Application factory
pub mod factory;

// Re-export commonly used items
pub use error::{Error, Result, StoreError};
pub use config::Config;
pub use app_state::AppState;
pub use factory::{create_app_state, AppStateFactoryError, ConfiguredAppState};
