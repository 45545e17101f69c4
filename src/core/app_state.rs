//! Application State Management
//!
//! This module defines the central AppState that holds every service a
//! handler needs. Handlers receive it through axum's `State` extractor, so
//! the store is injected rather than read from a process-wide global.

use std::sync::Arc;
use std::time::Instant;

use crate::core::config::Config;
use crate::resource::ResourceRegistry;
use crate::storage::StorageImpl;
use crate::system::Metrics;

/// Central application state holding all services and components
pub struct AppState<S: StorageImpl> {
    /// Storage system, opened once at startup
    pub store: Arc<S>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Served resources and their schemas
    pub resources: Arc<ResourceRegistry>,

    /// Request and store metrics
    pub metrics: Metrics,

    /// When this state was created
    pub started_at: Instant,
}

// Manual Clone implementation for AppState that doesn't require S: Clone
// Since storage is held in an Arc, we only need to clone the Arc (increment reference count)
impl<S: StorageImpl> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            resources: self.resources.clone(),
            metrics: self.metrics.clone(),
            started_at: self.started_at,
        }
    }
}

impl<S: StorageImpl> AppState<S> {
    /// Create a new AppState around an opened store
    pub fn new(store: Arc<S>, config: Config) -> crate::core::Result<Self> {
        let resources = Arc::new(ResourceRegistry::from_config(&config));
        Ok(Self {
            store,
            config: Arc::new(config),
            resources,
            metrics: Metrics::new()?,
            started_at: Instant::now(),
        })
    }
}
