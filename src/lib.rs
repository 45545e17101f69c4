//! Resource Server - JSON CRUD over named document collections
//!
//! Every resource is a collection of schemaless or lightly typed JSON
//! documents. The same five operations (list, get, create, replace, delete)
//! are served for each resource over HTTP, backed by an in-memory or a
//! file-backed document store.
#![warn(missing_docs)]

// Configure global allocator for maximum performance
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

// Core foundational modules
pub mod core;
pub mod types;

// Main functional modules
pub mod storage;
pub mod resource;
pub mod api;
pub mod system;

// Re-export commonly used items for convenience
pub use core::{AppState, Config, Error, Result};
pub use storage::{DocumentStore, FileStore, MemStore, StoreError};
pub use types::{Document, DocumentId, Fields};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
