//! # API Module
//!
//! HTTP interface of the resource server.
//!
//! ## Endpoints Overview
//!
//! ### Resource Operations (prefix `/api` by default)
//! - `GET /api/{resource}` - List documents in insertion order
//! - `POST /api/{resource}` - Create document, store assigns the id
//! - `GET /api/{resource}/{id}` - Get document by id
//! - `PUT /api/{resource}/{id}` - Replace document fields
//! - `DELETE /api/{resource}/{id}` - Delete document, empty body on success
//!
//! ### System Essentials
//! - `GET /api` - Service banner
//! - `GET /health` - Health check
//! - `GET /info` - Storage backend and resource counts
//! - `GET /metrics` - Prometheus metrics, when enabled

/// Request/response codec
pub mod codec;
/// Error responses
pub mod error;
/// Request handlers
pub mod handlers;
/// Router and server startup
pub mod server;

// Re-export commonly used items
pub use error::{ApiError, ErrorResponse};
pub use server::{create_app, start_api_server};
