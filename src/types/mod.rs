//! Type definitions for the resource server
//!
//! This module contains the identifier and document types every layer shares.

/// Identifier types
pub mod ids;
/// Document-related types
pub mod document;

pub use ids::{DocumentId, ParseIdError, DOCUMENT_ID_HEX_LENGTH, DOCUMENT_ID_LENGTH};
pub use document::{Document, Fields};
