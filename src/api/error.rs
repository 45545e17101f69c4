//! Failures surfaced to HTTP clients
//!
//! Every failure becomes a JSON body `{ "error": <kind>, "message": <text> }`
//! with a status chosen by kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::resource::ValidationError;
use crate::storage::StoreError;
use crate::{log_error, log_warn};

/// Error body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error kind name
    pub error: &'static str,
    /// Human-readable description
    pub message: String,
}

/// Request failure
#[derive(Error, Debug)]
pub enum ApiError {
    /// No document with this id in the collection
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource name
        resource: String,
        /// Requested id, as sent by the client
        id: String,
    },

    /// Body could not be decoded or failed validation
    #[error("{0}")]
    Decode(String),

    /// The store call failed or timed out
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No route matches method and path
    #[error("no route for {method} {path}")]
    RouteNotMatched {
        /// Request method
        method: String,
        /// Request path
        path: String,
    },
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl ApiError {
    /// Shorthand for [`ApiError::NotFound`]
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Kind name carried in the `error` field
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NotFound",
            ApiError::Decode(_) => "DecodeError",
            ApiError::Store(StoreError::Timeout(_)) => "StoreTimeout",
            ApiError::Store(_) => "StoreError",
            ApiError::RouteNotMatched { .. } => "RouteNotMatched",
        }
    }

    /// HTTP status for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } | ApiError::RouteNotMatched { .. } => StatusCode::NOT_FOUND,
            ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(err) => log_error!("Store call failed: {}", err),
            ApiError::Decode(msg) => log_warn!("Rejected request body: {}", msg),
            _ => {}
        }

        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
