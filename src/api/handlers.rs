//! HTTP request handlers for the resource API
//!
//! One set of generic handlers serves every resource. Each handler resolves
//! the resource name, makes exactly one bounded store call per document
//! operation and maps the outcome to a response or an [`ApiError`].

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::api::codec::{encode_document, encode_documents, FieldsRequest, JsonRequest};
use crate::api::error::ApiError;
use crate::core::AppState;
use crate::resource::ResourceSchema;
use crate::storage::{bounded, StorageImpl, StoreError};
use crate::types::DocumentId;
use crate::{log_debug, log_error, log_info};

/// System health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Current system status
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since the application state was created
    pub uptime_secs: u64,
}

/// One served resource in `/info`
#[derive(Debug, Serialize)]
pub struct ResourceInfo {
    /// Resource name
    pub name: String,
    /// Documents currently stored
    pub count: usize,
    /// Whether the resource declares no fields
    pub schemaless: bool,
}

/// System information response
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Service name
    pub name: String,
    /// Service version
    pub version: String,
    /// Active storage backend
    pub storage_type: String,
    /// Whether undeclared resource names are served
    pub dynamic_resources: bool,
    /// Declared resources with document counts
    pub resources: Vec<ResourceInfo>,
}

type AppStateRef<S> = State<Arc<AppState<S>>>;

/// Look up the schema of `resource`, or fail as an unmatched route
fn schema_for<'a, S: StorageImpl>(
    app_state: &'a AppState<S>,
    method: Method,
    resource: &str,
    id: Option<&str>,
) -> Result<&'a ResourceSchema, ApiError> {
    app_state.resources.resolve(resource).ok_or_else(|| {
        let prefix = &app_state.config.api.prefix;
        let path = match id {
            Some(id) => format!("{}/{}/{}", prefix, resource, id),
            None => format!("{}/{}", prefix, resource),
        };
        ApiError::RouteNotMatched {
            method: method.to_string(),
            path,
        }
    })
}

/// Parse a path id; an id that cannot exist is reported as not found
fn parse_id(resource: &str, id: &str) -> Result<DocumentId, ApiError> {
    id.parse::<DocumentId>().map_err(|e| {
        log_debug!("Unparseable {} id '{}': {}", resource, id, e);
        ApiError::not_found(resource, id)
    })
}

/// Run one store call under the configured timeout and time it
async fn store_call<S, T, F>(
    app_state: &AppState<S>,
    operation: &'static str,
    call: F,
) -> Result<T, StoreError>
where
    S: StorageImpl,
    F: Future<Output = Result<T, StoreError>>,
{
    let started = Instant::now();
    let result = bounded(app_state.config.storage.operation_timeout, call).await;
    app_state.metrics.record_store_call(operation, started.elapsed());
    result
}

/// Metrics label shared by every resource that was not declared
const DYNAMIC_RESOURCE_LABEL: &str = "_dynamic";

/// Count the request outcome and pass it through
fn finish<S: StorageImpl, T>(
    app_state: &AppState<S>,
    resource: &str,
    operation: &str,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    if matches!(result, Err(ApiError::RouteNotMatched { .. })) {
        return result;
    }
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    let label = if app_state.resources.is_declared(resource) {
        resource
    } else {
        DYNAMIC_RESOURCE_LABEL
    };
    app_state.metrics.record_request(label, operation, outcome);
    result
}

// Resource handlers

/// List every document of a resource, in insertion order
pub async fn list_documents<S: StorageImpl>(
    State(app_state): AppStateRef<S>,
    Path(resource): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        schema_for(&app_state, Method::GET, &resource, None)?;
        let docs = store_call(&app_state, "find_all", app_state.store.find_all(&resource)).await?;
        log_debug!("Listed {} {}", docs.len(), resource);
        Ok::<_, ApiError>(Json(encode_documents(docs, &app_state.config.codec.id_field)))
    }
    .await;
    finish(&app_state, &resource, "list", result)
}

/// Fetch one document
pub async fn get_document<S: StorageImpl>(
    State(app_state): AppStateRef<S>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        schema_for(&app_state, Method::GET, &resource, Some(&id))?;
        let doc_id = parse_id(&resource, &id)?;
        let lookup = app_state.store.find_by_id(&resource, &doc_id);
        let doc = store_call(&app_state, "find_by_id", lookup)
            .await?
            .ok_or_else(|| ApiError::not_found(&resource, &id))?;
        Ok::<_, ApiError>(Json(encode_document(doc, &app_state.config.codec.id_field)))
    }
    .await;
    finish(&app_state, &resource, "get", result)
}

/// Create a document; the store assigns its id
pub async fn create_document<S: StorageImpl>(
    State(app_state): AppStateRef<S>,
    Path(resource): Path<String>,
    body: Result<FieldsRequest, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        let schema = schema_for(&app_state, Method::POST, &resource, None)?;
        let JsonRequest(payload) = body?;
        let fields = schema.validate(payload, &app_state.config.codec.id_field)?;

        let insert = app_state.store.insert(&resource, fields);
        let doc = store_call(&app_state, "insert", insert).await?;
        log_info!("Created {} {}", resource, doc.id);
        Ok::<_, ApiError>(Json(encode_document(doc, &app_state.config.codec.id_field)))
    }
    .await;
    finish(&app_state, &resource, "create", result)
}

/// Replace every domain field of a document with the payload
pub async fn update_document<S: StorageImpl>(
    State(app_state): AppStateRef<S>,
    Path((resource, id)): Path<(String, String)>,
    body: Result<FieldsRequest, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        let schema = schema_for(&app_state, Method::PUT, &resource, Some(&id))?;
        let doc_id = parse_id(&resource, &id)?;
        let JsonRequest(payload) = body?;
        let fields = schema.validate(payload, &app_state.config.codec.id_field)?;

        let doc = store_call(
            &app_state,
            "replace_by_id",
            app_state.store.replace_by_id(&resource, &doc_id, fields),
        )
        .await?
        .ok_or_else(|| ApiError::not_found(&resource, &id))?;
        log_info!("Updated {} {}", resource, doc.id);
        Ok::<_, ApiError>(Json(encode_document(doc, &app_state.config.codec.id_field)))
    }
    .await;
    finish(&app_state, &resource, "update", result)
}

/// Delete a document; success has an empty body
pub async fn delete_document<S: StorageImpl>(
    State(app_state): AppStateRef<S>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let result = async {
        schema_for(&app_state, Method::DELETE, &resource, Some(&id))?;
        let doc_id = parse_id(&resource, &id)?;
        let delete = app_state.store.delete_by_id(&resource, &doc_id);
        let existed = store_call(&app_state, "delete_by_id", delete).await?;
        if !existed {
            return Err(ApiError::not_found(&resource, &id));
        }
        log_info!("Deleted {} {}", resource, id);
        Ok::<_, ApiError>(StatusCode::OK)
    }
    .await;
    finish(&app_state, &resource, "delete", result)
}

// System handlers

/// API root banner
pub async fn api_root<S: StorageImpl>(State(app_state): AppStateRef<S>) -> Json<Value> {
    let prefix = &app_state.config.api.prefix;
    let resources: Vec<String> = app_state
        .resources
        .declared()
        .iter()
        .map(|name| format!("{}/{}", prefix, name))
        .collect();

    Json(json!({
        "message": format!("{} API is running", crate::NAME),
        "version": crate::VERSION,
        "resources": resources,
        "dynamic_resources": app_state.resources.is_dynamic(),
    }))
}

/// Health check endpoint
pub async fn health_check<S: StorageImpl>(
    State(app_state): AppStateRef<S>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        uptime_secs: app_state.started_at.elapsed().as_secs(),
    })
}

/// System information endpoint
pub async fn system_info<S: StorageImpl>(
    State(app_state): AppStateRef<S>,
) -> Result<Json<InfoResponse>, ApiError> {
    let mut resources = Vec::with_capacity(app_state.resources.declared().len());
    for name in app_state.resources.declared() {
        let count = store_call(&app_state, "count", app_state.store.count(name)).await?;
        let schemaless = app_state
            .resources
            .resolve(name)
            .map(ResourceSchema::is_schemaless)
            .unwrap_or(true);
        resources.push(ResourceInfo {
            name: name.clone(),
            count,
            schemaless,
        });
    }

    Ok(Json(InfoResponse {
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        storage_type: app_state.config.storage.storage_type.as_str().to_string(),
        dynamic_resources: app_state.resources.is_dynamic(),
        resources,
    }))
}

/// Prometheus metrics endpoint
pub async fn metrics_handler<S: StorageImpl>(State(app_state): AppStateRef<S>) -> Response {
    match app_state.metrics.render() {
        Ok(body) => ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            log_error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Fallback for every unmatched path or method
pub async fn route_not_matched(method: Method, uri: Uri) -> ApiError {
    log_debug!("No route for {} {}", method, uri.path());
    ApiError::RouteNotMatched {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
