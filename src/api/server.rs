//! HTTP server for the resource API

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use std::future::Future;
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use crate::core::{factory::ConfiguredAppState, AppState, Result};
use crate::storage::StorageImpl;
use crate::log_info;

/// Creates the application router with all routes and middleware
pub fn create_app<S: StorageImpl>(app_state: Arc<AppState<S>>) -> Router {
    let config = app_state.config.clone();
    let prefix = config.api.prefix.as_str();

    // Permissive CORS for browser clients
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any)
        .allow_credentials(false);

    let mut router = Router::new()
        // Root route
        .route(prefix, get(handlers::api_root::<S>))

        // Resource routes
        .route(
            &format!("{}/{{resource}}", prefix),
            get(handlers::list_documents::<S>).post(handlers::create_document::<S>),
        )
        .route(
            &format!("{}/{{resource}}/{{id}}", prefix),
            get(handlers::get_document::<S>)
                .put(handlers::update_document::<S>)
                .delete(handlers::delete_document::<S>),
        )

        // System routes
        .route("/health", get(handlers::health_check::<S>))
        .route("/info", get(handlers::system_info::<S>));

    if config.metrics.enabled {
        router = router.route("/metrics", get(handlers::metrics_handler::<S>));
    }

    router = router.method_not_allowed_fallback(handlers::route_not_matched);

    // Static files for everything else, when configured
    router = match &config.server.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(handlers::route_not_matched.into_service()),
        ),
        None => router.fallback(handlers::route_not_matched),
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(config.server.max_body_bytes)),
        )
        .with_state(app_state)
}

/// Bind `addr` and serve `app` until `shutdown` resolves
async fn serve_api_server_with_app<F>(addr: SocketAddr, app: Router, prefix: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    log_info!("Server listening on http://{}", local_addr);
    log_info!("Resource API available at http://{}{}", local_addr, prefix);
    log_info!("Health check available at http://{}/health", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    log_info!("Server stopped");
    Ok(())
}

/// Start the HTTP server with the configured AppState
pub async fn start_api_server<F>(configured_app_state: ConfiguredAppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let http_addr = configured_app_state.http_addr();

    log_info!("Starting resource API server on {}", http_addr);

    // Match once on storage type to get concrete AppState, then start server
    match configured_app_state {
        ConfiguredAppState::Memory { app_state } => {
            log_info!("Starting server with MemStore backend");
            let prefix = app_state.config.api.prefix.clone();
            let app = create_app(app_state);
            serve_api_server_with_app(http_addr, app, &prefix, shutdown).await
        }
        ConfiguredAppState::File { app_state } => {
            log_info!("Starting server with FileStore backend");
            let prefix = app_state.config.api.prefix.clone();
            let app = create_app(app_state);
            serve_api_server_with_app(http_addr, app, &prefix, shutdown).await
        }
    }
}
