//! Router configuration for the HTTP interface.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, download_file, get_storage_settings, list_files, run_cleanup, set_file_expiry,
    set_quota, set_storage_settings, upload_files, AppState,
};
use super::middleware::{create_cors_layer, limit_request_size};

/// Create the main router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    // The size guard replaces axum's default body limit on uploads
    let upload_route = post(upload_files)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            limit_request_size,
        ));

    let file_routes = Router::new()
        .route("/api/files", get(list_files))
        .route("/upload", upload_route)
        .route("/download/:id", get(download_file))
        .route("/files/:id/expiry", post(set_file_expiry))
        .route("/files/:id/delete", post(delete_file));

    let settings_routes = Router::new()
        .route(
            "/settings/storage",
            get(get_storage_settings).post(set_storage_settings),
        )
        .route("/settings/quota", post(set_quota))
        .route("/cleanup", post(run_cleanup));

    Router::new()
        .merge(file_routes)
        .merge(settings_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Full application: API routes plus health check.
pub fn create_app(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    create_router(app_state, cors_origins).merge(create_health_router())
}
