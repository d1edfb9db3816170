//! HTTP API Server
//!
//! Router, shared state and server lifecycle for the gateway.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::docs::openapi_document;
use super::handlers::{handle_get_object, handle_list_buckets, handle_list_objects};
use super::mapping::HelloResponse;
use super::upload::{handle_upload, handle_upload_form};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::storage::ObjectStore;

/// Upload destination settings resolved from configuration
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub bucket: String,
    pub key_prefix: String,
    pub content_type: String,
    pub url_expiry: Duration,
}

impl UploadSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            bucket: config.upload.bucket.clone(),
            key_prefix: config.upload.key_prefix.clone(),
            content_type: config.upload.content_type.clone(),
            url_expiry: config.url_expiry(),
        }
    }
}

/// Shared application state; immutable after startup
pub struct AppState {
    /// Storage provider
    pub store: Arc<dyn ObjectStore>,
    /// Upload destination
    pub upload: UploadSettings,
}

/// HTTP API server
pub struct HttpServer {
    bind_address: SocketAddr,
    cors_enabled: bool,
    max_upload_bytes: usize,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: &GatewayConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let state = Arc::new(AppState {
            store,
            upload: UploadSettings::from_config(config),
        });

        Ok(Self {
            bind_address: config.bind_address()?,
            cors_enabled: config.server.cors_enabled,
            max_upload_bytes: config.server.max_upload_bytes,
            state,
        })
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Build the router with middleware applied
    pub fn router(&self) -> Router {
        let router = create_router(Arc::clone(&self.state), self.max_upload_bytes)
            .layer(TraceLayer::new_for_http());

        if self.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Start the HTTP server and run until `shutdown` resolves
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(self.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Internal(format!("HTTP server error: {}", e)))?;

        tracing::info!("HTTP API stopped");
        Ok(())
    }
}

/// Create the router
pub(crate) fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        // Bucket and object browsing
        .route("/api/buckets", get(handle_list_buckets))
        .route("/api/buckets/:bucket_name/objects", get(handle_list_objects))
        .route("/api/buckets/:bucket_name/objects/*object_key", get(handle_get_object))
        // Uploads
        .route(
            "/upload",
            get(handle_upload_form)
                .post(handle_upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        // Health and docs
        .route("/hello", get(handle_hello))
        .route("/api-docs/openapi.json", get(handle_openapi))
        .with_state(state)
}

async fn handle_hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "hi".to_string(),
    })
}

async fn handle_openapi() -> Json<serde_json::Value> {
    Json(openapi_document())
}
