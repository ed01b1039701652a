//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for items
//! - Request extractors for multipart and JSON item forms
//! - Error to JSON response mapping
//! - Static frontend serving

pub mod error;
pub mod extractors;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use lectern_core::item::ItemService;
use lectern_core::storage::StorageService;
use lectern_db::ItemRepository;
use lectern_shared::config::ServerConfig;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Remote file store for thumbnails and audio files.
    pub storage: Arc<StorageService>,
}

impl AppState {
    /// Item service bound to this state's database and file store.
    #[must_use]
    pub fn item_service(&self) -> ItemService<ItemRepository, StorageService> {
        let repo = ItemRepository::new((*self.db).clone());
        ItemService::new(self.storage.clone(), Arc::new(repo))
    }
}

/// Room for multipart boundaries, part headers and text fields.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Largest accepted request body: one thumbnail and one audio file of
/// `max_upload_bytes` each, plus form framing.
#[must_use]
pub fn body_limit(config: &ServerConfig) -> usize {
    let limit = config
        .max_upload_bytes
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD_BYTES);
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Creates the main application router.
///
/// Unmatched paths fall through to the frontend bundle in `static_dir`, with
/// `index.html` served for client-side routes.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let index = config.static_dir.join("index.html");
    let frontend = ServeDir::new(&config.static_dir).fallback(ServeFile::new(index));

    Router::new()
        .merge(routes::api_routes())
        .fallback_service(frontend)
        .layer(DefaultBodyLimit::max(body_limit(config)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
