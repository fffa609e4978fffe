//! weblabel-server library - HTTP gateway for the label store
//!
//! Maps the labeling frontend's API onto [`LabelStore`] operations and serves
//! the frontend's static assets.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use weblabel_common::{LabelStore, PresetStore};

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// File index and label persistence
    pub store: Arc<dyn LabelStore>,
    /// Filter preset document
    pub presets: PresetStore,
}

impl AppState {
    /// Create new application state
    pub fn new(store: Arc<dyn LabelStore>, presets: PresetStore) -> Self {
        Self { store, presets }
    }
}

/// Build application router
///
/// `static_dir`, when given, is served for every path no API route matches
/// (`/` resolves to its `index.html`).
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    use axum::routing::{get, post};

    let router = Router::new()
        .route("/api/get-file-list", get(api::get_file_list))
        .route(
            "/api/get-file",
            get(api::get_file_by_body).post(api::get_file_by_body),
        )
        .route(
            "/api/get-file/:id",
            get(api::get_file_by_path).post(api::get_file_by_path),
        )
        .route(
            "/api/get-file-meta",
            get(api::get_file_meta_by_body).post(api::get_file_meta_by_body),
        )
        .route(
            "/api/get-file-meta/:id",
            get(api::get_file_meta_by_path).post(api::get_file_meta_by_path),
        )
        .route("/api/update-labels", post(api::update_labels))
        .route("/api/update-labels/:id", post(api::update_labels_for))
        .route(
            "/api/filter-presets",
            get(api::get_filter_presets).post(api::save_filter_presets),
        )
        .merge(api::health_routes())
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
