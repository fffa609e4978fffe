//! Liveness endpoint
//!
//! Besides the build version it reports how many signal files the startup
//! scan indexed, which is the quickest way to spot a misconfigured root.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Signal files in the startup index
    pub indexed_files: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        indexed_files: state.store.list_files().len(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
