//! File catalog, sample and metadata endpoints
//!
//! Files are addressed either by path (`/api/get-file/<id>`) or by a JSON
//! body `{"filename": "<id>"}`, matching both frontend generations.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use weblabel_common::LabelConfig;

use super::run_blocking;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body naming a file
#[derive(Debug, Deserialize)]
pub struct FileRequest {
    pub filename: Option<String>,
}

/// Metadata shown next to the plot
#[derive(Debug, Serialize)]
pub struct FileMetaResponse {
    /// Auxiliary vectors in index order
    pub p: Vec<Vec<f64>>,
    /// Normalized label segments
    pub label: LabelConfig,
}

fn filename_from_body(body: Result<Json<FileRequest>, JsonRejection>) -> ApiResult<String> {
    let Json(request) = body?;
    request
        .filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No filename provided".to_string()))
}

/// GET /api/get-file-list
///
/// Identifiers of every discovered file.
pub async fn get_file_list(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.list_files())
}

/// GET|POST /api/get-file/:id
pub async fn get_file_by_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    sample_bytes(state, id).await
}

/// GET|POST /api/get-file with `{"filename": ...}`
pub async fn get_file_by_body(
    State(state): State<AppState>,
    body: Result<Json<FileRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let id = filename_from_body(body)?;
    sample_bytes(state, id).await
}

/// Samples as i32 in native byte order.
async fn sample_bytes(state: AppState, id: String) -> ApiResult<Response> {
    let store = Arc::clone(&state.store);
    let bytes = run_blocking(move || {
        let loaded = store.load_file(&id)?;
        debug!("Serving {} samples of {} ({:?})", loaded.samples.len(), id, loaded.samples.dtype());
        Ok(loaded.samples.data.to_i32_ne_bytes())
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

/// GET|POST /api/get-file-meta/:id
pub async fn get_file_meta_by_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FileMetaResponse>> {
    file_meta(state, id).await
}

/// GET|POST /api/get-file-meta with `{"filename": ...}`
pub async fn get_file_meta_by_body(
    State(state): State<AppState>,
    body: Result<Json<FileRequest>, JsonRejection>,
) -> ApiResult<Json<FileMetaResponse>> {
    let id = filename_from_body(body)?;
    file_meta(state, id).await
}

async fn file_meta(state: AppState, id: String) -> ApiResult<Json<FileMetaResponse>> {
    let store = Arc::clone(&state.store);
    let loaded = run_blocking(move || store.load_file(&id)).await?;

    Ok(Json(FileMetaResponse {
        p: loaded.aux,
        label: loaded.label_config,
    }))
}
