//! Label update endpoint

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use weblabel_common::labels::StoredLabelConfig;

use super::{run_blocking, StatusResponse};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body of a label update
#[derive(Debug, Deserialize)]
pub struct UpdateLabelsRequest {
    /// Target file when it is not given in the path
    #[serde(default)]
    pub filename: Option<String>,
    /// Replacement segments, stored verbatim. Older frontends send
    /// `[{"ubs": [...], "labels": [...]}]` tracks, which are converted first.
    #[serde(default)]
    pub labels: Option<StoredLabelConfig>,
}

/// POST /api/update-labels with `{"filename": ..., "labels": [...]}`
pub async fn update_labels(
    State(state): State<AppState>,
    body: Result<Json<UpdateLabelsRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    let id = request
        .filename
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No filename provided".to_string()))?;
    store_labels(state, id, request).await
}

/// POST /api/update-labels/:id with `{"labels": [...]}`
///
/// The path identifier takes precedence over a body `filename`.
pub async fn update_labels_for(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateLabelsRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    store_labels(state, id, request).await
}

async fn store_labels(
    state: AppState,
    id: String,
    request: UpdateLabelsRequest,
) -> ApiResult<Json<StatusResponse>> {
    let migration = request
        .labels
        .map(StoredLabelConfig::into_canonical)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let labels = migration
        .map(|migration| {
            if migration.dropped_tracks > 0 {
                warn!(
                    "Ignoring {} labeled track(s) past the first in update for {}",
                    migration.dropped_tracks, id
                );
            }
            migration.config
        })
        .filter(|labels| !labels.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No labels provided".to_string()))?;

    info!("Updating labels for {} ({} segments)", id, labels.len());

    let store = Arc::clone(&state.store);
    run_blocking(move || store.set_label_config(&id, &labels)).await?;

    Ok(Json(StatusResponse::success()))
}
