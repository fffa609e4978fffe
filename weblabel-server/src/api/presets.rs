//! Filter preset endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{run_blocking, StatusResponse};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body of a preset save
#[derive(Debug, Deserialize)]
pub struct SavePresetsRequest {
    #[serde(default)]
    pub presets: Option<Vec<Value>>,
}

/// GET /api/filter-presets
///
/// Saved presets; an empty array before the first save.
pub async fn get_filter_presets(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    let presets = state.presets.clone();
    let saved = run_blocking(move || presets.load()).await?;
    Ok(Json(saved))
}

/// POST /api/filter-presets with `{"presets": [...]}`
pub async fn save_filter_presets(
    State(state): State<AppState>,
    body: Result<Json<SavePresetsRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = body?;
    let presets = request
        .presets
        .filter(|presets| !presets.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No presets provided".to_string()))?;

    let store = state.presets.clone();
    run_blocking(move || store.save(&presets)).await?;

    Ok(Json(StatusResponse::success()))
}
