//! HTTP API handlers for weblabel-server

pub mod files;
pub mod health;
pub mod labels;
pub mod presets;

pub use files::{
    get_file_by_body, get_file_by_path, get_file_list, get_file_meta_by_body,
    get_file_meta_by_path,
};
pub use health::health_routes;
pub use labels::{update_labels, update_labels_for};
pub use presets::{get_filter_presets, save_filter_presets};

use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Body of successful write endpoints
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

/// Run filesystem-bound store work off the async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> weblabel_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Store task failed: {e}")))?
        .map_err(ApiError::from)
}
