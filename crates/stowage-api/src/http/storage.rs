//! Storage usage reporting.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use stowage_fsops::StorageReport;

use crate::http::errors::ApiError;
use crate::http::run_blocking;
use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct StorageResponse {
    success: bool,
    storage: StorageReport,
}

/// Probe failures still answer `200` with a zeroed report carrying an `error` note.
pub(crate) async fn storage_usage(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<StorageResponse>, ApiError> {
    let accountant = state.storage.clone();
    let storage = run_blocking("storage.usage", move || Ok(accountant.usage())).await?;
    Ok(Json(StorageResponse {
        success: true,
        storage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    use crate::state::test_support::Harness;

    #[tokio::test]
    async fn storage_reports_volume_and_content_bytes() -> Result<(), Box<dyn Error>> {
        let harness = Harness::new()?;
        harness.root.write_file("Show/e01.mkv", &[0_u8; 2048])?;
        let state = harness.state()?;

        let Json(response) = storage_usage(State(state))
            .await
            .map_err(|err| format!("{err:?}"))?;
        let report = response.storage;
        assert_eq!(report.total_bytes, 100 * 1024 * 1024 * 1024);
        assert_eq!(report.free_bytes, 40 * 1024 * 1024 * 1024);
        assert_eq!(report.used_bytes, 60 * 1024 * 1024 * 1024);
        assert_eq!(report.content_bytes, 2048);
        assert!((report.usage_percent - 60.0).abs() < f64::EPSILON);
        assert!(report.error.is_none());
        Ok(())
    }
}
