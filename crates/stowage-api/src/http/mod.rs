//! HTTP surface: routing, handlers, middleware, and the JSON error envelope.

pub(crate) mod archives;
pub(crate) mod constants;
pub(crate) mod errors;
pub(crate) mod files;
pub(crate) mod health;
pub(crate) mod router;
pub(crate) mod storage;
pub(crate) mod streaming;
pub(crate) mod telemetry;
pub(crate) mod torrents;

use tracing::error;

use crate::http::errors::ApiError;

/// Run synchronous filesystem work off the async executor.
pub(crate) async fn run_blocking<T, F>(operation: &'static str, task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|err| {
        error!(operation, error = %err, "blocking task did not complete");
        ApiError::internal()
    })?
}
