//! JSON error envelope returned by every failing endpoint.
//!
//! Bodies look like `{"success": false, "code": "...", "message": "..."}`. Internal
//! failures are logged here with full context; callers only see a generic message.
//! Every 5xx envelope is also logged against the active request id and route.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use stowage_fsops::FsOpsError;
use stowage_telemetry::RequestContext;
use stowage_torrent_core::TorrentError;
use tracing::error;

use crate::http::constants::{
    CODE_ENGINE_REJECTED, CODE_INTERNAL, CODE_INVALID_INPUT, CODE_NOT_FOUND, CODE_UNSAFE_PATH,
};

const INTERNAL_MESSAGE: &str = "internal server error";

/// Structured API error.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
}

impl ApiError {
    const fn new(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_INVALID_INPUT, message.into())
    }

    pub(crate) fn unsafe_path(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_UNSAFE_PATH, message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, CODE_NOT_FOUND, message.into())
    }

    pub(crate) fn engine_rejected(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_ENGINE_REJECTED, message.into())
    }

    pub(crate) fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            CODE_INTERNAL,
            INTERNAL_MESSAGE.to_string(),
        )
    }

    #[cfg(test)]
    pub(crate) fn message(&self) -> &str {
        &self.message
    }
}

impl From<FsOpsError> for ApiError {
    fn from(err: FsOpsError) -> Self {
        match err {
            FsOpsError::UnsafePath { .. } => Self::unsafe_path("Invalid file path"),
            FsOpsError::NotFound { .. } => Self::not_found("Requested entry not found"),
            FsOpsError::InvalidInput { field, reason, .. } => match reason {
                "not_a_file" => Self::bad_request("Path is not a file"),
                "not_a_folder" => Self::bad_request("Path is not a folder"),
                "root_folder" => Self::bad_request("The download root cannot be deleted"),
                "empty" if field == "files" => Self::bad_request("No files specified"),
                _ => Self::bad_request(format!("Invalid {field}")),
            },
            err @ (FsOpsError::Io { .. } | FsOpsError::Zip { .. }) => {
                error!(error = %err, detail = ?err, "filesystem operation failed");
                Self::internal()
            }
        }
    }
}

impl From<TorrentError> for ApiError {
    fn from(err: TorrentError) -> Self {
        match err {
            TorrentError::InvalidInput { field, reason } => match (field, reason) {
                ("magnet_link", "empty") => Self::bad_request("No magnet link provided"),
                ("magnet_link", _) => Self::bad_request("Invalid magnet link"),
                _ => Self::bad_request("Invalid file format or no file selected"),
            },
            TorrentError::EngineRejected { .. } => {
                Self::engine_rejected("The torrent engine rejected this torrent")
            }
            TorrentError::NotFound { .. } => Self::not_found("Torrent not found"),
            err @ TorrentError::Internal { .. } => {
                error!(error = %err, detail = ?err, "torrent operation failed");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            let context = RequestContext::current();
            error!(
                request_id = context.as_ref().map_or("", RequestContext::request_id),
                route = context.as_ref().map_or("", RequestContext::route),
                code = self.code,
                "request failed"
            );
        }
        let body = ErrorBody {
            success: false,
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
