//! On-demand ZIP downloads for a folder or an explicit file selection.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use stowage_fsops::{ArchiveRequest, BuiltArchive};
use tokio::fs::File;
use tracing::{debug, info};

use crate::http::constants::{CONTENT_TYPE_ZIP, HEADER_SKIPPED_ENTRIES};
use crate::http::errors::ApiError;
use crate::http::run_blocking;
use crate::http::streaming::attachment;
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionRequest {
    #[serde(default)]
    files: Vec<String>,
}

pub(crate) async fn folder_archive(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let filename = folder_archive_name(&path);
    let request = ArchiveRequest::Folder { path };
    send_archive(&state, request, &filename).await
}

pub(crate) async fn selection_archive(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<SelectionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(selection) = body.map_err(|rejection| {
        debug!(error = %rejection, "rejected archive selection");
        ApiError::bad_request("Malformed JSON body")
    })?;
    let filename = format!("selected_files_{}.zip", Utc::now().format("%Y%m%d_%H%M%S"));
    let request = ArchiveRequest::Selection {
        paths: selection.files,
    };
    send_archive(&state, request, &filename).await
}

async fn send_archive(
    state: &ApiState,
    request: ArchiveRequest,
    filename: &str,
) -> Result<Response, ApiError> {
    let builder = state.archives.clone();
    let kind = request.kind();
    let archive: BuiltArchive = run_blocking("archive.build", move || {
        builder.build(&request).map_err(ApiError::from)
    })
    .await?;

    state.telemetry.record_archive(kind, archive.skipped().len());
    info!(
        kind,
        entries = archive.entries(),
        skipped = archive.skipped().len(),
        size_bytes = archive.size_bytes(),
        "archive ready"
    );

    let skipped = archive.skipped().len();
    let size = archive.size_bytes();
    let file = File::from_std(archive.into_file());
    let mut response = attachment(file, CONTENT_TYPE_ZIP, filename, size)?;
    if skipped > 0 {
        response.headers_mut().insert(
            HeaderName::from_static(HEADER_SKIPPED_ENTRIES),
            HeaderValue::from(skipped),
        );
    }
    Ok(response)
}

/// `<folder basename>.zip`, keeping only letters, digits, spaces, dashes, and underscores.
fn folder_archive_name(path: &str) -> String {
    let base = path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '-' | '_'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "archive.zip".to_string()
    } else {
        format!("{trimmed}.zip")
    }
}
