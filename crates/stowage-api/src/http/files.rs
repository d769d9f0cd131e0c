//! Download-area browsing, streaming downloads, and deletions.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use serde::Serialize;
use stowage_fsops::mime::mime_type_for;
use stowage_fsops::{FileDetails, FileEntry, FolderSummary};
use tokio::fs::File;
use tracing::{error, info};

use crate::http::errors::ApiError;
use crate::http::run_blocking;
use crate::http::streaming::{attachment, header_safe_filename};
use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct FileListResponse {
    success: bool,
    files: Vec<FileEntry>,
}

#[derive(Serialize)]
pub(crate) struct FolderListResponse {
    success: bool,
    folders: Vec<FolderSummary>,
}

#[derive(Serialize)]
pub(crate) struct FileInfoResponse {
    success: bool,
    file: FileDetails,
}

#[derive(Serialize)]
pub(crate) struct DeleteResponse {
    success: bool,
    message: String,
}

pub(crate) async fn list_files(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<FileListResponse>, ApiError> {
    let inventory = state.inventory.clone();
    let files = run_blocking("files.list", move || Ok(inventory.list_files().collect())).await?;
    Ok(Json(FileListResponse {
        success: true,
        files,
    }))
}

pub(crate) async fn list_folders(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<FolderListResponse>, ApiError> {
    let inventory = state.inventory.clone();
    let folders = run_blocking("folders.list", move || {
        inventory.list_folders().map_err(ApiError::from)
    })
    .await?;
    Ok(Json(FolderListResponse {
        success: true,
        folders,
    }))
}

pub(crate) async fn file_info(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<String>,
) -> Result<Json<FileInfoResponse>, ApiError> {
    let inventory = state.inventory.clone();
    let file = run_blocking("files.info", move || {
        inventory.file_info(&path).map_err(ApiError::from)
    })
    .await?;
    Ok(Json(FileInfoResponse {
        success: true,
        file,
    }))
}

pub(crate) async fn download_file(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let inventory = state.inventory.clone();
    let (absolute, size) = run_blocking("files.download", move || {
        inventory.locate_file(&path).map_err(ApiError::from)
    })
    .await?;
    let file = File::open(&absolute).await.map_err(|err| {
        error!(path = %absolute.display(), error = %err, "failed to open download");
        ApiError::not_found("Requested entry not found")
    })?;
    let name = absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    attachment(
        file,
        mime_type_for(&absolute),
        &header_safe_filename(&name),
        size,
    )
}

pub(crate) async fn delete_file(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let inventory = state.inventory.clone();
    let target = path.clone();
    run_blocking("files.delete", move || {
        inventory.delete_file(&target).map_err(ApiError::from)
    })
    .await?;
    state.telemetry.inc_content_deletion("file");
    info!(path = %path, "file deleted via api");
    Ok(Json(DeleteResponse {
        success: true,
        message: format!("File {path} deleted successfully"),
    }))
}

pub(crate) async fn delete_folder(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let inventory = state.inventory.clone();
    let target = path.clone();
    run_blocking("folders.delete", move || {
        inventory.delete_folder(&target).map_err(ApiError::from)
    })
    .await?;
    state.telemetry.inc_content_deletion("folder");
    info!(path = %path, "folder deleted via api");
    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Folder {path} deleted successfully"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    use axum::body::to_bytes;
    use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
    use axum::http::{HeaderValue, StatusCode};

    use crate::http::constants::CODE_UNSAFE_PATH;
    use crate::state::test_support::Harness;

    type TestResult<T> = Result<T, Box<dyn Error>>;

    #[tokio::test]
    async fn listings_cover_files_and_top_level_folders() -> TestResult<()> {
        let harness = Harness::new()?;
        harness.root.write_file("loose.txt", b"abc")?;
        harness.root.write_file("Show/S01/e01.mkv", b"0123456789")?;
        let state = harness.state()?;

        let Json(files) = list_files(State(state.clone()))
            .await
            .map_err(|err| format!("{err:?}"))?;
        assert_eq!(files.files.len(), 2);

        let Json(folders) = list_folders(State(state))
            .await
            .map_err(|err| format!("{err:?}"))?;
        let show = folders
            .folders
            .iter()
            .find(|folder| folder.name == "Show")
            .ok_or("missing Show folder")?;
        assert_eq!(show.file_count, 1);
        assert_eq!(show.size, 10);
        Ok(())
    }

    #[tokio::test]
    async fn download_streams_contents_with_attachment_headers() -> TestResult<()> {
        let harness = Harness::new()?;
        harness.root.write_file("Show/e01.mkv", b"video-bytes")?;
        let state = harness.state()?;

        let response = download_file(State(state), Path("Show/e01.mkv".to_string()))
            .await
            .map_err(|err| format!("{err:?}"))?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).map(HeaderValue::as_bytes),
            Some(&b"video/x-matroska"[..])
        );
        assert_eq!(
            response.headers().get(CONTENT_DISPOSITION).map(HeaderValue::as_bytes),
            Some(&b"attachment; filename=\"e01.mkv\""[..])
        );
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"video-bytes");
        Ok(())
    }

    #[tokio::test]
    async fn traversal_and_missing_paths_are_rejected() -> TestResult<()> {
        let harness = Harness::new()?;
        harness.root.create_dir("Show")?;
        let state = harness.state()?;

        let Err(escape) =
            download_file(State(state.clone()), Path("../../etc/passwd".to_string())).await
        else {
            return Err("expected rejection".into());
        };
        assert_eq!(escape.status, StatusCode::BAD_REQUEST);
        assert_eq!(escape.code, CODE_UNSAFE_PATH);

        let Err(missing) = file_info(State(state.clone()), Path("nope.txt".to_string())).await
        else {
            return Err("expected not found".into());
        };
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let Err(directory) = download_file(State(state), Path("Show".to_string())).await else {
            return Err("expected rejection".into());
        };
        assert_eq!(directory.status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn deletions_remove_content_and_count_metrics() -> TestResult<()> {
        let harness = Harness::new()?;
        harness.root.write_file("a.txt", b"a")?;
        harness.root.write_file("Folder/b.txt", b"b")?;
        let state = harness.state()?;

        let _ = delete_file(State(state.clone()), Path("a.txt".to_string()))
            .await
            .map_err(|err| format!("{err:?}"))?;
        let _ = delete_folder(State(state.clone()), Path("Folder".to_string()))
            .await
            .map_err(|err| format!("{err:?}"))?;
        assert!(!harness.root.path().join("a.txt").exists());
        assert!(!harness.root.path().join("Folder").exists());

        let rendered = harness.metrics.render()?;
        assert!(rendered.contains("content_deletions_total{target=\"file\"} 1"));
        assert!(rendered.contains("content_deletions_total{target=\"folder\"} 1"));
        Ok(())
    }
}
