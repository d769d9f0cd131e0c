//! Torrent management endpoints.
//!
//! `POST /api/add-torrent` accepts either a multipart upload carrying a `.torrent`
//! file in the `torrent_file` field, or a JSON body `{"magnet_link": "..."}`; the
//! request content type selects the branch.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Path, Query, Request, State, rejection::QueryRejection},
    http::header::CONTENT_TYPE,
};
use serde::{Deserialize, Serialize};
use stowage_torrent_core::{RemoveTorrent, TorrentRecord, TorrentSource};
use tracing::{debug, info};
use uuid::Uuid;

use crate::http::constants::{UPLOAD_EXTENSION, UPLOAD_FIELD};
use crate::http::errors::ApiError;
use crate::state::ApiState;

const INVALID_UPLOAD: &str = "Invalid file format or no file selected";

#[derive(Debug, Deserialize)]
pub(crate) struct AddMagnetRequest {
    #[serde(default)]
    magnet_link: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct AddTorrentResponse {
    success: bool,
    id: Uuid,
    created: bool,
    message: &'static str,
    torrent: TorrentRecord,
}

#[derive(Serialize)]
pub(crate) struct TorrentListResponse {
    success: bool,
    torrents: Vec<TorrentRecord>,
}

#[derive(Serialize)]
pub(crate) struct TorrentResponse {
    success: bool,
    torrent: TorrentRecord,
}

#[derive(Serialize)]
pub(crate) struct ActionResponse {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
pub(crate) struct RemoveResponse {
    success: bool,
    message: &'static str,
    content_deleted: bool,
}

pub(crate) async fn add_torrent(
    State(state): State<Arc<ApiState>>,
    request: Request,
) -> Result<Json<AddTorrentResponse>, ApiError> {
    let source = read_source(&state, request).await?;
    let outcome = state.registry.add(source).await?;
    state.record_tracked();
    let message = if outcome.created {
        "Torrent added successfully"
    } else {
        "Torrent already tracked"
    };
    Ok(Json(AddTorrentResponse {
        success: true,
        id: outcome.id,
        created: outcome.created,
        message,
        torrent: outcome.record,
    }))
}

pub(crate) async fn list_torrents(
    State(state): State<Arc<ApiState>>,
) -> Json<TorrentListResponse> {
    let torrents = state.registry.list().await;
    state.record_tracked();
    Json(TorrentListResponse {
        success: true,
        torrents,
    })
}

pub(crate) async fn get_torrent(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<TorrentResponse>, ApiError> {
    let id = parse_id(&id)?;
    let torrent = state.registry.status(id).await?;
    Ok(Json(TorrentResponse {
        success: true,
        torrent,
    }))
}

pub(crate) async fn pause_torrent(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.registry.pause(parse_id(&id)?)?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Torrent paused",
    }))
}

pub(crate) async fn resume_torrent(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.registry.resume(parse_id(&id)?)?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Torrent resumed",
    }))
}

pub(crate) async fn delete_torrent(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    options: Result<Query<RemoveTorrent>, QueryRejection>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Query(options) = options.map_err(|rejection| {
        debug!(error = %rejection, "rejected removal options");
        ApiError::bad_request("Invalid removal options")
    })?;
    let outcome = state.registry.remove(id, options).await?;
    state.record_tracked();
    if outcome.content_deleted {
        state.telemetry.inc_content_deletion("torrent");
    }
    info!(torrent_id = %id, content_deleted = outcome.content_deleted, "torrent removed via api");
    Ok(Json(RemoveResponse {
        success: true,
        message: "Torrent removed",
        content_deleted: outcome.content_deleted,
    }))
}

/// Ids that do not parse cannot name a tracked torrent.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Torrent not found"))
}

async fn read_source(state: &Arc<ApiState>, request: Request) -> Result<TorrentSource, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection, "rejected multipart upload");
                ApiError::bad_request(INVALID_UPLOAD)
            })?;
        return read_upload(multipart, state.max_metainfo_bytes).await;
    }

    if content_type.starts_with("application/json") {
        let Json(body) = Json::<AddMagnetRequest>::from_request(request, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection, "rejected magnet body");
                ApiError::bad_request("Malformed JSON body")
            })?;
        return Ok(TorrentSource::magnet(body.magnet_link.unwrap_or_default()));
    }

    Err(ApiError::bad_request("No torrent data provided"))
}

async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<TorrentSource, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        debug!(error = %err, "malformed multipart stream");
        ApiError::bad_request(INVALID_UPLOAD)
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let accepted = field
            .file_name()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(UPLOAD_EXTENSION));
        if !accepted {
            return Err(ApiError::bad_request(INVALID_UPLOAD));
        }
        let bytes = field.bytes().await.map_err(|err| {
            debug!(error = %err, "failed to read uploaded torrent");
            ApiError::bad_request("Torrent file too large or unreadable")
        })?;
        if bytes.len() > limit {
            return Err(ApiError::bad_request("Torrent file too large or unreadable"));
        }
        return Ok(TorrentSource::metainfo(bytes.to_vec()));
    }
    Err(ApiError::bad_request(INVALID_UPLOAD))
}
