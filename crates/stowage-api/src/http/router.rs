//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{delete, get, post},
};
use stowage_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::archives::{folder_archive, selection_archive};
use crate::http::constants::{HEADER_REQUEST_ID, MULTIPART_OVERHEAD_BYTES};
use crate::http::files::{
    delete_file, delete_folder, download_file, file_info, list_files, list_folders,
};
use crate::http::health::{health, metrics};
use crate::http::storage::storage_usage;
use crate::http::telemetry::track_request;
use crate::http::torrents::{
    add_torrent, delete_torrent, get_torrent, list_torrents, pause_torrent, resume_torrent,
};
use crate::state::{ApiDependencies, ApiState};

/// Axum router wrapper that hosts the Stowage API services.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the API with its dependencies wired through application state.
    #[must_use]
    pub fn new(deps: ApiDependencies) -> Self {
        let state = Arc::new(ApiState::new(deps));
        let telemetry = state.telemetry.clone();
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(stowage_telemetry::propagate_request_id_layer())
            .layer(stowage_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(telemetry, track_request));

        let router = Self::build_router(&state)
            .route_layer(layered)
            .with_state(state);
        Self { router }
    }

    fn build_router(state: &ApiState) -> Router<Arc<ApiState>> {
        Self::public_routes()
            .merge(Self::torrent_routes(state.max_metainfo_bytes))
            .merge(Self::file_routes())
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn torrent_routes(max_metainfo_bytes: usize) -> Router<Arc<ApiState>> {
        let upload_limit = max_metainfo_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
        Router::new()
            .route(
                "/api/add-torrent",
                post(add_torrent).layer(DefaultBodyLimit::max(upload_limit)),
            )
            .route("/api/torrents", get(list_torrents))
            .route("/api/torrents/{id}", get(get_torrent))
            .route("/api/torrent/{id}", get(get_torrent).delete(delete_torrent))
            .route("/api/torrent/{id}/pause", post(pause_torrent))
            .route("/api/torrent/{id}/resume", post(resume_torrent))
    }

    fn file_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/api/storage", get(storage_usage))
            .route("/api/files", get(list_files))
            .route("/api/folders", get(list_folders))
            .route("/api/download/{*path}", get(download_file))
            .route("/api/file-info/{*path}", get(file_info))
            .route("/api/file/{*path}", delete(delete_file))
            .route("/api/folder/{*path}", delete(delete_folder))
            .route("/api/folder-archive/{*path}", get(folder_archive))
            .route("/api/files-archive", post(selection_archive))
    }

    /// Serve the API on `addr` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "api listening");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
