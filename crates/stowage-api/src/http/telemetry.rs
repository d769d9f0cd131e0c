//! Per-request accounting: request context, request counts, and attachment bytes.

use axum::{
    extract::{MatchedPath, Request, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH},
    middleware::Next,
    response::Response,
};
use stowage_telemetry::{Metrics, RequestContext};

use crate::http::constants::HEADER_REQUEST_ID;

const UNMATCHED_ROUTE: &str = "unmatched";

/// Scope a [`RequestContext`] around the handler, then count the response by matched
/// route and status. Attachments (downloads and archives) also add their length to
/// `served_bytes_total`.
pub(crate) async fn track_request(
    State(telemetry): State<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    // Matched templates keep user paths (file names, torrent ids) out of label values.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_string();
    let request_id = request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let context = RequestContext::new(request_id, route);

    let response = context.clone().scope(next.run(request)).await;

    telemetry.inc_http_request(context.route(), response.status().as_u16());
    if let Some(bytes) = attachment_length(&response) {
        telemetry.add_served_bytes(context.route(), bytes);
    }
    response
}

fn attachment_length(response: &Response) -> Option<u64> {
    let headers = response.headers();
    let is_attachment = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("attachment"));
    if !is_attachment {
        return None;
    }
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::StatusCode,
        middleware,
        response::IntoResponse,
        routing::get,
    };
    use tower::ServiceExt;

    type TestResult<T> = Result<T, Box<dyn Error>>;

    async fn echo_context() -> String {
        RequestContext::current()
            .map(|context| format!("{} {}", context.request_id(), context.route()))
            .unwrap_or_default()
    }

    async fn attachment() -> impl IntoResponse {
        (
            [
                (CONTENT_DISPOSITION, "attachment; filename=\"a.bin\""),
                (CONTENT_LENGTH, "5"),
            ],
            "hello",
        )
    }

    async fn inline() -> impl IntoResponse {
        ([(CONTENT_LENGTH, "4")], "page")
    }

    fn app(metrics: Metrics) -> Router {
        Router::new()
            .route("/torrents/{id}", get(echo_context))
            .route("/download/{*path}", get(attachment))
            .route("/page", get(inline))
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route_layer(middleware::from_fn_with_state(metrics, track_request))
    }

    async fn get_path(router: &Router, uri: &str) -> TestResult<Response> {
        let request = Request::builder()
            .uri(uri)
            .header(HEADER_REQUEST_ID, "req-1")
            .body(Body::empty())?;
        Ok(router.clone().oneshot(request).await?)
    }

    fn counter_line(rendered: &str, family: &str, route: &str) -> Option<String> {
        rendered
            .lines()
            .find(|line| line.starts_with(family) && line.contains(&format!("route=\"{route}\"")))
            .map(ToString::to_string)
    }

    #[tokio::test]
    async fn handlers_see_the_request_context() -> TestResult<()> {
        let router = app(Metrics::new()?);
        let response = get_path(&router, "/torrents/0b1c").await?;
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"req-1 /torrents/{id}");
        Ok(())
    }

    #[tokio::test]
    async fn attachments_count_served_bytes_per_route_template() -> TestResult<()> {
        let metrics = Metrics::new()?;
        let router = app(metrics.clone());

        get_path(&router, "/download/Show/e01.mkv").await?;
        get_path(&router, "/download/Show/e02.mkv").await?;
        get_path(&router, "/page").await?;

        let rendered = metrics.render()?;
        let served = counter_line(&rendered, "served_bytes_total", "/download/{*path}")
            .ok_or("missing served bytes")?;
        assert!(served.ends_with(" 10"));
        assert!(counter_line(&rendered, "served_bytes_total", "/page").is_none());
        assert!(!rendered.contains("e01.mkv"));

        let requests = counter_line(&rendered, "http_requests_total", "/download/{*path}")
            .ok_or("missing request counter")?;
        assert!(requests.contains("code=\"200\""));
        assert!(requests.ends_with(" 2"));
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_are_counted_with_their_status() -> TestResult<()> {
        let metrics = Metrics::new()?;
        let router = app(metrics.clone());

        let response = get_path(&router, "/broken").await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let rendered = metrics.render()?;
        let line = counter_line(&rendered, "http_requests_total", "/broken")
            .ok_or("missing request counter")?;
        assert!(line.contains("code=\"500\""));
        assert!(counter_line(&rendered, "served_bytes_total", "/broken").is_none());
        Ok(())
    }
}
