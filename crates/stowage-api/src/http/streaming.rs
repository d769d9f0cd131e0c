//! Chunked response bodies backed by open files.

use std::io;

use async_stream::try_stream;
use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use futures_core::Stream;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::error;

use crate::http::constants::STREAM_CHUNK_BYTES;
use crate::http::errors::ApiError;

/// Yield the remaining contents of `file` in fixed-size chunks.
pub(crate) fn file_chunks(mut file: File) -> impl Stream<Item = io::Result<Bytes>> + Send {
    try_stream! {
        let mut buffer = vec![0_u8; STREAM_CHUNK_BYTES];
        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buffer[..read]);
        }
    }
}

/// Build a `200 OK` attachment response streaming `file`.
pub(crate) fn attachment(
    file: File,
    content_type: &str,
    filename: &str,
    length: u64,
) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|err| {
            error!(error = %err, "attachment filename produced an invalid header");
            ApiError::internal()
        })?;
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_DISPOSITION, disposition)
        .header(CONTENT_LENGTH, length)
        .body(Body::from_stream(file_chunks(file)))
        .map_err(|err| {
            error!(error = %err, "failed to assemble attachment response");
            ApiError::internal()
        })
}

/// Reduce a display name to characters that are safe inside a quoted header value.
pub(crate) fn header_safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| {
            if ch == ' ' || (ch.is_ascii_graphic() && ch != '"' && ch != '\\') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_safe_filename_replaces_quotes_and_non_ascii() {
        assert_eq!(header_safe_filename("movie.mkv"), "movie.mkv");
        assert_eq!(header_safe_filename("a\"b\\c.txt"), "a_b_c.txt");
        assert_eq!(header_safe_filename("café.mp3"), "caf_.mp3");
        assert_eq!(header_safe_filename("line\nbreak"), "line_break");
        assert_eq!(header_safe_filename("  "), "download");
    }
}
