//! Shared HTTP constants (headers, error codes, streaming sizes).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_SKIPPED_ENTRIES: &str = "x-stowage-skipped-entries";

pub(crate) const CODE_INVALID_INPUT: &str = "invalid_input";
pub(crate) const CODE_UNSAFE_PATH: &str = "unsafe_path";
pub(crate) const CODE_NOT_FOUND: &str = "not_found";
pub(crate) const CODE_ENGINE_REJECTED: &str = "engine_rejected";
pub(crate) const CODE_INTERNAL: &str = "internal";

pub(crate) const CONTENT_TYPE_ZIP: &str = "application/zip";
pub(crate) const STREAM_CHUNK_BYTES: usize = 64 * 1024;
/// Room for multipart boundaries and headers on top of the metainfo payload.
pub(crate) const MULTIPART_OVERHEAD_BYTES: usize = 16 * 1024;
pub(crate) const UPLOAD_FIELD: &str = "torrent_file";
pub(crate) const UPLOAD_EXTENSION: &str = ".torrent";
