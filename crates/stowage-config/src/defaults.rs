//! Default values applied when an environment variable is absent.
//!
//! # Design
//! - Centralize fallbacks so the loader and documentation stay consistent.

/// Download root used when `STOWAGE_DOWNLOAD_ROOT` is not set.
pub const DOWNLOAD_ROOT: &str = "./downloads";
/// Interface the HTTP listener binds to by default.
pub const BIND_ADDR: &str = "0.0.0.0";
/// HTTP port used when `STOWAGE_HTTP_PORT` is not set.
pub const HTTP_PORT: u16 = 8080;
/// Deflate level for generated archives; favours throughput over ratio.
pub const ARCHIVE_LEVEL: u8 = 6;
/// Upper bound for uploaded `.torrent` payloads.
pub const MAX_METAINFO_BYTES: usize = 5 * 1024 * 1024;
