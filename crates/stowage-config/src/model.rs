//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; parsing lives in `loader.rs` and `validate.rs`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::Serialize;
use stowage_telemetry::LogFormat;

/// Fully validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory every file operation is confined to.
    pub download_root: PathBuf,
    /// Interface the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the HTTP listener binds to.
    pub http_port: u16,
    /// Log level directive used when `RUST_LOG` is absent.
    pub log_level: String,
    /// Output format for the tracing subscriber.
    pub log_format: LogFormat,
    /// Archive generation knobs.
    pub archive: ArchiveSettings,
    /// Maximum accepted size of an uploaded metainfo file.
    pub max_metainfo_bytes: usize,
}

impl AppConfig {
    /// Socket address assembled from the bind address and port.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

/// Settings for on-demand ZIP generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveSettings {
    /// Deflate compression level (0-9).
    pub compression_level: u8,
}
