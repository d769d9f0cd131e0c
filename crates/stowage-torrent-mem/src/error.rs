//! Error types for the in-process engine.

use thiserror::Error;

/// Errors raised while admitting or managing torrents in memory.
#[derive(Debug, Error)]
pub enum MemEngineError {
    /// The bencoded payload is structurally invalid.
    #[error("bencode payload malformed")]
    Malformed {
        /// Byte offset where decoding failed.
        offset: usize,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The payload decoded but is not a usable metainfo file.
    #[error("metainfo invalid")]
    InvalidMetainfo {
        /// Metainfo key that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The magnet link cannot be used.
    #[error("magnet link invalid")]
    InvalidMagnet {
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The handle is not (or no longer) tracked by this engine.
    #[error("torrent handle not tracked")]
    UnknownHandle {
        /// Hex info hash of the handle.
        info_hash: String,
    },
}

/// Convenience alias for engine results.
pub type MemEngineResult<T> = Result<T, MemEngineError>;
