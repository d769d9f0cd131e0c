//! Error types for torrent registry operations.

use std::error::Error;

use thiserror::Error;
use uuid::Uuid;

/// Primary error type for torrent operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// The submitted source was malformed before reaching the engine.
    #[error("torrent source invalid")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The engine refused the submitted source.
    #[error("engine rejected torrent")]
    EngineRejected {
        /// Underlying engine failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Torrent was not found.
    #[error("torrent not found")]
    NotFound {
        /// Missing torrent identifier.
        torrent_id: Uuid,
    },
    /// Operation failed in the underlying engine.
    #[error("torrent operation failed")]
    Internal {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent identifier when available.
        torrent_id: Option<Uuid>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TorrentError {
    pub(crate) fn internal(operation: &'static str, torrent_id: Uuid, source: anyhow::Error) -> Self {
        Self::Internal {
            operation,
            torrent_id: Some(torrent_id),
            source: source.into(),
        }
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
