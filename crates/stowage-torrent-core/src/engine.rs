//! Engine traits implemented by torrent adapters.
//!
//! The protocol engine is a black box: the registry only ever talks to it through
//! these traits, so any adapter (or a test double) can be substituted.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{EngineStatus, InfoHash, TorrentMetadata};

/// Live handle to one torrent inside the engine.
pub trait EngineHandle: Send + Sync {
    /// Info hash of the torrent this handle tracks.
    fn info_hash(&self) -> InfoHash;

    /// Last-known counters and flags; never waits on network activity.
    fn status(&self) -> EngineStatus;

    /// Pause transfers.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot apply the request.
    fn pause(&self) -> anyhow::Result<()>;

    /// Resume transfers.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot apply the request.
    fn resume(&self) -> anyhow::Result<()>;

    /// Name and file table, once known.
    fn metadata(&self) -> Option<TorrentMetadata>;

    /// Name supplied alongside the source (a magnet `dn`), used until metadata arrives.
    fn display_name(&self) -> Option<String> {
        None
    }
}

/// Primary engine trait implemented by adapters.
#[async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Admit a torrent from bencoded metainfo.
    ///
    /// Adding content already present returns the existing handle.
    async fn add_by_metadata(&self, bytes: &[u8]) -> anyhow::Result<Arc<dyn EngineHandle>>;

    /// Admit a torrent from a magnet URI.
    ///
    /// Adding content already present returns the existing handle.
    async fn add_by_magnet(&self, uri: &str) -> anyhow::Result<Arc<dyn EngineHandle>>;

    /// Detach a handle from the engine. Never touches content on disk.
    async fn remove(&self, handle: &dyn EngineHandle) -> anyhow::Result<()>;
}
