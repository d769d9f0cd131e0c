//! In-process engine: admits torrents, tracks handles, and exposes test controls.
//!
//! # Design
//! - Handles are keyed by info hash; admitting known content returns the existing
//!   handle so the engine never holds two handles for one torrent.
//! - No network I/O happens here. Progress, completion, and rates only change through
//!   the control methods on [`MemTorrent`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use stowage_torrent_core::{EngineHandle, EngineStatus, InfoHash, TorrentEngine, TorrentMetadata};
use tracing::{debug, error};

use crate::error::MemEngineError;
use crate::magnet::Magnet;
use crate::metainfo::Metainfo;

#[derive(Debug, Default)]
struct TorrentState {
    status: EngineStatus,
    metadata: Option<TorrentMetadata>,
    display_name: Option<String>,
}

/// One torrent tracked by [`InMemoryEngine`].
#[derive(Debug)]
pub struct MemTorrent {
    info_hash: InfoHash,
    state: Mutex<TorrentState>,
}

impl MemTorrent {
    fn new(info_hash: InfoHash, metadata: Option<TorrentMetadata>, display_name: Option<String>) -> Self {
        Self {
            info_hash,
            state: Mutex::new(TorrentState {
                status: EngineStatus::default(),
                metadata,
                display_name,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TorrentState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!(info_hash = %self.info_hash, "torrent state mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }

    /// Set completion as a fraction in `0.0..=1.0`; reaching `1.0` marks it finished.
    pub fn set_progress(&self, fraction: f64) {
        let mut state = self.lock_state();
        state.status.progress = fraction.clamp(0.0, 1.0);
        state.status.finished = state.status.progress >= 1.0;
    }

    /// Mark every piece as downloaded.
    pub fn complete(&self) {
        self.set_progress(1.0);
    }

    /// Mark the torrent complete and uploading.
    pub fn start_seeding(&self) {
        let mut state = self.lock_state();
        state.status.progress = 1.0;
        state.status.finished = true;
        state.status.seeding = true;
    }

    /// Stop uploading without changing completion.
    pub fn stop_seeding(&self) {
        self.lock_state().status.seeding = false;
    }

    /// Update transfer counters.
    pub fn set_transfer(&self, download_rate: u64, upload_rate: u64, peers: u32, seeds: u32) {
        let mut state = self.lock_state();
        state.status.download_rate = download_rate;
        state.status.upload_rate = upload_rate;
        state.status.peers = peers;
        state.status.seeds = seeds;
    }

    /// Supply metadata for a torrent admitted by magnet.
    pub fn resolve_metadata(&self, metadata: TorrentMetadata) {
        self.lock_state().metadata = Some(metadata);
    }
}

impl EngineHandle for MemTorrent {
    fn info_hash(&self) -> InfoHash {
        self.info_hash
    }

    fn status(&self) -> EngineStatus {
        self.lock_state().status
    }

    fn pause(&self) -> Result<()> {
        self.lock_state().status.paused = true;
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        self.lock_state().status.paused = false;
        Ok(())
    }

    fn metadata(&self) -> Option<TorrentMetadata> {
        self.lock_state().metadata.clone()
    }

    fn display_name(&self) -> Option<String> {
        self.lock_state().display_name.clone()
    }
}

/// Engine that keeps every torrent in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    torrents: Mutex<HashMap<InfoHash, Arc<MemTorrent>>>,
}

impl InMemoryEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle for `info_hash`, for driving test scenarios.
    #[must_use]
    pub fn torrent(&self, info_hash: &InfoHash) -> Option<Arc<MemTorrent>> {
        self.lock_torrents().get(info_hash).cloned()
    }

    /// Number of live handles.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.lock_torrents().len()
    }

    fn admit(
        &self,
        info_hash: InfoHash,
        metadata: Option<TorrentMetadata>,
        display_name: Option<String>,
    ) -> Arc<MemTorrent> {
        let mut torrents = self.lock_torrents();
        if let Some(existing) = torrents.get(&info_hash) {
            if let Some(metadata) = metadata {
                let mut state = existing.lock_state();
                if state.metadata.is_none() {
                    state.metadata = Some(metadata);
                }
            }
            debug!(info_hash = %info_hash, "content already admitted; reusing handle");
            return Arc::clone(existing);
        }
        let torrent = Arc::new(MemTorrent::new(info_hash, metadata, display_name));
        torrents.insert(info_hash, Arc::clone(&torrent));
        debug!(info_hash = %info_hash, "torrent admitted");
        torrent
    }

    fn lock_torrents(&self) -> MutexGuard<'_, HashMap<InfoHash, Arc<MemTorrent>>> {
        match self.torrents.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("engine torrent table mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl TorrentEngine for InMemoryEngine {
    async fn add_by_metadata(&self, bytes: &[u8]) -> Result<Arc<dyn EngineHandle>> {
        let parsed = Metainfo::parse(bytes)?;
        let handle: Arc<dyn EngineHandle> =
            self.admit(parsed.info_hash, Some(parsed.metadata), None);
        Ok(handle)
    }

    async fn add_by_magnet(&self, uri: &str) -> Result<Arc<dyn EngineHandle>> {
        let magnet = Magnet::parse(uri)?;
        let handle: Arc<dyn EngineHandle> =
            self.admit(magnet.info_hash, None, magnet.display_name);
        Ok(handle)
    }

    async fn remove(&self, handle: &dyn EngineHandle) -> Result<()> {
        let info_hash = handle.info_hash();
        let removed = self.lock_torrents().remove(&info_hash);
        if removed.is_none() {
            return Err(MemEngineError::UnknownHandle {
                info_hash: info_hash.to_string(),
            }
            .into());
        }
        debug!(info_hash = %info_hash, "torrent detached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_test_support::metainfo;

    #[tokio::test]
    async fn duplicate_content_reuses_the_handle() -> Result<()> {
        let engine = InMemoryEngine::new();
        let payload = metainfo::single_file("a.bin", 10);

        let first = engine.add_by_metadata(&payload).await?;
        let second = engine.add_by_metadata(&payload).await?;
        assert_eq!(first.info_hash(), second.info_hash());
        assert_eq!(engine.live_handles(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn magnet_then_metainfo_fills_in_metadata() -> Result<()> {
        let engine = InMemoryEngine::new();
        let payload = metainfo::single_file("a.bin", 10);
        let original = engine.add_by_metadata(&payload).await?;
        let hash = original.info_hash();
        engine.remove(original.as_ref()).await?;

        let magnet = metainfo::magnet(&hash.to_string(), Some("A file"));
        let handle = engine.add_by_magnet(&magnet).await?;
        assert!(handle.metadata().is_none());
        assert_eq!(handle.display_name().as_deref(), Some("A file"));

        engine.add_by_metadata(&payload).await?;
        assert_eq!(handle.metadata().map(|meta| meta.name).as_deref(), Some("a.bin"));
        assert_eq!(engine.live_handles(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn controls_drive_status() -> Result<()> {
        let engine = InMemoryEngine::new();
        let handle = engine
            .add_by_metadata(&metainfo::single_file("a.bin", 10))
            .await?;
        let torrent = engine
            .torrent(&handle.info_hash())
            .ok_or_else(|| anyhow::anyhow!("missing"))?;

        torrent.set_progress(0.5);
        torrent.set_transfer(100, 50, 3, 1);
        let status = handle.status();
        assert!(!status.finished);
        assert_eq!((status.download_rate, status.peers), (100, 3));

        torrent.start_seeding();
        handle.pause()?;
        let status = handle.status();
        assert!(status.finished && status.seeding && status.paused);
        handle.resume()?;
        assert!(!handle.status().paused);
        Ok(())
    }

    #[tokio::test]
    async fn removing_unknown_handle_fails() -> Result<()> {
        let engine = InMemoryEngine::new();
        let handle = engine
            .add_by_metadata(&metainfo::single_file("a.bin", 10))
            .await?;
        engine.remove(handle.as_ref()).await?;
        assert_eq!(engine.live_handles(), 0);
        assert!(engine.remove(handle.as_ref()).await.is_err());
        assert!(engine.add_by_metadata(b"not bencode").await.is_err());
        assert!(engine.add_by_magnet("magnet:?dn=x").await.is_err());
        Ok(())
    }
}
