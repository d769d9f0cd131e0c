//! Torrent Session Registry: stable identity and derived state over engine handles.
//!
//! # Design
//! - One map from torrent id to engine handle behind a single mutex. The lock is only
//!   held for map reads and writes, never across engine calls, awaits, or file I/O.
//! - While the engine detaches a handle its slot stays in the map as `Detaching`.
//!   Queries treat it as gone; an add of the same content waits for the detach to
//!   settle and then re-admits, so every tracked id always names a live engine handle.
//! - Records are rebuilt from a fresh engine poll on every query.
//! - Content deletion resolves every target through the [`PathSandbox`]; failures are
//!   logged and swallowed once the engine has detached the handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use stowage_fsops::PathSandbox;
use stowage_fsops::model::{gigabytes, megabytes};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::{EngineHandle, TorrentEngine};
use crate::error::{TorrentError, TorrentResult};
use crate::model::{
    AddOutcome, DownloadFile, EngineStatus, LifecycleState, RemovalOutcome, RemoveTorrent,
    TorrentMetadata, TorrentRecord, TorrentSource, display_name,
};

#[derive(Clone)]
struct RegistryEntry {
    handle: Arc<dyn EngineHandle>,
    added_at: DateTime<Utc>,
}

enum Slot {
    Tracked(RegistryEntry),
    /// The engine is detaching the handle; the receiver closes once the slot settles.
    Detaching(watch::Receiver<()>),
}

impl Slot {
    const fn tracked(&self) -> Option<&RegistryEntry> {
        match self {
            Self::Tracked(entry) => Some(entry),
            Self::Detaching(_) => None,
        }
    }
}

enum Claim {
    Created(RegistryEntry),
    Existing(RegistryEntry),
    Wait(watch::Receiver<()>),
}

type Slots = HashMap<Uuid, Slot>;

/// Registry of tracked torrents, shared by every request handler.
pub struct TorrentRegistry {
    engine: Arc<dyn TorrentEngine>,
    sandbox: Arc<PathSandbox>,
    entries: Mutex<Slots>,
}

impl fmt::Debug for TorrentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TorrentRegistry")
            .field("tracked", &self.len())
            .finish_non_exhaustive()
    }
}

impl TorrentRegistry {
    /// Build an empty registry over `engine`, deleting content only inside `sandbox`.
    #[must_use]
    pub fn new(engine: Arc<dyn TorrentEngine>, sandbox: Arc<PathSandbox>) -> Self {
        Self {
            engine,
            sandbox,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of tracked torrents, excluding ones mid-removal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_entries()
            .values()
            .filter(|slot| slot.tracked().is_some())
            .count()
    }

    /// Whether no torrents are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand a source to the engine and track the resulting handle.
    ///
    /// Re-adding content that is already tracked returns the existing record. Adding
    /// content that is being removed waits for the removal and then admits it afresh.
    ///
    /// # Errors
    ///
    /// - `TorrentError::InvalidInput` when the source is malformed.
    /// - `TorrentError::EngineRejected` when the engine refuses it.
    pub async fn add(&self, source: TorrentSource) -> TorrentResult<AddOutcome> {
        source.validate()?;
        loop {
            let added = match &source {
                TorrentSource::Magnet { uri } => self.engine.add_by_magnet(uri.trim()).await,
                TorrentSource::Metainfo { bytes } => self.engine.add_by_metadata(bytes).await,
            };
            let handle = added.map_err(|err| {
                warn!(error = %err, "engine rejected torrent");
                TorrentError::EngineRejected { source: err.into() }
            })?;

            let info_hash = handle.info_hash();
            let id = info_hash.torrent_id();
            let claim = {
                let mut entries = self.lock_entries();
                match entries.get(&id) {
                    Some(Slot::Tracked(existing)) => Claim::Existing(existing.clone()),
                    Some(Slot::Detaching(settled)) => Claim::Wait(settled.clone()),
                    None => {
                        let entry = RegistryEntry {
                            handle,
                            added_at: Utc::now(),
                        };
                        entries.insert(id, Slot::Tracked(entry.clone()));
                        Claim::Created(entry)
                    }
                }
            };

            let (record, created) = match claim {
                Claim::Created(entry) => {
                    info!(torrent_id = %id, info_hash = %info_hash, "torrent added");
                    (pending_record(id, &entry), true)
                }
                Claim::Existing(entry) => {
                    info!(torrent_id = %id, info_hash = %info_hash, "torrent already tracked");
                    (self.snapshot(id, &entry).await, false)
                }
                Claim::Wait(mut settled) => {
                    debug!(torrent_id = %id, "waiting for pending removal before re-adding");
                    // Only closes; an error here means the removal has settled.
                    let _ = settled.changed().await;
                    continue;
                }
            };
            return Ok(AddOutcome {
                id,
                record,
                created,
            });
        }
    }

    /// Current record for one torrent.
    ///
    /// # Errors
    ///
    /// Returns `TorrentError::NotFound` when `id` is not tracked.
    pub async fn status(&self, id: Uuid) -> TorrentResult<TorrentRecord> {
        let entry = self.entry(id)?;
        Ok(self.snapshot(id, &entry).await)
    }

    /// Current records for every tracked torrent, oldest first.
    pub async fn list(&self) -> Vec<TorrentRecord> {
        let mut entries: Vec<_> = {
            let guard = self.lock_entries();
            guard
                .iter()
                .filter_map(|(id, slot)| slot.tracked().map(|entry| (*id, entry.clone())))
                .collect()
        };
        entries.sort_by(|a, b| a.1.added_at.cmp(&b.1.added_at).then(a.0.cmp(&b.0)));

        let mut records = Vec::with_capacity(entries.len());
        for (id, entry) in &entries {
            records.push(self.snapshot(*id, entry).await);
        }
        records
    }

    /// Pause a tracked torrent.
    ///
    /// # Errors
    ///
    /// Returns `TorrentError::NotFound` for unknown ids and `Internal` when the engine fails.
    pub fn pause(&self, id: Uuid) -> TorrentResult<()> {
        let entry = self.entry(id)?;
        entry
            .handle
            .pause()
            .map_err(|err| TorrentError::internal("pause", id, err))?;
        info!(torrent_id = %id, "torrent paused");
        Ok(())
    }

    /// Resume a tracked torrent.
    ///
    /// # Errors
    ///
    /// Returns `TorrentError::NotFound` for unknown ids and `Internal` when the engine fails.
    pub fn resume(&self, id: Uuid) -> TorrentResult<()> {
        let entry = self.entry(id)?;
        entry
            .handle
            .resume()
            .map_err(|err| TorrentError::internal("resume", id, err))?;
        info!(torrent_id = %id, "torrent resumed");
        Ok(())
    }

    /// Detach a torrent from the engine and forget it, optionally deleting its content.
    ///
    /// # Errors
    ///
    /// Returns `TorrentError::NotFound` for unknown ids (including torrents another
    /// caller is already removing) and `Internal` when the engine refuses to detach; in
    /// the latter case the torrent stays tracked.
    pub async fn remove(&self, id: Uuid, options: RemoveTorrent) -> TorrentResult<RemovalOutcome> {
        let (mut detach, entry) = self.begin_detach(id)?;
        let metadata = entry.handle.metadata();

        if let Err(err) = self.engine.remove(entry.handle.as_ref()).await {
            error!(torrent_id = %id, error = %err, "engine failed to detach torrent");
            drop(detach);
            return Err(TorrentError::internal("remove", id, err));
        }
        detach.mark_detached();

        let content_deleted = match (options.delete_content, metadata) {
            (true, Some(metadata)) => self.delete_content(id, &metadata).await,
            (true, None) => {
                warn!(torrent_id = %id, "no metadata available; content left in place");
                false
            }
            (false, _) => false,
        };
        drop(detach);
        info!(torrent_id = %id, content_deleted, "torrent removed");
        Ok(RemovalOutcome {
            id,
            content_deleted,
        })
    }

    fn entry(&self, id: Uuid) -> TorrentResult<RegistryEntry> {
        self.lock_entries()
            .get(&id)
            .and_then(Slot::tracked)
            .cloned()
            .ok_or(TorrentError::NotFound { torrent_id: id })
    }

    /// Swap a tracked slot for a `Detaching` marker until the returned guard settles it.
    fn begin_detach(&self, id: Uuid) -> TorrentResult<(Detach<'_>, RegistryEntry)> {
        let (settled, waiters) = watch::channel(());
        let entry = {
            let mut entries = self.lock_entries();
            let Some(Slot::Tracked(entry)) = entries.get(&id) else {
                return Err(TorrentError::NotFound { torrent_id: id });
            };
            let entry = entry.clone();
            entries.insert(id, Slot::Detaching(waiters));
            entry
        };
        let detach = Detach {
            registry: self,
            id,
            restore: Some(entry.clone()),
            _settled: settled,
        };
        Ok((detach, entry))
    }

    async fn snapshot(&self, id: Uuid, entry: &RegistryEntry) -> TorrentRecord {
        let status = entry.handle.status();
        let metadata = entry.handle.metadata();
        let finished = status.finished || status.seeding;
        let download_files = match &metadata {
            Some(metadata) if finished => self.files_on_disk(metadata).await,
            _ => Vec::new(),
        };
        build_record(id, entry, &status, metadata.as_ref(), download_files)
    }

    async fn files_on_disk(&self, metadata: &TorrentMetadata) -> Vec<DownloadFile> {
        let mut present = Vec::new();
        for file in &metadata.files {
            let Ok(resolved) = self.sandbox.resolve(&file.path) else {
                warn!(path = %file.path, "engine reported a path outside the download root");
                continue;
            };
            let exists = tokio::fs::metadata(&resolved)
                .await
                .is_ok_and(|meta| meta.is_file());
            if exists {
                let name = file.path.rsplit('/').next().unwrap_or(&file.path).to_string();
                present.push(DownloadFile {
                    name,
                    path: file.path.clone(),
                    size: file.size,
                });
            }
        }
        present
    }

    async fn delete_content(&self, id: Uuid, metadata: &TorrentMetadata) -> bool {
        let (target, is_file) = if metadata.is_single_file() {
            match metadata.files.first() {
                Some(file) => (file.path.as_str(), true),
                None => return false,
            }
        } else {
            (metadata.name.as_str(), false)
        };

        let resolved = match self.sandbox.resolve(target) {
            Ok(resolved) if !self.sandbox.is_root(&resolved) => resolved,
            Ok(_) => {
                warn!(torrent_id = %id, "refusing to delete the download root");
                return false;
            }
            Err(err) => {
                warn!(torrent_id = %id, path = %target, error = %err, "content path rejected by sandbox");
                return false;
            }
        };

        let outcome = if is_file {
            tokio::fs::remove_file(&resolved).await
        } else {
            tokio::fs::remove_dir_all(&resolved).await
        };
        match outcome {
            Ok(()) => {
                info!(torrent_id = %id, path = %target, "torrent content deleted");
                true
            }
            Err(err) => {
                warn!(torrent_id = %id, path = %target, error = %err, "failed to delete torrent content");
                false
            }
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, Slots> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("torrent registry mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

/// In-flight removal of one torrent.
///
/// On drop the slot settles: it is cleared once the engine has detached the handle,
/// otherwise the tracked entry is restored. That covers a refused detach as well as a
/// caller that stops polling mid-removal. Waiters are released afterwards, when the
/// sender field drops.
struct Detach<'a> {
    registry: &'a TorrentRegistry,
    id: Uuid,
    restore: Option<RegistryEntry>,
    _settled: watch::Sender<()>,
}

impl Detach<'_> {
    fn mark_detached(&mut self) {
        self.restore = None;
    }
}

impl Drop for Detach<'_> {
    fn drop(&mut self) {
        let mut entries = self.registry.lock_entries();
        match self.restore.take() {
            Some(entry) => {
                entries.insert(self.id, Slot::Tracked(entry));
            }
            None => {
                entries.remove(&self.id);
            }
        }
    }
}

fn pending_record(id: Uuid, entry: &RegistryEntry) -> TorrentRecord {
    let metadata = entry.handle.metadata();
    let pending = EngineStatus::default();
    build_record(id, entry, &pending, metadata.as_ref(), Vec::new())
}

fn build_record(
    id: Uuid,
    entry: &RegistryEntry,
    status: &EngineStatus,
    metadata: Option<&TorrentMetadata>,
    download_files: Vec<DownloadFile>,
) -> TorrentRecord {
    let size = metadata.map_or(0, TorrentMetadata::total_size);
    TorrentRecord {
        id,
        info_hash: entry.handle.info_hash().to_string(),
        name: display_name(id, metadata, entry.handle.display_name().as_deref()),
        size,
        size_mb: megabytes(size),
        size_gb: gigabytes(size),
        progress: ((status.progress.clamp(0.0, 1.0) * 100.0) * 100.0).round() / 100.0,
        download_rate: status.download_rate,
        upload_rate: status.upload_rate,
        status: LifecycleState::derive(status),
        peers: status.peers,
        seeds: status.seeds,
        added_at: entry.added_at,
        download_files,
    }
}
