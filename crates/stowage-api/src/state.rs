//! Shared application state handed to every handler.

use std::sync::Arc;

use stowage_fsops::{
    ArchiveBuilder, Inventory, PathSandbox, StorageAccountant, SystemVolumeProbe, VolumeProbe,
};
use stowage_telemetry::Metrics;
use stowage_torrent_core::TorrentRegistry;

/// Everything the API needs from the rest of the application.
pub struct ApiDependencies {
    registry: Arc<TorrentRegistry>,
    sandbox: Arc<PathSandbox>,
    metrics: Metrics,
    compression_level: u8,
    max_metainfo_bytes: usize,
    volume_probe: Arc<dyn VolumeProbe>,
}

impl ApiDependencies {
    /// Bundle the registry, sandbox, and telemetry handle with archive and upload limits.
    #[must_use]
    pub fn new(
        registry: Arc<TorrentRegistry>,
        sandbox: Arc<PathSandbox>,
        metrics: Metrics,
        compression_level: u8,
        max_metainfo_bytes: usize,
    ) -> Self {
        Self {
            registry,
            sandbox,
            metrics,
            compression_level,
            max_metainfo_bytes,
            volume_probe: Arc::new(SystemVolumeProbe),
        }
    }

    /// Replace the volume statistics source used by the storage endpoint.
    #[must_use]
    pub fn with_volume_probe(mut self, probe: Arc<dyn VolumeProbe>) -> Self {
        self.volume_probe = probe;
        self
    }
}

pub(crate) struct ApiState {
    pub(crate) registry: Arc<TorrentRegistry>,
    pub(crate) inventory: Inventory,
    pub(crate) archives: ArchiveBuilder,
    pub(crate) storage: StorageAccountant,
    pub(crate) telemetry: Metrics,
    pub(crate) max_metainfo_bytes: usize,
}

impl ApiState {
    pub(crate) fn new(deps: ApiDependencies) -> Self {
        let inventory = Inventory::new(Arc::clone(&deps.sandbox));
        let storage = StorageAccountant::with_probe(inventory.clone(), deps.volume_probe);
        let archives = ArchiveBuilder::new(deps.sandbox, deps.compression_level);
        Self {
            registry: deps.registry,
            inventory,
            archives,
            storage,
            telemetry: deps.metrics,
            max_metainfo_bytes: deps.max_metainfo_bytes,
        }
    }

    /// Refresh the tracked-torrents gauge after registry membership changes.
    pub(crate) fn record_tracked(&self) {
        self.telemetry.set_tracked_torrents(self.registry.len());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::error::Error;
    use std::io;
    use std::path::Path;
    use std::sync::Arc;

    use stowage_fsops::{PathSandbox, VolumeProbe, VolumeStats};
    use stowage_telemetry::Metrics;
    use stowage_test_support::fixtures::DownloadRoot;
    use stowage_torrent_core::TorrentRegistry;
    use stowage_torrent_mem::InMemoryEngine;

    use super::{ApiDependencies, ApiState};

    pub(crate) const TEST_METAINFO_LIMIT: usize = 64 * 1024;

    pub(crate) struct FixedProbe;

    impl VolumeProbe for FixedProbe {
        fn probe(&self, _path: &Path) -> io::Result<VolumeStats> {
            Ok(VolumeStats {
                total: 100 * 1024 * 1024 * 1024,
                free: 40 * 1024 * 1024 * 1024,
                available: 40 * 1024 * 1024 * 1024,
            })
        }
    }

    pub(crate) struct Harness {
        pub(crate) root: DownloadRoot,
        pub(crate) engine: Arc<InMemoryEngine>,
        pub(crate) metrics: Metrics,
    }

    impl Harness {
        pub(crate) fn new() -> Result<Self, Box<dyn Error>> {
            Ok(Self {
                root: DownloadRoot::new()?,
                engine: Arc::new(InMemoryEngine::new()),
                metrics: Metrics::new()?,
            })
        }

        pub(crate) fn dependencies(&self) -> Result<ApiDependencies, Box<dyn Error>> {
            let sandbox = Arc::new(PathSandbox::new(self.root.path())?);
            let registry = Arc::new(TorrentRegistry::new(
                self.engine.clone(),
                Arc::clone(&sandbox),
            ));
            Ok(ApiDependencies::new(
                registry,
                sandbox,
                self.metrics.clone(),
                1,
                TEST_METAINFO_LIMIT,
            )
            .with_volume_probe(Arc::new(FixedProbe)))
        }

        pub(crate) fn state(&self) -> Result<Arc<ApiState>, Box<dyn Error>> {
            Ok(Arc::new(ApiState::new(self.dependencies()?)))
        }
    }
}
