//! Disk usage reporting for the download root.
//!
//! # Design
//! - Volume statistics come from a [`VolumeProbe`] so tests can substitute fixed numbers.
//! - Reporting never fails; probe errors produce a zeroed report carrying a note.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use systemstat::{Platform, System};
use tracing::warn;

use crate::inventory::Inventory;
use crate::model::{StorageReport, gigabytes, round2};

/// Note attached to a report when volume statistics could not be read.
pub const UNAVAILABLE_NOTE: &str = "volume statistics unavailable";

/// Raw capacity figures for one volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStats {
    /// Capacity in bytes.
    pub total: u64,
    /// Free bytes, including blocks reserved for privileged users.
    pub free: u64,
    /// Bytes available to unprivileged writers.
    pub available: u64,
}

/// Source of volume statistics for a path.
pub trait VolumeProbe: Send + Sync {
    /// Statistics for the volume containing `path`.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the platform query fails.
    fn probe(&self, path: &Path) -> io::Result<VolumeStats>;
}

/// Probe backed by the host's mount table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemVolumeProbe;

impl VolumeProbe for SystemVolumeProbe {
    fn probe(&self, path: &Path) -> io::Result<VolumeStats> {
        let mounts = System::new().mounts()?;
        let mount = mounts
            .iter()
            .filter(|mount| path.starts_with(&mount.fs_mounted_on))
            .max_by_key(|mount| mount.fs_mounted_on.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no mount contains path"))?;
        Ok(VolumeStats {
            total: mount.total.as_u64(),
            free: mount.free.as_u64(),
            available: mount.avail.as_u64(),
        })
    }
}

/// Combines volume statistics with the recursive content size.
#[derive(Clone)]
pub struct StorageAccountant {
    inventory: Inventory,
    probe: Arc<dyn VolumeProbe>,
}

impl fmt::Debug for StorageAccountant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccountant")
            .field("root", &self.inventory.sandbox().root())
            .finish_non_exhaustive()
    }
}

impl StorageAccountant {
    /// Accountant using the host mount table.
    #[must_use]
    pub fn new(inventory: Inventory) -> Self {
        Self::with_probe(inventory, Arc::new(SystemVolumeProbe))
    }

    /// Accountant using a custom probe.
    #[must_use]
    pub fn with_probe(inventory: Inventory, probe: Arc<dyn VolumeProbe>) -> Self {
        Self { inventory, probe }
    }

    /// Current usage; probe failures yield a zeroed report with a note.
    #[must_use]
    pub fn usage(&self) -> StorageReport {
        let root = self.inventory.sandbox().root();
        match self.probe.probe(root) {
            Ok(stats) => build_report(stats, self.inventory.content_bytes()),
            Err(err) => {
                warn!(error = %err, root = %root.display(), "volume statistics unavailable");
                StorageReport {
                    total_bytes: 0,
                    used_bytes: 0,
                    free_bytes: 0,
                    content_bytes: 0,
                    total_gb: 0.0,
                    used_gb: 0.0,
                    free_gb: 0.0,
                    content_gb: 0.0,
                    usage_percent: 0.0,
                    error: Some(UNAVAILABLE_NOTE.to_string()),
                }
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn build_report(stats: VolumeStats, content_bytes: u64) -> StorageReport {
    let used = stats.total.saturating_sub(stats.free);
    let usage_percent = if stats.total == 0 {
        0.0
    } else {
        round2(used as f64 / stats.total as f64 * 100.0)
    };
    StorageReport {
        total_bytes: stats.total,
        used_bytes: used,
        free_bytes: stats.available,
        content_bytes,
        total_gb: gigabytes(stats.total),
        used_gb: gigabytes(used),
        free_gb: gigabytes(stats.available),
        content_gb: gigabytes(content_bytes),
        usage_percent,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::PathSandbox;
    use std::error::Error;
    use stowage_test_support::fixtures::DownloadRoot;

    type TestResult<T> = Result<T, Box<dyn Error>>;

    struct FixedProbe(io::Result<VolumeStats>);

    impl VolumeProbe for FixedProbe {
        fn probe(&self, _path: &Path) -> io::Result<VolumeStats> {
            match &self.0 {
                Ok(stats) => Ok(*stats),
                Err(err) => Err(io::Error::new(err.kind(), "probe failed")),
            }
        }
    }

    fn inventory(root: &DownloadRoot) -> TestResult<Inventory> {
        Ok(Inventory::new(Arc::new(PathSandbox::new(root.path())?)))
    }

    #[test]
    fn report_combines_volume_and_content() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("a/b.bin", &[0_u8; 100])?;
        let probe = FixedProbe(Ok(VolumeStats {
            total: 1_000,
            free: 250,
            available: 200,
        }));
        let report = StorageAccountant::with_probe(inventory(&root)?, Arc::new(probe)).usage();

        assert_eq!(report.total_bytes, 1_000);
        assert_eq!(report.used_bytes, 750);
        assert_eq!(report.free_bytes, 200);
        assert_eq!(report.content_bytes, 100);
        assert!((report.usage_percent - 75.0).abs() < f64::EPSILON);
        assert!(report.error.is_none());
        Ok(())
    }

    #[test]
    fn probe_failure_yields_zeroed_report() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("x.bin", &[0_u8; 10])?;
        let probe = FixedProbe(Err(io::Error::other("boom")));
        let report = StorageAccountant::with_probe(inventory(&root)?, Arc::new(probe)).usage();

        assert_eq!(report.total_bytes, 0);
        assert_eq!(report.content_bytes, 0);
        assert_eq!(report.error.as_deref(), Some(UNAVAILABLE_NOTE));
        Ok(())
    }

    #[test]
    fn system_probe_reports_some_volume_for_temp_dirs() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        let report = StorageAccountant::new(inventory(&root)?).usage();
        // containers without a readable mount table fall back to the zeroed report
        if report.error.is_none() {
            assert!(report.total_bytes >= report.used_bytes);
        }
        Ok(())
    }
}
