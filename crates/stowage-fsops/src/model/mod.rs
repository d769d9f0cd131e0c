//! Descriptive projections of entries under the download root.
//!
//! # Design
//! - Every value here is recomputed per request and never persisted.
//! - Paths are relative to the root and always use forward slashes.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Folder name reported for files that sit directly under the root.
pub const ROOT_FOLDER: &str = "root";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Size in mebibytes rounded to two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn megabytes(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

/// Size in gibibytes rounded to two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gigabytes(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GB)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One regular file found while walking the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    /// Base file name.
    pub name: String,
    /// Path relative to the root.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Size in mebibytes.
    pub size_mb: f64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Lower-cased extension with leading dot.
    pub extension: String,
    /// Extension-derived MIME type.
    pub mime_type: &'static str,
    /// Parent folder relative to the root, or `root`.
    pub folder: String,
}

/// Aggregate view of one top-level folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderSummary {
    /// Folder name.
    pub name: String,
    /// Path relative to the root.
    pub path: String,
    /// Recursive count of regular files.
    pub file_count: u64,
    /// Recursive byte total.
    pub size: u64,
    /// Size in mebibytes.
    pub size_mb: f64,
    /// Size in gibibytes.
    pub size_gb: f64,
    /// Modification time of the folder node itself.
    pub modified: DateTime<Utc>,
}

/// Metadata for a single entry, as returned by the file-info operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDetails {
    /// Base name.
    pub name: String,
    /// Path as requested, normalised to forward slashes.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Size in mebibytes.
    pub size_mb: f64,
    /// Size in gibibytes.
    pub size_gb: f64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Creation time when the platform reports one.
    pub created: Option<DateTime<Utc>>,
    /// Extension-derived MIME type.
    pub mime_type: &'static str,
    /// Lower-cased extension with leading dot.
    pub extension: String,
    /// `video/*` MIME type.
    pub is_video: bool,
    /// `audio/*` MIME type.
    pub is_audio: bool,
    /// `image/*` MIME type.
    pub is_image: bool,
    /// Archive container extension.
    pub is_archive: bool,
    /// Entry is a directory.
    pub is_directory: bool,
}

/// Disk usage for the volume hosting the download root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageReport {
    /// Volume capacity in bytes.
    pub total_bytes: u64,
    /// Bytes in use on the volume.
    pub used_bytes: u64,
    /// Bytes available to unprivileged writers.
    pub free_bytes: u64,
    /// Recursive size of the download root.
    pub content_bytes: u64,
    /// Capacity in gibibytes.
    pub total_gb: f64,
    /// Used space in gibibytes.
    pub used_gb: f64,
    /// Free space in gibibytes.
    pub free_gb: f64,
    /// Content size in gibibytes.
    pub content_gb: f64,
    /// Used share of capacity, in percent.
    pub usage_percent: f64,
    /// Present when volume statistics could not be gathered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What an archive should contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveRequest {
    /// Every file below one folder.
    Folder {
        /// Folder path relative to the root.
        path: String,
    },
    /// An explicit list of files.
    Selection {
        /// File paths relative to the root.
        paths: Vec<String>,
    },
}

impl ArchiveRequest {
    /// Metric label for the request kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Folder { .. } => "folder",
            Self::Selection { .. } => "selection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_helpers_round_to_two_decimals() {
        assert!((megabytes(1_572_864) - 1.5).abs() < f64::EPSILON);
        assert!((gigabytes(0)).abs() < f64::EPSILON);
        assert!((megabytes(1) - 0.0).abs() < f64::EPSILON);
        assert!((gigabytes(5 * 1024 * 1024 * 1024) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn archive_request_kinds() {
        let folder = ArchiveRequest::Folder {
            path: "Movie".into(),
        };
        let selection = ArchiveRequest::Selection { paths: vec![] };
        assert_eq!(folder.kind(), "folder");
        assert_eq!(selection.kind(), "selection");
    }
}
