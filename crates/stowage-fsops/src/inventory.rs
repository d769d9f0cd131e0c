//! File and folder listings under the download root.
//!
//! # Design
//! - Listings are recomputed per call; nothing is cached between requests.
//! - Walks never follow symlinks and skip unreadable entries with a warning so a
//!   single bad file cannot fail a whole listing.
//! - Single-entry lookups go through the sandbox; walks start from the canonical root.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{FsOpsError, FsOpsResult};
use crate::mime::{MediaKind, extension_of, mime_type_for};
use crate::model::{FileDetails, FileEntry, FolderSummary, ROOT_FOLDER, gigabytes, megabytes};
use crate::sandbox::PathSandbox;

/// Read-mostly view over the download root.
#[derive(Debug, Clone)]
pub struct Inventory {
    sandbox: Arc<PathSandbox>,
}

impl Inventory {
    /// Build an inventory over `sandbox`.
    #[must_use]
    pub const fn new(sandbox: Arc<PathSandbox>) -> Self {
        Self { sandbox }
    }

    /// Sandbox backing this inventory.
    #[must_use]
    pub fn sandbox(&self) -> &PathSandbox {
        &self.sandbox
    }

    /// Lazily walk every regular file below the root.
    ///
    /// Each call starts a fresh walk.
    pub fn list_files(&self) -> impl Iterator<Item = FileEntry> + '_ {
        WalkDir::new(self.sandbox.root())
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => self.file_entry(&entry),
                Err(err) => {
                    warn!(error = %err, path = ?err.path(), "skipping unreadable entry during listing");
                    None
                }
            })
    }

    /// Summaries for each top-level directory, aggregated recursively.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the root itself cannot be read.
    pub fn list_folders(&self) -> FsOpsResult<Vec<FolderSummary>> {
        let root = self.sandbox.root();
        let entries =
            fs::read_dir(root).map_err(|source| FsOpsError::io("inventory.read_root", root, source))?;

        let mut folders = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable root entry");
                    continue;
                }
            };
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
            if !is_dir {
                continue;
            }
            let path = entry.path();
            let modified = match entry.metadata().and_then(|meta| meta.modified()) {
                Ok(modified) => to_utc(modified),
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "skipping folder without metadata");
                    continue;
                }
            };
            let (file_count, size) = aggregate(&path);
            let name = entry.file_name().to_string_lossy().into_owned();
            folders.push(FolderSummary {
                path: name.clone(),
                name,
                file_count,
                size,
                size_mb: megabytes(size),
                size_gb: gigabytes(size),
                modified,
            });
        }
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    /// Recursive byte total of every regular file under the root.
    #[must_use]
    pub fn content_bytes(&self) -> u64 {
        aggregate(self.sandbox.root()).1
    }

    /// Metadata for one file or directory.
    ///
    /// # Errors
    ///
    /// Returns `UnsafePath` for hostile paths and `NotFound` when nothing exists there.
    pub fn file_info(&self, user_path: &str) -> FsOpsResult<FileDetails> {
        let resolved = self.sandbox.resolve(user_path)?;
        let metadata = lookup_metadata("inventory.file_info", user_path, &resolved)?;
        let kind = MediaKind::classify(&resolved);
        let size = metadata.len();
        Ok(FileDetails {
            name: base_name(&resolved),
            path: user_path.replace('\\', "/"),
            size,
            size_mb: megabytes(size),
            size_gb: gigabytes(size),
            modified: modified_time(&metadata),
            created: metadata.created().ok().map(to_utc),
            mime_type: mime_type_for(&resolved),
            extension: extension_of(&resolved),
            is_video: kind.video,
            is_audio: kind.audio,
            is_image: kind.image,
            is_archive: kind.archive,
            is_directory: metadata.is_dir(),
        })
    }

    /// Resolve a regular file for download, returning its absolute path and size.
    ///
    /// # Errors
    ///
    /// Returns `UnsafePath`, `NotFound`, or `InvalidInput` when the target is not a file.
    pub fn locate_file(&self, user_path: &str) -> FsOpsResult<(PathBuf, u64)> {
        let resolved = self.sandbox.resolve(user_path)?;
        let metadata = lookup_metadata("inventory.locate_file", user_path, &resolved)?;
        if !metadata.is_file() {
            return Err(FsOpsError::InvalidInput {
                field: "path",
                reason: "not_a_file",
                value: Some(user_path.to_string()),
            });
        }
        Ok((resolved, metadata.len()))
    }

    /// Delete one regular file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the target is a directory.
    pub fn delete_file(&self, user_path: &str) -> FsOpsResult<()> {
        let (resolved, _) = self.locate_file(user_path)?;
        fs::remove_file(&resolved)
            .map_err(|source| FsOpsError::io("inventory.delete_file", &resolved, source))?;
        info!(path = %user_path, "deleted file");
        Ok(())
    }

    /// Recursively delete one folder; the root itself is never removable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the target is not a directory or is the root.
    pub fn delete_folder(&self, user_path: &str) -> FsOpsResult<()> {
        let resolved = self.sandbox.resolve(user_path)?;
        if self.sandbox.is_root(&resolved) {
            return Err(FsOpsError::InvalidInput {
                field: "path",
                reason: "root_folder",
                value: Some(user_path.to_string()),
            });
        }
        let metadata = lookup_metadata("inventory.delete_folder", user_path, &resolved)?;
        if !metadata.is_dir() {
            return Err(FsOpsError::InvalidInput {
                field: "path",
                reason: "not_a_folder",
                value: Some(user_path.to_string()),
            });
        }
        fs::remove_dir_all(&resolved)
            .map_err(|source| FsOpsError::io("inventory.delete_folder", &resolved, source))?;
        info!(path = %user_path, "deleted folder");
        Ok(())
    }

    fn file_entry(&self, entry: &DirEntry) -> Option<FileEntry> {
        if !entry.file_type().is_file() {
            return None;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(error = %err, path = %entry.path().display(), "skipping file that vanished during listing");
                return None;
            }
        };
        let path = self.sandbox.relative(entry.path())?;
        let folder = entry
            .path()
            .parent()
            .and_then(|parent| self.sandbox.relative(parent))
            .filter(|folder| !folder.is_empty())
            .unwrap_or_else(|| ROOT_FOLDER.to_string());
        let size = metadata.len();
        Some(FileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size,
            size_mb: megabytes(size),
            modified: modified_time(&metadata),
            extension: extension_of(entry.path()),
            mime_type: mime_type_for(entry.path()),
            folder,
        })
    }
}

/// Recursive `(file_count, byte_total)` for regular files below `dir`.
pub(crate) fn aggregate(dir: &Path) -> (u64, u64) {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| {
            entry
                .map_err(|err| warn!(error = %err, "skipping unreadable entry during aggregation"))
                .ok()
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold((0, 0), |(count, bytes), meta| (count + 1, bytes + meta.len()))
}

fn lookup_metadata(operation: &'static str, user_path: &str, resolved: &Path) -> FsOpsResult<Metadata> {
    fs::metadata(resolved).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            FsOpsError::not_found(operation, user_path)
        } else {
            FsOpsError::io(operation, resolved, source)
        }
    })
}

fn modified_time(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map_or_else(|_| DateTime::<Utc>::UNIX_EPOCH, to_utc)
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use stowage_test_support::fixtures::DownloadRoot;

    type TestResult<T> = Result<T, Box<dyn Error>>;

    fn inventory(root: &DownloadRoot) -> TestResult<Inventory> {
        Ok(Inventory::new(Arc::new(PathSandbox::new(root.path())?)))
    }

    #[test]
    fn list_files_reports_relative_paths_and_folders() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("top.txt", b"hello")?;
        root.write_file("Show/S01/e01.mkv", &[0_u8; 32])?;

        let inventory = inventory(&root)?;
        let mut files: Vec<_> = inventory.list_files().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "Show/S01/e01.mkv");
        assert_eq!(files[0].folder, "Show/S01");
        assert_eq!(files[0].mime_type, "video/x-matroska");
        assert_eq!(files[0].size, 32);
        assert_eq!(files[1].path, "top.txt");
        assert_eq!(files[1].folder, ROOT_FOLDER);
        assert_eq!(files[1].extension, ".txt");

        // restartable
        assert_eq!(inventory.list_files().count(), 2);
        Ok(())
    }

    #[test]
    fn list_folders_aggregates_top_level_only() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("Album/01.flac", &[1_u8; 10])?;
        root.write_file("Album/disc2/02.flac", &[1_u8; 20])?;
        root.write_file("loose.bin", &[1_u8; 5])?;

        let inventory = inventory(&root)?;
        let folders = inventory.list_folders()?;
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "Album");
        assert_eq!(folders[0].file_count, 2);
        assert_eq!(folders[0].size, 30);
        assert_eq!(inventory.content_bytes(), 35);
        Ok(())
    }

    #[test]
    fn file_info_describes_files_and_directories() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("Pics/cat.PNG", &[0_u8; 4])?;
        let inventory = inventory(&root)?;

        let file = inventory.file_info("Pics/cat.PNG")?;
        assert_eq!(file.name, "cat.PNG");
        assert_eq!(file.extension, ".png");
        assert!(file.is_image && !file.is_directory);

        let dir = inventory.file_info("Pics")?;
        assert!(dir.is_directory);

        assert!(matches!(
            inventory.file_info("Pics/missing.png"),
            Err(FsOpsError::NotFound { .. })
        ));
        assert!(matches!(
            inventory.file_info("../outside"),
            Err(FsOpsError::UnsafePath { .. })
        ));
        Ok(())
    }

    #[test]
    fn delete_file_refuses_directories() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("dir/file.txt", b"x")?;
        let inventory = inventory(&root)?;

        assert!(matches!(
            inventory.delete_file("dir"),
            Err(FsOpsError::InvalidInput {
                reason: "not_a_file",
                ..
            })
        ));
        inventory.delete_file("dir/file.txt")?;
        assert!(!root.path().join("dir/file.txt").exists());
        assert!(matches!(
            inventory.delete_file("dir/file.txt"),
            Err(FsOpsError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn delete_folder_refuses_files_and_root() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("dir/nested/file.txt", b"x")?;
        root.write_file("plain.txt", b"x")?;
        let inventory = inventory(&root)?;

        assert!(matches!(
            inventory.delete_folder("plain.txt"),
            Err(FsOpsError::InvalidInput {
                reason: "not_a_folder",
                ..
            })
        ));
        assert!(inventory.delete_folder(".").is_err());
        inventory.delete_folder("dir")?;
        assert!(!root.path().join("dir").exists());
        assert!(root.path().exists());
        Ok(())
    }
}
