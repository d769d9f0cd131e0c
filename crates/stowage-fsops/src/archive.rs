//! On-demand ZIP generation for folders and explicit file selections.
//!
//! # Design
//! - Archives are spooled into an anonymous temporary file rather than memory; the
//!   file has no name on disk and disappears when the handle drops, so an abandoned
//!   download leaves nothing behind.
//! - Every input path is validated before the first byte is written.
//! - Files that vanish or become unreadable between discovery and read are skipped
//!   with a warning and reported back through [`BuiltArchive::skipped`].
//! - Entry names are relative and always use forward slashes.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{FsOpsError, FsOpsResult};
use crate::model::ArchiveRequest;
use crate::sandbox::PathSandbox;

/// Default deflate level; favours throughput over ratio.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// A finished archive, rewound and ready to be streamed.
#[derive(Debug)]
pub struct BuiltArchive {
    file: File,
    entries: usize,
    skipped: Vec<String>,
    size_bytes: u64,
}

impl BuiltArchive {
    /// Number of entries written.
    #[must_use]
    pub const fn entries(&self) -> usize {
        self.entries
    }

    /// Relative paths that were skipped because they could not be read.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Archive size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Take the underlying spool file, positioned at the start.
    #[must_use]
    pub fn into_file(self) -> File {
        self.file
    }
}

/// Builds ZIP archives from content under the download root.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    sandbox: Arc<PathSandbox>,
    compression_level: u8,
}

struct PlannedEntry {
    name: String,
    source: PathBuf,
}

impl ArchiveBuilder {
    /// Create a builder using the given deflate level (clamped to 0-9).
    #[must_use]
    pub fn new(sandbox: Arc<PathSandbox>, compression_level: u8) -> Self {
        Self {
            sandbox,
            compression_level: compression_level.min(9),
        }
    }

    /// Build the archive described by `request`.
    ///
    /// # Errors
    ///
    /// See [`Self::build_folder`] and [`Self::build_selection`].
    pub fn build(&self, request: &ArchiveRequest) -> FsOpsResult<BuiltArchive> {
        match request {
            ArchiveRequest::Folder { path } => self.build_folder(path),
            ArchiveRequest::Selection { paths } => self.build_selection(paths),
        }
    }

    /// Archive every regular file below `folder`, named relative to it.
    ///
    /// # Errors
    ///
    /// Returns `UnsafePath` for hostile paths and `NotFound` when `folder` is not an
    /// existing directory.
    pub fn build_folder(&self, folder: &str) -> FsOpsResult<BuiltArchive> {
        let dir = self.sandbox.resolve(folder)?;
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(FsOpsError::not_found("archive.folder", folder)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FsOpsError::not_found("archive.folder", folder));
            }
            Err(err) => return Err(FsOpsError::io("archive.folder", &dir, err)),
        }

        let mut skipped = Vec::new();
        let mut planned = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, folder = %folder, "skipping unreadable entry while archiving");
                    if let Some(name) = err.path().and_then(|path| entry_name(&dir, path)) {
                        skipped.push(name);
                    }
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry_name(&dir, entry.path()) {
                planned.push(PlannedEntry {
                    name,
                    source: entry.into_path(),
                });
            }
        }

        self.write_archive(planned, skipped)
    }

    /// Archive an explicit list of files.
    ///
    /// All paths are validated up front; one hostile path aborts the whole request.
    /// Files sharing a base name keep it for the first occurrence only; later ones are
    /// named after their flattened relative path.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `paths` is empty.
    /// - `UnsafePath` when any path fails sandbox validation.
    /// - `NotFound` when none of the paths names an existing regular file.
    pub fn build_selection(&self, paths: &[String]) -> FsOpsResult<BuiltArchive> {
        if paths.is_empty() {
            return Err(FsOpsError::InvalidInput {
                field: "files",
                reason: "empty",
                value: None,
            });
        }

        let resolved = paths
            .iter()
            .map(|path| self.sandbox.resolve(path).map(|abs| (path.as_str(), abs)))
            .collect::<FsOpsResult<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let mut skipped = Vec::new();
        let mut sources = Vec::new();
        for (requested, absolute) in resolved {
            if !seen.insert(absolute.clone()) {
                continue;
            }
            if fs::metadata(&absolute).is_ok_and(|meta| meta.is_file()) {
                sources.push(absolute);
            } else {
                debug!(path = %requested, "selected path is not an existing file");
                skipped.push(requested.replace('\\', "/"));
            }
        }
        if sources.is_empty() {
            return Err(FsOpsError::not_found("archive.selection", &paths.join(", ")));
        }

        let names = selection_names(&self.sandbox, &sources);
        let planned = names
            .into_iter()
            .zip(sources)
            .map(|(name, source)| PlannedEntry { name, source })
            .collect();
        self.write_archive(planned, skipped)
    }

    fn write_archive(
        &self,
        planned: Vec<PlannedEntry>,
        mut skipped: Vec<String>,
    ) -> FsOpsResult<BuiltArchive> {
        let spool = tempfile::tempfile()
            .map_err(|source| FsOpsError::io("archive.spool", std::env::temp_dir(), source))?;
        let mut writer = ZipWriter::new(spool);
        let base_options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i32::from(self.compression_level)));

        let mut entries = 0;
        for entry in planned {
            let mut source = match File::open(&entry.source) {
                Ok(file) => file,
                Err(err) => {
                    warn!(error = %err, entry = %entry.name, "skipping file that vanished before it could be archived");
                    skipped.push(entry.name);
                    continue;
                }
            };
            let size = source.metadata().map_or(0, |meta| meta.len());
            let options = base_options.large_file(size >= ZIP64_THRESHOLD);
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|err| FsOpsError::zip("archive.start_file", &entry.source, err))?;
            io::copy(&mut source, &mut writer)
                .map_err(|err| FsOpsError::io("archive.copy", &entry.source, err))?;
            entries += 1;
        }

        let mut file = writer
            .finish()
            .map_err(|err| FsOpsError::zip("archive.finish", self.sandbox.root(), err))?;
        let size_bytes = file
            .seek(SeekFrom::End(0))
            .map_err(|err| FsOpsError::io("archive.measure", self.sandbox.root(), err))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|err| FsOpsError::io("archive.rewind", self.sandbox.root(), err))?;

        debug!(entries, skipped = skipped.len(), size_bytes, "archive built");
        Ok(BuiltArchive {
            file,
            entries,
            skipped,
            size_bytes,
        })
    }
}

fn entry_name(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn selection_names(sandbox: &PathSandbox, sources: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let base = source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let preferred = if used.contains(&base) {
                sandbox
                    .relative(source)
                    .unwrap_or_else(|| base.clone())
                    .replace('/', "_")
            } else {
                base
            };
            let name = unique_name(preferred, &used);
            used.insert(name.clone());
            name
        })
        .collect()
}

fn unique_name(candidate: String, used: &HashSet<String>) -> String {
    if !used.contains(&candidate) {
        return candidate;
    }
    let (stem, ext) = match candidate.rfind('.') {
        Some(index) if index > 0 => candidate.split_at(index),
        _ => (candidate.as_str(), ""),
    };
    let mut counter = 1_u32;
    loop {
        let name = format!("{stem} ({counter}){ext}");
        if !used.contains(&name) {
            return name;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::Read;
    use stowage_test_support::fixtures::DownloadRoot;
    use zip::ZipArchive;

    type TestResult<T> = Result<T, Box<dyn Error>>;

    fn builder(root: &DownloadRoot) -> TestResult<ArchiveBuilder> {
        let sandbox = Arc::new(PathSandbox::new(root.path())?);
        Ok(ArchiveBuilder::new(sandbox, DEFAULT_COMPRESSION_LEVEL))
    }

    fn read_entries(archive: BuiltArchive) -> TestResult<Vec<(String, Vec<u8>)>> {
        let mut zip = ZipArchive::new(archive.into_file())?;
        let mut out = Vec::new();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            out.push((entry.name().to_string(), data));
        }
        Ok(out)
    }

    #[test]
    fn folder_archive_uses_relative_forward_slash_names() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("F/a.txt", b"alpha")?;
        root.write_file("F/sub/b.txt", b"beta")?;
        root.create_dir("F/empty")?;

        let archive = builder(&root)?.build_folder("F")?;
        assert_eq!(archive.entries(), 2);
        assert!(archive.skipped().is_empty());
        assert!(archive.size_bytes() > 0);

        let entries = read_entries(archive)?;
        assert_eq!(
            entries,
            vec![
                ("a.txt".to_string(), b"alpha".to_vec()),
                ("sub/b.txt".to_string(), b"beta".to_vec()),
            ]
        );
        Ok(())
    }

    #[test]
    fn folder_archive_requires_directory() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("file.txt", b"x")?;
        let builder = builder(&root)?;

        assert!(matches!(
            builder.build_folder("file.txt"),
            Err(FsOpsError::NotFound { .. })
        ));
        assert!(matches!(
            builder.build_folder("missing"),
            Err(FsOpsError::NotFound { .. })
        ));
        assert!(matches!(
            builder.build_folder("../.."),
            Err(FsOpsError::UnsafePath { .. })
        ));
        Ok(())
    }

    #[test]
    fn selection_renames_colliding_base_names() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("x/readme.txt", b"from x")?;
        root.write_file("y/readme.txt", b"from y")?;

        let archive = builder(&root)?.build_selection(&[
            "x/readme.txt".to_string(),
            "y/readme.txt".to_string(),
        ])?;
        let entries = read_entries(archive)?;
        assert_eq!(
            entries,
            vec![
                ("readme.txt".to_string(), b"from x".to_vec()),
                ("y_readme.txt".to_string(), b"from y".to_vec()),
            ]
        );
        Ok(())
    }

    #[test]
    fn selection_validates_every_path_before_writing() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("ok.txt", b"ok")?;
        let builder = builder(&root)?;

        let result = builder.build_selection(&["ok.txt".to_string(), "../escape.txt".to_string()]);
        assert!(matches!(result, Err(FsOpsError::UnsafePath { .. })));

        assert!(matches!(
            builder.build_selection(&[]),
            Err(FsOpsError::InvalidInput { field: "files", .. })
        ));
        assert!(matches!(
            builder.build_selection(&["nope.txt".to_string()]),
            Err(FsOpsError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn selection_skips_missing_and_duplicate_paths() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("keep.bin", &[7_u8; 64])?;

        let archive = builder(&root)?.build_selection(&[
            "keep.bin".to_string(),
            "./keep.bin".to_string(),
            "gone.bin".to_string(),
        ])?;
        assert_eq!(archive.entries(), 1);
        assert_eq!(archive.skipped(), ["gone.bin".to_string()]);
        Ok(())
    }

    #[test]
    fn unique_name_appends_counter_before_extension() {
        let mut used = HashSet::new();
        used.insert("a.txt".to_string());
        used.insert("a (1).txt".to_string());
        assert_eq!(unique_name("a.txt".to_string(), &used), "a (2).txt");
        assert_eq!(unique_name("b.txt".to_string(), &used), "b.txt");
        used.insert(".env".to_string());
        assert_eq!(unique_name(".env".to_string(), &used), ".env (1)");
    }

    #[test]
    fn root_file_colliding_with_nested_file_stays_unique() -> TestResult<()> {
        let root = DownloadRoot::new()?;
        root.write_file("nested/a.txt", b"nested")?;
        root.write_file("a.txt", b"top")?;

        let archive = builder(&root)?
            .build_selection(&["nested/a.txt".to_string(), "a.txt".to_string()])?;
        let names: Vec<_> = read_entries(archive)?.into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a.txt".to_string(), "a (1).txt".to_string()]);
        Ok(())
    }
}
