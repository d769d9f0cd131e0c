//! Confinement of caller-supplied paths to the download root.
//!
//! # Design
//! - Two phases, both mandatory: a syntactic pass that rejects parent segments and
//!   absolute prefixes before touching the filesystem, then a canonical pass that
//!   resolves symlinks and checks containment against the canonical root.
//! - Paths that do not exist yet are resolved through their deepest existing ancestor,
//!   so a dangling symlink parent cannot smuggle a target outside the root.
//! - Forward slashes and backslashes are both treated as separators.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{FsOpsError, FsOpsResult};

/// Validated view over the download root.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: PathBuf,
}

impl PathSandbox {
    /// Prepare a sandbox rooted at `root`, creating the directory when absent.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the root cannot be created or canonicalised.
    pub fn new(root: impl AsRef<Path>) -> FsOpsResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|source| FsOpsError::io("sandbox.create_root", root, source))?;
        let root = fs::canonicalize(root)
            .map_err(|source| FsOpsError::io("sandbox.canonicalize_root", root, source))?;
        Ok(Self { root })
    }

    /// Canonical download root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied relative path to an absolute path inside the root.
    ///
    /// The returned path is canonical for the portion that exists on disk.
    ///
    /// # Errors
    ///
    /// - `FsOpsError::InvalidInput` when the path is empty.
    /// - `FsOpsError::UnsafePath` when either containment check fails.
    pub fn resolve(&self, user_path: &str) -> FsOpsResult<PathBuf> {
        let segments = syntactic_segments(user_path)?;
        if segments.is_empty() {
            return Err(FsOpsError::InvalidInput {
                field: "path",
                reason: "empty",
                value: Some(user_path.to_string()),
            });
        }

        let mut candidate = self.root.clone();
        candidate.extend(&segments);

        let resolved = canonicalize_existing_prefix(&candidate)
            .map_err(|source| FsOpsError::io("sandbox.canonicalize", &candidate, source))?;
        if !resolved.starts_with(&self.root) {
            return Err(FsOpsError::unsafe_path(user_path, "outside_root"));
        }
        Ok(resolved)
    }

    /// Forward-slash path of `absolute` relative to the root, if it lies inside it.
    #[must_use]
    pub fn relative(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(parts.join("/"))
    }

    /// Whether `absolute` is the sandbox root itself.
    #[must_use]
    pub fn is_root(&self, absolute: &Path) -> bool {
        absolute == self.root
    }
}

fn syntactic_segments(user_path: &str) -> FsOpsResult<Vec<&str>> {
    if user_path.contains('\0') {
        return Err(FsOpsError::unsafe_path(user_path, "nul_byte"));
    }
    if user_path.starts_with('/') || user_path.starts_with('\\') {
        return Err(FsOpsError::unsafe_path(user_path, "absolute_path"));
    }

    let mut segments = Vec::new();
    for (index, segment) in user_path.split(['/', '\\']).enumerate() {
        match segment {
            "" | "." => {}
            ".." => return Err(FsOpsError::unsafe_path(user_path, "parent_segment")),
            _ if index == 0 && is_drive_prefix(segment) => {
                return Err(FsOpsError::unsafe_path(user_path, "absolute_path"));
            }
            _ => segments.push(segment),
        }
    }
    Ok(segments)
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail = Vec::new();
    loop {
        match fs::canonicalize(&existing) {
            Ok(mut resolved) => {
                resolved.extend(tail.iter().rev());
                return Ok(resolved);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let Some(name) = existing.file_name().map(ToOwned::to_owned) else {
                    return Err(err);
                };
                tail.push(name);
                if !existing.pop() {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}
