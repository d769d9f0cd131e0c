//! # Design
//!
//! - Provide structured, constant-message errors for sandboxed file access.
//! - Capture operation context (paths, fields, inputs) so failures are reproducible in tests.
//! - Keep caller-supplied paths separate from resolved absolute paths; only the former may
//!   ever be echoed back to a client.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by the sandbox, inventory, and archive builder.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// A caller-supplied path escaped, or tried to escape, the download root.
    #[error("path escapes the download root")]
    UnsafePath {
        /// Path exactly as supplied by the caller.
        path: String,
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// The requested entry does not exist under the download root.
    #[error("entry not found")]
    NotFound {
        /// Operation that looked up the entry.
        operation: &'static str,
        /// Path exactly as supplied by the caller.
        path: String,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Zip archive failures.
    #[error("fsops zip failure")]
    Zip {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Path involved in the archive failure.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsafe_path(path: &str, reason: &'static str) -> Self {
        Self::UnsafePath {
            path: path.to_string(),
            reason,
        }
    }

    pub(crate) fn not_found(operation: &'static str, path: &str) -> Self {
        Self::NotFound {
            operation,
            path: path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn messages_are_constant_and_sources_are_preserved() {
        let io_err = FsOpsError::io(
            "archive.open",
            "/srv/downloads/file.bin",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(io_err.to_string(), "fsops io failure");
        assert!(io_err.source().is_some());

        let unsafe_path = FsOpsError::unsafe_path("../etc/passwd", "parent_segment");
        assert_eq!(unsafe_path.to_string(), "path escapes the download root");
        assert!(!unsafe_path.to_string().contains("passwd"));

        let missing = FsOpsError::not_found("inventory.file_info", "missing.txt");
        assert!(matches!(
            missing,
            FsOpsError::NotFound {
                operation: "inventory.file_info",
                ..
            }
        ));
    }

    #[test]
    fn zip_errors_keep_context() {
        let err = FsOpsError::zip(
            "archive.finish",
            "bundle.zip",
            zip::result::ZipError::FileNotFound,
        );
        let FsOpsError::Zip { operation, path, .. } = err else {
            panic!("expected zip variant");
        };
        assert_eq!(operation, "archive.finish");
        assert_eq!(path, PathBuf::from("bundle.zip"));
    }
}
