#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Sandboxed access to the download root: path confinement, listings, archives,
//! and storage accounting.

pub mod archive;
pub mod error;
pub mod inventory;
pub mod mime;
pub mod model;
pub mod sandbox;
pub mod storage;

pub use archive::{ArchiveBuilder, BuiltArchive, DEFAULT_COMPRESSION_LEVEL};
pub use error::{FsOpsError, FsOpsResult};
pub use inventory::Inventory;
pub use model::{ArchiveRequest, FileDetails, FileEntry, FolderSummary, StorageReport};
pub use sandbox::PathSandbox;
pub use storage::{StorageAccountant, SystemVolumeProbe, VolumeProbe, VolumeStats};
