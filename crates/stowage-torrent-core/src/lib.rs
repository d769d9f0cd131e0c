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

//! Engine-agnostic torrent interfaces, domain model, and the session registry.

pub mod engine;
pub mod error;
pub mod model;
pub mod registry;

pub use engine::{EngineHandle, TorrentEngine};
pub use error::{TorrentError, TorrentResult};
pub use model::{
    AddOutcome, DownloadFile, EngineFile, EngineStatus, InfoHash, LifecycleState, RemovalOutcome,
    RemoveTorrent, TorrentMetadata, TorrentRecord, TorrentSource,
};
pub use registry::TorrentRegistry;
