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

//! In-process torrent engine used as the default adapter and as a test double.
//! Layout: bencode.rs (decoder), metainfo.rs / magnet.rs (source parsing), engine.rs (handles).

pub mod bencode;
pub mod engine;
pub mod error;
pub mod magnet;
pub mod metainfo;

pub use engine::{InMemoryEngine, MemTorrent};
pub use error::{MemEngineError, MemEngineResult};
