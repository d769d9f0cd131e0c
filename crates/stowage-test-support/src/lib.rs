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

//! Shared test helpers used across crate test suites.
//! Layout: fixtures.rs (temporary download roots), metainfo.rs (synthetic `.torrent` payloads and magnets).

pub mod fixtures;
pub mod metainfo;
