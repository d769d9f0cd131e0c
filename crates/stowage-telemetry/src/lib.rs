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

//! Telemetry primitives shared across the Stowage workspace.
//!
//! This crate centralises logging, metrics, and request-context helpers so the
//! application and HTTP surfaces share one observability story.

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;

pub use context::{
    AppSpan, RequestContext, propagate_request_id_layer, set_request_id_layer,
};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
