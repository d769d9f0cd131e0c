//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters/gauges relevant to Stowage services.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    served_bytes_total: IntCounterVec,
    archives_built_total: IntCounterVec,
    content_deletions_total: IntCounterVec,
    archive_entries_skipped_total: IntCounter,
    tracked_torrents: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of torrents currently tracked by the registry.
    pub tracked_torrents: i64,
    /// Archive entries skipped because their source vanished mid-build.
    pub archive_entries_skipped_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let served_bytes_total = counter_vec(
            "served_bytes_total",
            "Bytes sent as file or archive attachments",
            &["route"],
        )?;
        let archives_built_total = counter_vec(
            "archives_built_total",
            "ZIP archives produced by request kind",
            &["kind"],
        )?;
        let content_deletions_total = counter_vec(
            "content_deletions_total",
            "Download-area deletions by target kind",
            &["target"],
        )?;
        let archive_entries_skipped_total = IntCounter::with_opts(Opts::new(
            "archive_entries_skipped_total",
            "Archive entries skipped because the source file vanished",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "archive_entries_skipped_total",
            source,
        })?;
        let tracked_torrents = IntGauge::with_opts(Opts::new(
            "tracked_torrents",
            "Torrents currently tracked by the session registry",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "tracked_torrents",
            source,
        })?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "served_bytes_total", &served_bytes_total)?;
        register(&registry, "archives_built_total", &archives_built_total)?;
        register(&registry, "content_deletions_total", &content_deletions_total)?;
        register(
            &registry,
            "archive_entries_skipped_total",
            &archive_entries_skipped_total,
        )?;
        register(&registry, "tracked_torrents", &tracked_torrents)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                served_bytes_total,
                archives_built_total,
                content_deletions_total,
                archive_entries_skipped_total,
                tracked_torrents,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Add the declared length of an attachment served from `route`.
    pub fn add_served_bytes(&self, route: &str, bytes: u64) {
        self.inner
            .served_bytes_total
            .with_label_values(&[route])
            .inc_by(bytes);
    }

    /// Record a completed archive build and the number of entries it skipped.
    pub fn record_archive(&self, kind: &str, skipped: usize) {
        self.inner
            .archives_built_total
            .with_label_values(&[kind])
            .inc();
        self.inner
            .archive_entries_skipped_total
            .inc_by(u64::try_from(skipped).unwrap_or(u64::MAX));
    }

    /// Increment the deletion counter for a file, folder, or torrent payload.
    pub fn inc_content_deletion(&self, target: &str) {
        self.inner
            .content_deletions_total
            .with_label_values(&[target])
            .inc();
    }

    /// Set the tracked torrent gauge.
    pub fn set_tracked_torrents(&self, count: usize) {
        self.inner
            .tracked_torrents
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tracked_torrents: self.inner.tracked_torrents.get(),
            archive_entries_skipped_total: self.inner.archive_entries_skipped_total.get(),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/health", 200);
        metrics.record_archive("folder", 2);
        metrics.record_archive("selection", 0);
        metrics.inc_content_deletion("file");
        metrics.add_served_bytes("/api/download/{*path}", 512);
        metrics.add_served_bytes("/api/download/{*path}", 512);
        metrics.set_tracked_torrents(5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tracked_torrents, 5);
        assert_eq!(snapshot.archive_entries_skipped_total, 2);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("archives_built_total"));
        assert!(rendered.contains("content_deletions_total"));
        assert!(rendered.contains("served_bytes_total{route=\"/api/download/{*path}\"} 1024"));
        Ok(())
    }
}
