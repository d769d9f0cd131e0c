//! Error types for telemetry operations.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures while wiring logging or exporting metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed, or installation failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A collector could not be built from its options.
    #[error("failed to build metrics collector")]
    MetricsCollector {
        /// Metric family name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// A collector name clashed inside the registry.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Metric family name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The `/metrics` exposition could not be produced.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The text exposition contained invalid UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Underlying UTF-8 conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn registering_a_duplicate_family_reports_the_name() {
        let registry = prometheus::Registry::new();
        let counter = || prometheus::IntCounter::new("served_bytes_total", "bytes");
        let register = |registry: &prometheus::Registry| -> Result<()> {
            let collector = counter().map_err(|source| TelemetryError::MetricsCollector {
                name: "served_bytes_total",
                source,
            })?;
            registry
                .register(Box::new(collector))
                .map_err(|source| TelemetryError::MetricsRegister {
                    name: "served_bytes_total",
                    source,
                })
        };

        assert!(register(&registry).is_ok());
        let Err(err) = register(&registry) else {
            panic!("duplicate registration should fail");
        };
        assert!(matches!(
            err,
            TelemetryError::MetricsRegister {
                name: "served_bytes_total",
                ..
            }
        ));
        assert_eq!(err.to_string(), "failed to register metrics collector");
        assert!(err.source().is_some());
    }
}
