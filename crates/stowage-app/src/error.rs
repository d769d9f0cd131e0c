//! # Design
//!
//! - Centralize application-level errors for bootstrap.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: stowage_config::ConfigError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: stowage_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: stowage_telemetry::TelemetryError,
    },
    /// Preparing the download sandbox failed.
    #[error("download sandbox unavailable")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: stowage_fsops::FsOpsError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: stowage_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: stowage_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: stowage_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn fsops(operation: &'static str, source: stowage_fsops::FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "config.load",
            stowage_config::ConfigError::InvalidField {
                field: "STOWAGE_HTTP_PORT",
                value: Some("0".to_string()),
                reason: "out_of_range",
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let api = AppError::api_server(
            "api.serve",
            stowage_api::ApiServerError::Serve {
                source: io::Error::other("closed"),
            },
        );
        assert!(matches!(api, AppError::ApiServer { .. }));

        let fsops = AppError::fsops(
            "sandbox.new",
            stowage_fsops::FsOpsError::Io {
                operation: "sandbox.canonicalize",
                path: PathBuf::from("/missing"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(fsops.to_string(), "download sandbox unavailable");
    }
}
