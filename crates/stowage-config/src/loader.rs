//! Environment-backed configuration loader.
//!
//! # Design
//! - Read every setting through a lookup closure so tests never touch process state.
//! - Fail fast on the first invalid field; absent fields fall back to `defaults.rs`.

use std::fs;

use stowage_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};
use tracing::info;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppConfig, ArchiveSettings};
use crate::validate::{
    parse_bind_addr, parse_byte_limit, parse_compression_level, parse_download_root,
    parse_log_format, parse_port, require_non_empty,
};

/// Environment variable naming the download root.
pub const ENV_DOWNLOAD_ROOT: &str = "STOWAGE_DOWNLOAD_ROOT";
/// Environment variable naming the listener interface.
pub const ENV_BIND_ADDR: &str = "STOWAGE_BIND_ADDR";
/// Environment variable naming the listener port.
pub const ENV_HTTP_PORT: &str = "STOWAGE_HTTP_PORT";
/// Environment variable naming the default log level.
pub const ENV_LOG_LEVEL: &str = "STOWAGE_LOG_LEVEL";
/// Environment variable naming the log output format.
pub const ENV_LOG_FORMAT: &str = "STOWAGE_LOG_FORMAT";
/// Environment variable naming the archive deflate level.
pub const ENV_ARCHIVE_LEVEL: &str = "STOWAGE_ARCHIVE_LEVEL";
/// Environment variable naming the metainfo upload limit.
pub const ENV_MAX_METAINFO_BYTES: &str = "STOWAGE_MAX_METAINFO_BYTES";

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when any variable holds an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when any looked-up value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let download_root = lookup(ENV_DOWNLOAD_ROOT).map_or_else(
            || Ok(defaults::DOWNLOAD_ROOT.into()),
            |value| parse_download_root(ENV_DOWNLOAD_ROOT, &value),
        )?;
        let bind_addr = parse_bind_addr(
            ENV_BIND_ADDR,
            lookup(ENV_BIND_ADDR)
                .as_deref()
                .unwrap_or(defaults::BIND_ADDR),
        )?;
        let http_port = lookup(ENV_HTTP_PORT).map_or(Ok(defaults::HTTP_PORT), |value| {
            parse_port(ENV_HTTP_PORT, &value)
        })?;
        let log_level = lookup(ENV_LOG_LEVEL).map_or_else(
            || Ok(DEFAULT_LOG_LEVEL.to_string()),
            |value| require_non_empty(ENV_LOG_LEVEL, &value),
        )?;
        let log_format = lookup(ENV_LOG_FORMAT).map_or(Ok(LogFormat::infer()), |value| {
            parse_log_format(ENV_LOG_FORMAT, &value)
        })?;
        let compression_level = lookup(ENV_ARCHIVE_LEVEL)
            .map_or(Ok(defaults::ARCHIVE_LEVEL), |value| {
                parse_compression_level(ENV_ARCHIVE_LEVEL, &value)
            })?;
        let max_metainfo_bytes = lookup(ENV_MAX_METAINFO_BYTES)
            .map_or(Ok(defaults::MAX_METAINFO_BYTES), |value| {
                parse_byte_limit(ENV_MAX_METAINFO_BYTES, &value)
            })?;

        Ok(Self {
            download_root,
            bind_addr,
            http_port,
            log_level,
            log_format,
            archive: ArchiveSettings { compression_level },
            max_metainfo_bytes,
        })
    }

    /// Create the download root when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DownloadRoot` when the directory cannot be created.
    pub fn ensure_download_root(&self) -> ConfigResult<()> {
        fs::create_dir_all(&self.download_root).map_err(|source| ConfigError::DownloadRoot {
            path: self.download_root.clone(),
            source,
        })?;
        info!(download_root = %self.download_root.display(), "download root ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() -> ConfigResult<()> {
        let config = AppConfig::from_lookup(|_| None)?;
        assert_eq!(config.download_root, std::path::PathBuf::from("./downloads"));
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.archive.compression_level, 6);
        assert_eq!(config.max_metainfo_bytes, 5 * 1024 * 1024);
        assert_eq!(config.log_level, "info");
        Ok(())
    }

    #[test]
    fn overrides_are_parsed() -> ConfigResult<()> {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_DOWNLOAD_ROOT, "/srv/downloads"),
            (ENV_BIND_ADDR, "127.0.0.1"),
            (ENV_HTTP_PORT, "9000"),
            (ENV_LOG_FORMAT, "json"),
            (ENV_ARCHIVE_LEVEL, "1"),
        ]))?;
        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.archive.compression_level, 1);
        Ok(())
    }

    #[test]
    fn invalid_field_names_the_variable() {
        let err = AppConfig::from_lookup(lookup_from(&[(ENV_HTTP_PORT, "http")]))
            .err()
            .map(|err| match err {
                ConfigError::InvalidField { field, .. } => field,
                ConfigError::DownloadRoot { .. } => "download_root",
            });
        assert_eq!(err, Some(ENV_HTTP_PORT));
    }
}
