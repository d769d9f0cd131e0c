//! Validation helpers for individual configuration fields.

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use stowage_telemetry::LogFormat;

use crate::error::{ConfigError, ConfigResult};

/// Parse a TCP port in the range 1-65535.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value is not a non-zero `u16`.
pub fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    let port = value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidField {
        field,
        value: Some(value.to_string()),
        reason: "not_a_port",
    })?;
    if port == 0 {
        return Err(ConfigError::InvalidField {
            field,
            value: Some(value.to_string()),
            reason: "zero",
        });
    }
    Ok(port)
}

/// Parse the listener bind address.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value is not an IP address.
pub fn parse_bind_addr(field: &'static str, value: &str) -> ConfigResult<IpAddr> {
    IpAddr::from_str(value.trim()).map_err(|_| ConfigError::InvalidField {
        field,
        value: Some(value.to_string()),
        reason: "not_an_ip_address",
    })
}

/// Parse a deflate compression level.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the level is outside 0-9.
pub fn parse_compression_level(field: &'static str, value: &str) -> ConfigResult<u8> {
    match value.trim().parse::<u8>() {
        Ok(level) if level <= 9 => Ok(level),
        _ => Err(ConfigError::InvalidField {
            field,
            value: Some(value.to_string()),
            reason: "out_of_range",
        }),
    }
}

/// Parse a strictly positive byte limit.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value is zero or not numeric.
pub fn parse_byte_limit(field: &'static str, value: &str) -> ConfigResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ConfigError::InvalidField {
            field,
            value: Some(value.to_string()),
            reason: "not_positive",
        }),
    }
}

/// Parse the logging output format.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` for names other than `json` or `pretty`.
pub fn parse_log_format(field: &'static str, value: &str) -> ConfigResult<LogFormat> {
    LogFormat::parse(value).ok_or_else(|| ConfigError::InvalidField {
        field,
        value: Some(value.to_string()),
        reason: "unknown_format",
    })
}

/// Reject blank strings for fields that must carry a value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value is empty after trimming.
pub fn require_non_empty(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            value: None,
            reason: "empty",
        });
    }
    Ok(trimmed.to_string())
}

/// Parse the download root path.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value is blank.
pub fn parse_download_root(field: &'static str, value: &str) -> ConfigResult<PathBuf> {
    require_non_empty(field, value).map(PathBuf::from)
}
