//! Torrent domain types shared by the registry, engines, and the HTTP layer.
//!
//! # Design
//! - Identifiers derive from info hashes so identical content always maps to the same id.
//! - Lifecycle state is a pure function of one engine status poll; nothing here caches it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TorrentError, TorrentResult};

/// Namespace for name-based torrent identifiers.
const TORRENT_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x5b, 0x0e, 0x4c, 0x41, 0x92, 0x1d, 0x4f, 0x3a, 0x8e, 0x57, 0x0c, 0x6d, 0x2f, 0x9b, 0x31, 0xa4,
]);

const MAGNET_PREFIX: &str = "magnet:?";
const BTIH_MARKER: &str = "xt=urn:btih:";

/// 20-byte v1 info hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Wrap raw hash bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse a 40-character hex string.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 40 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0_u8; 20];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// Raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Stable torrent identifier for this hash.
    #[must_use]
    pub fn torrent_id(&self) -> Uuid {
        Uuid::new_v5(&TORRENT_ID_NAMESPACE, &self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Source payload used when admitting a torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    /// Magnet URI carrying a `btih` info hash.
    Magnet {
        /// Magnet URI to resolve and add.
        uri: String,
    },
    /// Raw `.torrent` metainfo bytes.
    Metainfo {
        /// Bencoded metainfo payload.
        bytes: Vec<u8>,
    },
}

impl TorrentSource {
    #[must_use]
    /// Convenience constructor for magnet-based sources.
    pub fn magnet(uri: impl Into<String>) -> Self {
        Self::Magnet { uri: uri.into() }
    }

    #[must_use]
    /// Convenience constructor for metainfo-based sources.
    pub fn metainfo(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Metainfo {
            bytes: bytes.into(),
        }
    }

    /// Cheap shape checks performed before the engine sees the payload.
    ///
    /// # Errors
    ///
    /// Returns `TorrentError::InvalidInput` for empty payloads, non-magnet URIs, and
    /// metainfo that is not a bencoded dictionary.
    pub fn validate(&self) -> TorrentResult<()> {
        match self {
            Self::Magnet { uri } => {
                let uri = uri.trim();
                if uri.is_empty() {
                    return Err(TorrentError::InvalidInput {
                        field: "magnet_link",
                        reason: "empty",
                    });
                }
                if !uri.starts_with(MAGNET_PREFIX) || !uri.contains(BTIH_MARKER) {
                    return Err(TorrentError::InvalidInput {
                        field: "magnet_link",
                        reason: "not_a_btih_magnet",
                    });
                }
            }
            Self::Metainfo { bytes } => {
                if bytes.is_empty() {
                    return Err(TorrentError::InvalidInput {
                        field: "torrent_file",
                        reason: "empty",
                    });
                }
                if bytes.first() != Some(&b'd') {
                    return Err(TorrentError::InvalidInput {
                        field: "torrent_file",
                        reason: "not_a_dictionary",
                    });
                }
            }
        }
        Ok(())
    }
}

/// Raw, engine-reported status for one handle at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStatus {
    /// User-initiated pause flag.
    pub paused: bool,
    /// Engine is re-uploading completed content.
    pub seeding: bool,
    /// Every wanted piece is on disk.
    pub finished: bool,
    /// Completion fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Download rate in bytes per second.
    pub download_rate: u64,
    /// Upload rate in bytes per second.
    pub upload_rate: u64,
    /// Connected peers.
    pub peers: u32,
    /// Connected seeds.
    pub seeds: u32,
}

/// One entry in the engine's file table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineFile {
    /// Forward-slash path relative to the download root.
    pub path: String,
    /// Length in bytes.
    pub size: u64,
}

/// Metadata reported once the engine knows what the torrent contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentMetadata {
    /// Torrent name; the output folder for multi-file torrents.
    pub name: String,
    /// File table in engine order.
    pub files: Vec<EngineFile>,
}

impl TorrentMetadata {
    /// Sum of all file lengths.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files
            .iter()
            .fold(0_u64, |total, file| total.saturating_add(file.size))
    }

    /// Single-file layout: one file stored directly under the root.
    #[must_use]
    pub fn is_single_file(&self) -> bool {
        matches!(self.files.as_slice(), [only] if !only.path.contains('/'))
    }
}

/// Externally visible lifecycle state, derived on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Still fetching content.
    Downloading,
    /// Complete and uploading to peers.
    Seeding,
    /// Complete and idle.
    Completed,
    /// Paused by the user.
    Paused,
}

impl LifecycleState {
    /// Derive the state from one status poll. Pause always dominates.
    #[must_use]
    pub const fn derive(status: &EngineStatus) -> Self {
        if status.paused {
            Self::Paused
        } else if status.seeding {
            Self::Seeding
        } else if status.finished {
            Self::Completed
        } else {
            Self::Downloading
        }
    }
}

/// A file of a finished torrent that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadFile {
    /// Base file name.
    pub name: String,
    /// Path relative to the download root.
    pub path: String,
    /// Length in bytes from the engine's file table.
    pub size: u64,
}

/// Externally visible view of one tracked torrent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorrentRecord {
    /// Stable identifier derived from the info hash.
    pub id: Uuid,
    /// Hex info hash.
    pub info_hash: String,
    /// Torrent name, or a placeholder until metadata arrives.
    pub name: String,
    /// Total size in bytes; zero until metadata arrives.
    pub size: u64,
    /// Total size in mebibytes.
    pub size_mb: f64,
    /// Total size in gibibytes.
    pub size_gb: f64,
    /// Completion in percent.
    pub progress: f64,
    /// Download rate in bytes per second.
    pub download_rate: u64,
    /// Upload rate in bytes per second.
    pub upload_rate: u64,
    /// Derived lifecycle state.
    pub status: LifecycleState,
    /// Connected peers.
    pub peers: u32,
    /// Connected seeds.
    pub seeds: u32,
    /// When the registry first saw this torrent.
    pub added_at: DateTime<Utc>,
    /// Files present on disk once the torrent has finished.
    pub download_files: Vec<DownloadFile>,
}

/// Metadata name, else the name hint supplied with the source, else a short id placeholder.
#[must_use]
pub fn display_name(id: Uuid, metadata: Option<&TorrentMetadata>, hint: Option<&str>) -> String {
    match (metadata, hint.map(str::trim)) {
        (Some(meta), _) if !meta.name.is_empty() => meta.name.clone(),
        (_, Some(hint)) if !hint.is_empty() => hint.to_string(),
        _ => {
            let simple = id.simple().to_string();
            format!("Torrent {}", &simple[..8])
        }
    }
}

/// Result of an add call.
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    /// Identifier of the (possibly pre-existing) torrent.
    pub id: Uuid,
    /// Current record.
    pub record: TorrentRecord,
    /// `false` when the content was already tracked.
    pub created: bool,
}

/// Removal options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RemoveTorrent {
    /// Also delete downloaded content from disk.
    #[serde(default, alias = "deleteContent", alias = "delete_files")]
    pub delete_content: bool,
}

/// Result of a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovalOutcome {
    /// Identifier of the removed torrent.
    pub id: Uuid,
    /// Whether content was deleted from disk.
    pub content_deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_hash_hex_round_trips_and_ids_are_stable() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        let hash = InfoHash::from_hex(hex);
        assert_eq!(hash.map(|hash| hash.to_string()).as_deref(), Some(hex));
        assert_eq!(
            hash.map(|hash| hash.torrent_id()),
            InfoHash::from_hex(&hex.to_ascii_uppercase()).map(|hash| hash.torrent_id())
        );
        assert!(InfoHash::from_hex("xyz").is_none());
        assert!(InfoHash::from_hex(&"g".repeat(40)).is_none());
    }

    #[test]
    fn pause_dominates_every_other_signal() {
        let finished_and_paused = EngineStatus {
            paused: true,
            seeding: true,
            finished: true,
            progress: 1.0,
            ..EngineStatus::default()
        };
        assert_eq!(LifecycleState::derive(&finished_and_paused), LifecycleState::Paused);

        let seeding = EngineStatus {
            seeding: true,
            finished: true,
            ..EngineStatus::default()
        };
        assert_eq!(LifecycleState::derive(&seeding), LifecycleState::Seeding);

        let finished = EngineStatus {
            finished: true,
            ..EngineStatus::default()
        };
        assert_eq!(LifecycleState::derive(&finished), LifecycleState::Completed);
        assert_eq!(
            LifecycleState::derive(&EngineStatus::default()),
            LifecycleState::Downloading
        );
    }

    #[test]
    fn source_validation_rejects_malformed_payloads() {
        assert!(TorrentSource::magnet("").validate().is_err());
        assert!(TorrentSource::magnet("http://example.com").validate().is_err());
        assert!(TorrentSource::magnet("magnet:?dn=only-a-name").validate().is_err());
        assert!(
            TorrentSource::magnet("magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567")
                .validate()
                .is_ok()
        );
        assert!(TorrentSource::metainfo(Vec::new()).validate().is_err());
        assert!(TorrentSource::metainfo(b"<html>".to_vec()).validate().is_err());
        assert!(TorrentSource::metainfo(b"de".to_vec()).validate().is_ok());
    }

    #[test]
    fn metadata_layout_and_display_name() {
        let single = TorrentMetadata {
            name: "movie.mkv".into(),
            files: vec![EngineFile {
                path: "movie.mkv".into(),
                size: 10,
            }],
        };
        assert!(single.is_single_file());
        let multi = TorrentMetadata {
            name: "Pack".into(),
            files: vec![EngineFile {
                path: "Pack/a.txt".into(),
                size: 1,
            }],
        };
        assert!(!multi.is_single_file());
        assert_eq!(multi.total_size(), 1);

        let id = Uuid::nil();
        assert_eq!(display_name(id, Some(&single), Some("Hint")), "movie.mkv");
        assert_eq!(display_name(id, None, Some("Some Show")), "Some Show");
        assert_eq!(display_name(id, None, Some("  ")), "Torrent 00000000");
        assert_eq!(display_name(id, None, None), "Torrent 00000000");
    }

    #[test]
    fn total_size_saturates_instead_of_wrapping() {
        let huge = EngineFile {
            path: "Pack/a".into(),
            size: u64::MAX / 2,
        };
        let metadata = TorrentMetadata {
            name: "Pack".into(),
            files: vec![huge.clone(), huge.clone(), huge],
        };
        assert_eq!(metadata.total_size(), u64::MAX);
    }

    #[test]
    fn remove_options_accept_both_spellings() -> Result<(), Box<dyn std::error::Error>> {
        let camel: RemoveTorrent = serde_json::from_str(r#"{"deleteContent":true}"#)?;
        let snake: RemoveTorrent = serde_json::from_str(r#"{"delete_content":true}"#)?;
        assert!(camel.delete_content && snake.delete_content);
        Ok(())
    }
}
