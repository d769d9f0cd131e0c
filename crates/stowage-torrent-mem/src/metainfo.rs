//! Metainfo (`.torrent`) parsing into the registry's metadata model.

use sha1::{Digest, Sha1};
use stowage_torrent_core::{EngineFile, InfoHash, TorrentMetadata};

use crate::bencode::{self, Value};
use crate::error::{MemEngineError, MemEngineResult};

/// The subset of a metainfo file the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    /// SHA-1 of the raw `info` dictionary bytes.
    pub info_hash: InfoHash,
    /// Name and file table. Multi-file paths are prefixed with the torrent name.
    pub metadata: TorrentMetadata,
}

impl Metainfo {
    /// Parse bencoded metainfo.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` for invalid bencode and `InvalidMetainfo` when required keys
    /// are missing or carry unusable values.
    pub fn parse(data: &[u8]) -> MemEngineResult<Self> {
        let root = bencode::decode(data)?;
        let info = root.get("info").ok_or(MemEngineError::InvalidMetainfo {
            field: "info",
            reason: "missing",
        })?;
        let span = bencode::top_level_span(data, b"info")?.ok_or(MemEngineError::InvalidMetainfo {
            field: "info",
            reason: "missing",
        })?;
        let info_hash = InfoHash::new(Sha1::digest(&data[span]).into());

        let name = info
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| is_safe_component(name))
            .ok_or(MemEngineError::InvalidMetainfo {
                field: "name",
                reason: "missing_or_unsafe",
            })?
            .to_string();

        let files = match (info.get("length"), info.get("files")) {
            (Some(length), None) => vec![EngineFile {
                path: name.clone(),
                size: file_length(length)?,
            }],
            (None, Some(files)) => parse_files(&name, files)?,
            _ => {
                return Err(MemEngineError::InvalidMetainfo {
                    field: "info",
                    reason: "ambiguous_layout",
                });
            }
        };

        Ok(Self {
            info_hash,
            metadata: TorrentMetadata { name, files },
        })
    }
}

fn parse_files(name: &str, files: &Value) -> MemEngineResult<Vec<EngineFile>> {
    let entries = files
        .as_list()
        .filter(|entries| !entries.is_empty())
        .ok_or(MemEngineError::InvalidMetainfo {
            field: "files",
            reason: "empty_or_not_a_list",
        })?;

    let files = entries
        .iter()
        .map(|entry| -> MemEngineResult<EngineFile> {
            let size = entry.get("length").map_or(
                Err(MemEngineError::InvalidMetainfo {
                    field: "files.length",
                    reason: "missing",
                }),
                file_length,
            )?;
            let components = entry
                .get("path")
                .and_then(Value::as_list)
                .filter(|parts| !parts.is_empty())
                .ok_or(MemEngineError::InvalidMetainfo {
                    field: "files.path",
                    reason: "missing",
                })?;
            let mut path = name.to_string();
            for component in components {
                let part = component
                    .as_str()
                    .filter(|part| is_safe_component(part))
                    .ok_or(MemEngineError::InvalidMetainfo {
                        field: "files.path",
                        reason: "unsafe_component",
                    })?;
                path.push('/');
                path.push_str(part);
            }
            Ok(EngineFile { path, size })
        })
        .collect::<MemEngineResult<Vec<_>>>()?;

    files
        .iter()
        .try_fold(0_u64, |total, file| total.checked_add(file.size))
        .ok_or(MemEngineError::InvalidMetainfo {
            field: "files.length",
            reason: "total_overflows",
        })?;
    Ok(files)
}

fn file_length(value: &Value) -> MemEngineResult<u64> {
    value
        .as_int()
        .and_then(|length| u64::try_from(length).ok())
        .ok_or(MemEngineError::InvalidMetainfo {
            field: "length",
            reason: "negative_or_not_an_integer",
        })
}

fn is_safe_component(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_test_support::metainfo;

    #[test]
    fn single_file_layout() -> MemEngineResult<()> {
        let parsed = Metainfo::parse(&metainfo::single_file("movie.mkv", 100))?;
        assert_eq!(parsed.metadata.name, "movie.mkv");
        assert_eq!(
            parsed.metadata.files,
            vec![EngineFile {
                path: "movie.mkv".into(),
                size: 100,
            }]
        );
        assert!(parsed.metadata.is_single_file());
        Ok(())
    }

    #[test]
    fn multi_file_paths_are_prefixed_with_name() -> MemEngineResult<()> {
        let parsed = Metainfo::parse(&metainfo::multi_file(
            "Pack",
            &[("a.txt", 1), ("sub/b.txt", 2)],
        ))?;
        let paths: Vec<_> = parsed.metadata.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["Pack/a.txt", "Pack/sub/b.txt"]);
        assert_eq!(parsed.metadata.total_size(), 3);
        Ok(())
    }

    #[test]
    fn info_hash_covers_only_the_info_dictionary() -> MemEngineResult<()> {
        let a = Metainfo::parse(&metainfo::single_file("same.bin", 5))?;
        let b = Metainfo::parse(&metainfo::single_file("same.bin", 5))?;
        let c = Metainfo::parse(&metainfo::single_file("other.bin", 5))?;
        assert_eq!(a.info_hash, b.info_hash);
        assert_ne!(a.info_hash, c.info_hash);
        Ok(())
    }

    #[test]
    fn rejects_file_tables_whose_total_overflows() {
        let huge = "d6:lengthi9223372036854775807e4:pathl1:xee";
        let payload = format!("d4:infod5:filesl{huge}{huge}{huge}e4:name4:Packee");
        assert!(matches!(
            Metainfo::parse(payload.as_bytes()),
            Err(MemEngineError::InvalidMetainfo {
                reason: "total_overflows",
                ..
            })
        ));
    }

    #[test]
    fn rejects_traversal_in_names() {
        let hostile = metainfo::multi_file("Pack", &[("../escape.txt", 1)]);
        assert!(matches!(
            Metainfo::parse(&hostile),
            Err(MemEngineError::InvalidMetainfo {
                reason: "unsafe_component",
                ..
            })
        ));
        assert!(Metainfo::parse(b"d4:infod4:name1:xee").is_err());
        assert!(Metainfo::parse(b"d8:announce3:urle").is_err());
    }
}
