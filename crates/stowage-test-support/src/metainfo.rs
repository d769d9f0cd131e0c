//! Synthetic `.torrent` payloads and magnet links.
//!
//! The encoder only covers what fixtures need: integers, byte strings, lists, and
//! dictionaries with keys emitted in sorted order.

use std::collections::BTreeMap;

const PIECE_LENGTH: u64 = 16_384;
const TRACKER: &str = "http://tracker.invalid/announce";

enum Value {
    Int(u64),
    Bytes(Vec<u8>),
    List(Vec<Self>),
    Dict(BTreeMap<Vec<u8>, Self>),
}

impl Value {
    fn str(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(value) => out.extend_from_slice(format!("i{value}e").as_bytes()),
            Self::Bytes(bytes) => {
                out.extend_from_slice(format!("{}:", bytes.len()).as_bytes());
                out.extend_from_slice(bytes);
            }
            Self::List(items) => {
                out.push(b'l');
                for item in items {
                    item.encode(out);
                }
                out.push(b'e');
            }
            Self::Dict(entries) => {
                out.push(b'd');
                for (key, value) in entries {
                    Self::Bytes(key.clone()).encode(out);
                    value.encode(out);
                }
                out.push(b'e');
            }
        }
    }
}

fn dict(entries: Vec<(&str, Value)>) -> Value {
    Value::Dict(
        entries
            .into_iter()
            .map(|(key, value)| (key.as_bytes().to_vec(), value))
            .collect(),
    )
}

fn pieces(total: u64) -> Value {
    let count = total.div_ceil(PIECE_LENGTH).max(1);
    let len = usize::try_from(count * 20).unwrap_or(20);
    Value::Bytes(vec![0_u8; len])
}

fn wrap(info: Value) -> Vec<u8> {
    let mut out = Vec::new();
    dict(vec![("announce", Value::str(TRACKER)), ("info", info)]).encode(&mut out);
    out
}

/// Metainfo for a single-file torrent named `name` of `length` bytes.
#[must_use]
pub fn single_file(name: &str, length: u64) -> Vec<u8> {
    wrap(dict(vec![
        ("length", Value::Int(length)),
        ("name", Value::str(name)),
        ("piece length", Value::Int(PIECE_LENGTH)),
        ("pieces", pieces(length)),
    ]))
}

/// Metainfo for a multi-file torrent; each file path uses `/` separators and is
/// relative to the torrent's `name` directory.
#[must_use]
pub fn multi_file(name: &str, files: &[(&str, u64)]) -> Vec<u8> {
    let total = files.iter().map(|(_, length)| length).sum();
    let entries = files
        .iter()
        .map(|(path, length)| {
            dict(vec![
                ("length", Value::Int(*length)),
                (
                    "path",
                    Value::List(path.split('/').map(Value::str).collect()),
                ),
            ])
        })
        .collect();
    wrap(dict(vec![
        ("files", Value::List(entries)),
        ("name", Value::str(name)),
        ("piece length", Value::Int(PIECE_LENGTH)),
        ("pieces", pieces(total)),
    ]))
}

/// Magnet link for a 40-character hex info hash with an optional display name.
#[must_use]
pub fn magnet(hex_info_hash: &str, display_name: Option<&str>) -> String {
    display_name.map_or_else(
        || format!("magnet:?xt=urn:btih:{hex_info_hash}"),
        |name| format!("magnet:?xt=urn:btih:{hex_info_hash}&dn={}", name.replace(' ', "+")),
    )
}
