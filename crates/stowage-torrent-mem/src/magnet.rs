//! Magnet URI parsing (`xt=urn:btih:` and `dn`).

use stowage_torrent_core::InfoHash;

use crate::error::{MemEngineError, MemEngineResult};

const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// A parsed magnet link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Magnet {
    /// Info hash from the `xt` parameter.
    pub info_hash: InfoHash,
    /// Display name from the `dn` parameter.
    pub display_name: Option<String>,
}

impl Magnet {
    /// Parse a magnet URI.
    ///
    /// # Errors
    ///
    /// Returns `MemEngineError::InvalidMagnet` when the scheme or `btih` hash is unusable.
    pub fn parse(uri: &str) -> MemEngineResult<Self> {
        let query = uri
            .trim()
            .strip_prefix("magnet:?")
            .ok_or(MemEngineError::InvalidMagnet {
                reason: "missing_scheme",
            })?;

        let mut info_hash = None;
        let mut display_name = None;
        for (key, value) in query.split('&').filter_map(|pair| pair.split_once('=')) {
            match key {
                "xt" => {
                    if let Some(hash) = value.strip_prefix("urn:btih:").and_then(parse_btih) {
                        info_hash = Some(hash);
                    }
                }
                "dn" => display_name = Some(percent_decode(value)),
                _ => {}
            }
        }

        Ok(Self {
            info_hash: info_hash.ok_or(MemEngineError::InvalidMagnet {
                reason: "missing_btih",
            })?,
            display_name,
        })
    }
}

fn parse_btih(hash: &str) -> Option<InfoHash> {
    match hash.len() {
        40 => InfoHash::from_hex(hash),
        32 => base32_decode(hash).map(InfoHash::new),
        _ => None,
    }
}

fn base32_decode(input: &str) -> Option<[u8; 20]> {
    let mut out = [0_u8; 20];
    let mut written = 0;
    let mut bits: u64 = 0;
    let mut bit_count = 0_u32;
    for byte in input.bytes() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&symbol| symbol == byte.to_ascii_uppercase())?;
        bits = (bits << 5) | u64::try_from(value).ok()?;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            *out.get_mut(written)? = u8::try_from((bits >> bit_count) & 0xff).ok()?;
            written += 1;
            bits &= (1 << bit_count) - 1;
        }
    }
    (written == 20).then_some(out)
}

fn percent_decode(value: &str) -> String {
    let raw = value.as_bytes();
    let mut decoded = Vec::with_capacity(raw.len());
    let mut index = 0;
    while index < raw.len() {
        match raw[index] {
            b'+' => decoded.push(b' '),
            b'%' => {
                let escaped = raw
                    .get(index + 1..index + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = escaped {
                    decoded.push(byte);
                    index += 3;
                    continue;
                }
                decoded.push(b'%');
            }
            other => decoded.push(other),
        }
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}
