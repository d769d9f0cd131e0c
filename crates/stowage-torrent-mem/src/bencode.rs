//! Minimal bencode decoder.
//!
//! Besides decoding values it can report the raw byte span of a top-level dictionary
//! entry, which is what info-hash derivation needs: the hash covers the exact bytes of
//! the `info` dictionary as submitted, not a re-encoding.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::{MemEngineError, MemEngineResult};

const MAX_DEPTH: usize = 64;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed integer.
    Integer(i64),
    /// Byte string; not necessarily UTF-8.
    Bytes(Vec<u8>),
    /// Ordered list.
    List(Vec<Self>),
    /// Dictionary keyed by raw bytes.
    Dict(BTreeMap<Vec<u8>, Self>),
}

impl Value {
    /// Borrow as a dictionary.
    #[must_use]
    pub const fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Self>> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Borrow as a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a UTF-8 string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Read as an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Look up a dictionary key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_dict()?.get(key.as_bytes())
    }
}

/// Decode exactly one value spanning the whole input.
///
/// # Errors
///
/// Returns `MemEngineError::Malformed` for invalid syntax or trailing bytes.
pub fn decode(data: &[u8]) -> MemEngineResult<Value> {
    let mut decoder = Decoder { data, pos: 0 };
    let value = decoder.value(0)?;
    if decoder.pos != data.len() {
        return Err(decoder.error("trailing_data"));
    }
    Ok(value)
}

/// Byte range of the value stored under `key` in a top-level dictionary.
///
/// # Errors
///
/// Returns `MemEngineError::Malformed` when the input is not a valid dictionary.
pub fn top_level_span(data: &[u8], key: &[u8]) -> MemEngineResult<Option<Range<usize>>> {
    let mut decoder = Decoder { data, pos: 0 };
    decoder.expect(b'd')?;
    while decoder.peek()? != b'e' {
        let entry_key = decoder.bytes()?;
        let start = decoder.pos;
        decoder.value(1)?;
        if entry_key == key {
            return Ok(Some(start..decoder.pos));
        }
    }
    Ok(None)
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    const fn error(&self, reason: &'static str) -> MemEngineError {
        MemEngineError::Malformed {
            offset: self.pos,
            reason,
        }
    }

    fn peek(&self) -> MemEngineResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error("unexpected_end"))
    }

    fn expect(&mut self, byte: u8) -> MemEngineResult<()> {
        if self.peek()? != byte {
            return Err(self.error("unexpected_byte"));
        }
        self.pos += 1;
        Ok(())
    }

    fn value(&mut self, depth: usize) -> MemEngineResult<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting_too_deep"));
        }
        match self.peek()? {
            b'i' => self.integer().map(Value::Integer),
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Value::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut entries = BTreeMap::new();
                while self.peek()? != b'e' {
                    let key = self.bytes()?;
                    let value = self.value(depth + 1)?;
                    entries.insert(key, value);
                }
                self.pos += 1;
                Ok(Value::Dict(entries))
            }
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            _ => Err(self.error("unknown_type_marker")),
        }
    }

    fn integer(&mut self) -> MemEngineResult<i64> {
        self.expect(b'i')?;
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|&byte| byte == b'e')
            .ok_or_else(|| self.error("unterminated_integer"))?;
        let digits = std::str::from_utf8(&rest[..end]).map_err(|_| self.error("invalid_integer"))?;
        let unsigned = digits.strip_prefix('-').unwrap_or(digits);
        if unsigned.is_empty()
            || (unsigned.len() > 1 && unsigned.starts_with('0'))
            || digits == "-0"
        {
            return Err(self.error("invalid_integer"));
        }
        let value = digits.parse::<i64>().map_err(|_| self.error("invalid_integer"))?;
        self.pos += end + 1;
        Ok(value)
    }

    fn bytes(&mut self) -> MemEngineResult<Vec<u8>> {
        let rest = &self.data[self.pos..];
        let colon = rest
            .iter()
            .position(|&byte| byte == b':')
            .ok_or_else(|| self.error("missing_length_separator"))?;
        let len = std::str::from_utf8(&rest[..colon])
            .ok()
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| self.error("invalid_length"))?;
        let start = colon + 1;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= rest.len())
            .ok_or_else(|| self.error("length_exceeds_input"))?;
        let bytes = rest[start..end].to_vec();
        self.pos += end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_nested_structures() -> MemEngineResult<()> {
        let value = decode(b"d4:listli1ei-2ee4:name4:spame")?;
        assert_eq!(value.get("name").and_then(Value::as_str), Some("spam"));
        let list = value.get("list").and_then(Value::as_list).map(<[Value]>::to_vec);
        assert_eq!(list, Some(vec![Value::Integer(1), Value::Integer(-2)]));
        Ok(())
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            &b""[..],
            b"i01e",
            b"i-0e",
            b"ie",
            b"5:abc",
            b"l",
            b"d3:keye",
            b"x",
            b"i1ei2e",
        ] {
            assert!(decode(bad).is_err(), "{:?} should fail", String::from_utf8_lossy(bad));
        }
    }

    #[test]
    fn reports_raw_span_of_top_level_entry() -> MemEngineResult<()> {
        let data = b"d8:announce3:url4:infod4:name1:xee";
        let span = top_level_span(data, b"info")?;
        assert_eq!(span.map(|range| &data[range]), Some(&b"d4:name1:xe"[..]));
        assert_eq!(top_level_span(data, b"missing")?, None);
        Ok(())
    }

    #[test]
    fn depth_is_bounded() {
        let mut deep = vec![b'l'; MAX_DEPTH + 2];
        deep.extend(vec![b'e'; MAX_DEPTH + 2]);
        assert!(decode(&deep).is_err());
    }
}
