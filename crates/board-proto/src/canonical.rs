// SPDX-License-Identifier: Apache-2.0
//! Deterministic value encoding used for the hash chain and on-disk entities.
//!
//! Unlike the outer WebSocket protocol (plain JSON, see [`crate::Message`]),
//! anything that feeds the hash chain or touches disk goes through this
//! encoder so two equivalent values always produce identical bytes. Ordering
//! is never imposed here — callers hand in already-canonically-ordered
//! sequences (e.g. `BTreeMap` iteration) and the encoder just makes that
//! order byte-stable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A canonically encodable value: scalars, sequences, and the two tagged
/// collection forms this protocol needs (ordered map, ordered set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer fitting in 64 bits.
    Int(i64),
    /// Arbitrary-precision integer, stored as sign + big-endian magnitude.
    BigInt {
        /// `true` for negative values.
        negative: bool,
        /// Big-endian magnitude bytes, no leading zero byte.
        magnitude: Vec<u8>,
    },
    /// UTF-8 text.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// String-keyed object, preserved in key-insertion order.
    Object(Vec<(String, Value)>),
    /// Ordered set, encoded as a tagged sequence. Caller is responsible for
    /// supplying elements in canonical order and without duplicates.
    Set(Vec<Value>),
    /// Ordered map with arbitrary keys, encoded as a tagged sequence of
    /// key/value pairs.
    Map(Vec<(Value, Value)>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonError {
    #[error("unexpected end of input")]
    Incomplete,
    #[error("trailing bytes after value")]
    Trailing,
    #[error("unknown type tag {0:#x}")]
    UnknownTag(u8),
    #[error("invalid utf-8 in text value")]
    InvalidUtf8,
    #[error("length overflow")]
    LengthOverflow,
}

type Result<T> = std::result::Result<T, CanonError>;

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_BIGINT: u8 = 0x04;
const TAG_TEXT: u8 = 0x05;
const TAG_BYTES: u8 = 0x06;
const TAG_ARRAY: u8 = 0x07;
const TAG_OBJECT: u8 = 0x08;
const TAG_SET: u8 = 0x09;
const TAG_MAP: u8 = 0x0a;

/// Encode a value into its canonical byte representation.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    enc_value(value, &mut out);
    out
}

/// Decode a canonical byte representation back into a value.
///
/// # Errors
///
/// Returns [`CanonError`] if the bytes are truncated, carry an unknown type
/// tag, or leave trailing bytes after the top-level value.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let mut idx = 0usize;
    let value = dec_value(bytes, &mut idx)?;
    if idx != bytes.len() {
        return Err(CanonError::Trailing);
    }
    Ok(value)
}

fn enc_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(false) => out.push(TAG_FALSE),
        Value::Bool(true) => out.push(TAG_TRUE),
        Value::Int(n) => {
            out.push(TAG_INT);
            out.extend_from_slice(&n.to_be_bytes());
        }
        Value::BigInt { negative, magnitude } => {
            out.push(TAG_BIGINT);
            out.push(u8::from(*negative));
            enc_len(magnitude.len(), out);
            out.extend_from_slice(magnitude);
        }
        Value::Text(s) => {
            out.push(TAG_TEXT);
            enc_len(s.len(), out);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            enc_len(b.len(), out);
            out.extend_from_slice(b);
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            enc_len(items.len(), out);
            for item in items {
                enc_value(item, out);
            }
        }
        Value::Object(entries) => {
            out.push(TAG_OBJECT);
            enc_len(entries.len(), out);
            for (key, val) in entries {
                enc_len(key.len(), out);
                out.extend_from_slice(key.as_bytes());
                enc_value(val, out);
            }
        }
        Value::Set(items) => {
            out.push(TAG_SET);
            enc_len(items.len(), out);
            for item in items {
                enc_value(item, out);
            }
        }
        Value::Map(entries) => {
            out.push(TAG_MAP);
            enc_len(entries.len(), out);
            for (key, val) in entries {
                enc_value(key, out);
                enc_value(val, out);
            }
        }
    }
}

fn enc_len(len: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(&(len as u64).to_be_bytes());
}

fn dec_len(bytes: &[u8], idx: &mut usize) -> Result<usize> {
    let raw = take(bytes, idx, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(raw);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|_| CanonError::LengthOverflow)
}

fn take<'a>(bytes: &'a [u8], idx: &mut usize, n: usize) -> Result<&'a [u8]> {
    let end = idx.checked_add(n).ok_or(CanonError::LengthOverflow)?;
    if end > bytes.len() {
        return Err(CanonError::Incomplete);
    }
    let slice = &bytes[*idx..end];
    *idx = end;
    Ok(slice)
}

fn dec_value(bytes: &[u8], idx: &mut usize) -> Result<Value> {
    let tag = *take(bytes, idx, 1)?.first().ok_or(CanonError::Incomplete)?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_FALSE => Ok(Value::Bool(false)),
        TAG_TRUE => Ok(Value::Bool(true)),
        TAG_INT => {
            let raw = take(bytes, idx, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            Ok(Value::Int(i64::from_be_bytes(buf)))
        }
        TAG_BIGINT => {
            let negative = take(bytes, idx, 1)?[0] != 0;
            let len = dec_len(bytes, idx)?;
            let magnitude = take(bytes, idx, len)?.to_vec();
            Ok(Value::BigInt { negative, magnitude })
        }
        TAG_TEXT => {
            let len = dec_len(bytes, idx)?;
            let raw = take(bytes, idx, len)?;
            let s = std::str::from_utf8(raw).map_err(|_| CanonError::InvalidUtf8)?;
            Ok(Value::Text(s.to_string()))
        }
        TAG_BYTES => {
            let len = dec_len(bytes, idx)?;
            Ok(Value::Bytes(take(bytes, idx, len)?.to_vec()))
        }
        TAG_ARRAY => {
            let len = dec_len(bytes, idx)?;
            let mut items = Vec::with_capacity(len.min(1 << 20));
            for _ in 0..len {
                items.push(dec_value(bytes, idx)?);
            }
            Ok(Value::Array(items))
        }
        TAG_OBJECT => {
            let len = dec_len(bytes, idx)?;
            let mut entries = Vec::with_capacity(len.min(1 << 20));
            for _ in 0..len {
                let klen = dec_len(bytes, idx)?;
                let kraw = take(bytes, idx, klen)?;
                let key = std::str::from_utf8(kraw)
                    .map_err(|_| CanonError::InvalidUtf8)?
                    .to_string();
                let val = dec_value(bytes, idx)?;
                entries.push((key, val));
            }
            Ok(Value::Object(entries))
        }
        TAG_SET => {
            let len = dec_len(bytes, idx)?;
            let mut items = Vec::with_capacity(len.min(1 << 20));
            for _ in 0..len {
                items.push(dec_value(bytes, idx)?);
            }
            Ok(Value::Set(items))
        }
        TAG_MAP => {
            let len = dec_len(bytes, idx)?;
            let mut entries = Vec::with_capacity(len.min(1 << 20));
            for _ in 0..len {
                let key = dec_value(bytes, idx)?;
                let val = dec_value(bytes, idx)?;
                entries.push((key, val));
            }
            Ok(Value::Map(entries))
        }
        other => Err(CanonError::UnknownTag(other)),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars() {
        for v in [
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::Int(-42),
            Value::Text("hi".into()),
            Value::Bytes(vec![1, 2, 3]),
        ] {
            let bytes = encode(&v);
            assert_eq!(decode(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn object_preserves_insertion_order_not_sorted() {
        let v = Value::Object(vec![
            ("z".into(), Value::Int(1)),
            ("a".into(), Value::Int(2)),
        ]);
        let bytes = encode(&v);
        let back = decode(&bytes).unwrap();
        match back {
            Value::Object(entries) => {
                assert_eq!(entries[0].0, "z");
                assert_eq!(entries[1].0, "a");
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn equivalent_values_encode_identically() {
        let a = Value::Array(vec![Value::Int(1), Value::Text("x".into())]);
        let b = Value::Array(vec![Value::Int(1), Value::Text("x".into())]);
        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn set_and_map_round_trip() {
        let set = Value::Set(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(decode(&encode(&set)).unwrap(), set);

        let map = Value::Map(vec![(Value::Text("k".into()), Value::Int(9))]);
        assert_eq!(decode(&encode(&map)).unwrap(), map);
    }

    #[test]
    fn bigint_round_trip() {
        let v = Value::BigInt {
            negative: true,
            magnitude: vec![0xff, 0x00, 0x01],
        };
        assert_eq!(decode(&encode(&v)).unwrap(), v);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode(&Value::Int(1));
        bytes.push(0xff);
        assert_eq!(decode(&bytes), Err(CanonError::Trailing));
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = encode(&Value::Text("hello".into()));
        let truncated = &bytes[..bytes.len() - 2];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!(decode(&[0xfe]), Err(CanonError::UnknownTag(0xfe)));
    }
}
