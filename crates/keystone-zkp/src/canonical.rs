//! Canonical CBOR encoding.
//!
//! RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! Challenges and proof identifiers hash these bytes, so prover and
//! verifier must produce identical output for the same value.

use ciborium::value::Value;
use serde::Serialize;

use crate::error::{Result, ZkError};

/// Encode a CBOR value to canonical bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Serialize any serde value through the canonical encoder.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = Value::serialized(value).map_err(|e| ZkError::Encoding(e.to_string()))?;
    encode(&value)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value_to(buf, inner)?;
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(ZkError::Encoding("floats have no canonical encoding".into()))
        }
        _ => return Err(ZkError::Encoding("unsupported CBOR value".into())),
    }
    Ok(())
}

fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut encoded = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        encoded.push((encode(k)?, encode(v)?));
    }
    encoded.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, encoded.len() as u64);
    for (k, v) in encoded {
        buf.extend_from_slice(&k);
        buf.extend_from_slice(&v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smallest_integer_encoding() {
        assert_eq!(encode(&Value::Integer(23.into())).unwrap(), vec![0x17]);
        assert_eq!(encode(&Value::Integer(24.into())).unwrap(), vec![0x18, 24]);
        assert_eq!(encode(&Value::Integer(256.into())).unwrap(), vec![0x19, 1, 0]);
        assert_eq!(encode(&Value::Integer((-1).into())).unwrap(), vec![0x20]);
    }

    #[test]
    fn test_map_order_independent() {
        let a = Value::Map(vec![
            (Value::Text("b".into()), Value::Integer(2.into())),
            (Value::Text("a".into()), Value::Integer(1.into())),
        ]);
        let b = Value::Map(vec![
            (Value::Text("a".into()), Value::Integer(1.into())),
            (Value::Text("b".into()), Value::Integer(2.into())),
        ]);
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn test_float_rejected() {
        assert!(encode(&Value::Float(1.5)).is_err());
    }
}
