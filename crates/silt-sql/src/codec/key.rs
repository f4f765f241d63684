//! Order-preserving key encoding.
//!
//! Every value encodes as a one-byte type tag followed by a payload whose
//! unsigned byte order matches the typed order of the values. Tags follow
//! the cross-type order (null < boolean < number < timestamp < text <
//! blob < array < object), and composite keys join per-value encodings
//! with `ARRAY_VALUE_DELIM`.
//!
//! Number payloads are 9 bytes: the floored integer part, big-endian with
//! the sign bit flipped, then one fraction byte (`floor(frac * 256)`).
//! Integers and doubles therefore share a single order with no type-based
//! tie-break: `2` and `2.0` encode to the same bytes, and decoding
//! normalizes whole numbers to integers. Doubles keep 1/256 of fractional
//! granularity in key position; row bodies keep full precision.
//!
//! Text and blob payloads escape `0x00` as `0x00 0xFF` and terminate with
//! `0x00 0x00`, so no well-formed key carries a raw `0xFF` at a delimiter
//! position. That is what makes `key ++ DELIM ++ 0xFF` a tight exclusive
//! upper bound: it sorts after every extension of `key` and before the
//! next distinct key.

use crate::error::{Error, Result};
use crate::object::Object;
use crate::value::Value;

/// Separator between the elements of a composite key.
pub const ARRAY_VALUE_DELIM: u8 = 0x01;

/// Terminates text/blob payloads and array/object element lists.
const TERMINATOR: u8 = 0x00;

const TAG_NULL: u8 = 0x05;
const TAG_BOOLEAN: u8 = 0x10;
const TAG_NUMBER: u8 = 0x20;
const TAG_TIMESTAMP: u8 = 0x28;
const TAG_TEXT: u8 = 0x30;
const TAG_BLOB: u8 = 0x38;
const TAG_ARRAY: u8 = 0x40;
const TAG_OBJECT: u8 = 0x50;

const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

/// Appends the order-preserving encoding of `value` to `buf`.
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(*b as u8);
        }
        Value::Integer(i) => {
            buf.push(TAG_NUMBER);
            encode_number(buf, *i, 0);
        }
        Value::Double(d) => {
            buf.push(TAG_NUMBER);
            let (floor, frac) = split_double(*d);
            encode_number(buf, floor, frac);
        }
        Value::Timestamp(ns) => {
            buf.push(TAG_TIMESTAMP);
            buf.extend_from_slice(&((*ns as u64) ^ SIGN_BIT).to_be_bytes());
        }
        Value::Text(s) => {
            buf.push(TAG_TEXT);
            encode_bytes(buf, s.as_bytes());
        }
        Value::Blob(b) => {
            buf.push(TAG_BLOB);
            encode_bytes(buf, b);
        }
        Value::Array(vals) => {
            buf.push(TAG_ARRAY);
            for v in vals {
                buf.push(ARRAY_VALUE_DELIM);
                encode_value(buf, v);
            }
            buf.push(TERMINATOR);
        }
        Value::Object(obj) => {
            buf.push(TAG_OBJECT);
            let mut fields: Vec<_> = obj.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            for (name, v) in fields {
                buf.push(ARRAY_VALUE_DELIM);
                buf.push(TAG_TEXT);
                encode_bytes(buf, name.as_bytes());
                buf.push(ARRAY_VALUE_DELIM);
                encode_value(buf, v);
            }
            buf.push(TERMINATOR);
        }
    }
}

/// Encodes a composite key: per-value encodings joined by the delimiter.
pub fn encode_key(values: &[Value]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * 10);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            buf.push(ARRAY_VALUE_DELIM);
        }
        encode_value(&mut buf, v);
    }
    buf
}

/// Decodes a composite key back into its values.
pub fn decode_key(bytes: &[u8]) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if !values.is_empty() {
            if bytes[pos] != ARRAY_VALUE_DELIM {
                return Err(corrupt("missing key delimiter"));
            }
            pos += 1;
        }
        let (value, read) = decode_value(&bytes[pos..])?;
        values.push(value);
        pos += read;
    }
    Ok(values)
}

/// Decodes one value, returning it and the number of bytes consumed.
pub fn decode_value(bytes: &[u8]) -> Result<(Value, usize)> {
    let tag = *bytes.first().ok_or_else(|| corrupt("empty key value"))?;
    let rest = &bytes[1..];
    match tag {
        TAG_NULL => Ok((Value::Null, 1)),
        TAG_BOOLEAN => {
            let b = *rest.first().ok_or_else(|| corrupt("short boolean"))?;
            Ok((Value::Boolean(b != 0), 2))
        }
        TAG_NUMBER => {
            if rest.len() < 9 {
                return Err(corrupt("short number"));
            }
            let floor = (u64::from_be_bytes(rest[..8].try_into().unwrap()) ^ SIGN_BIT) as i64;
            let frac = rest[8];
            let value = if frac == 0 {
                Value::Integer(floor)
            } else {
                Value::Double(floor as f64 + frac as f64 / 256.0)
            };
            Ok((value, 10))
        }
        TAG_TIMESTAMP => {
            if rest.len() < 8 {
                return Err(corrupt("short timestamp"));
            }
            let ns = (u64::from_be_bytes(rest[..8].try_into().unwrap()) ^ SIGN_BIT) as i64;
            Ok((Value::Timestamp(ns), 9))
        }
        TAG_TEXT => {
            let (bytes, read) = decode_bytes(rest)?;
            let s = String::from_utf8(bytes)
                .map_err(|_| corrupt("invalid utf-8 in text key"))?;
            Ok((Value::Text(s), 1 + read))
        }
        TAG_BLOB => {
            let (bytes, read) = decode_bytes(rest)?;
            Ok((Value::Blob(bytes), 1 + read))
        }
        TAG_ARRAY => {
            let mut vals = Vec::new();
            let mut pos = 0;
            loop {
                match rest.get(pos) {
                    Some(&TERMINATOR) => return Ok((Value::Array(vals), 1 + pos + 1)),
                    Some(&ARRAY_VALUE_DELIM) => {
                        let (v, read) = decode_value(&rest[pos + 1..])?;
                        vals.push(v);
                        pos += 1 + read;
                    }
                    _ => return Err(corrupt("unterminated array")),
                }
            }
        }
        TAG_OBJECT => {
            let mut obj = Object::new();
            let mut pos = 0;
            loop {
                match rest.get(pos) {
                    Some(&TERMINATOR) => return Ok((Value::Object(obj), 1 + pos + 1)),
                    Some(&ARRAY_VALUE_DELIM) => {
                        pos += 1;
                        if rest.get(pos) != Some(&TAG_TEXT) {
                            return Err(corrupt("object key is not text"));
                        }
                        let (name, read) = decode_bytes(&rest[pos + 1..])?;
                        let name = String::from_utf8(name)
                            .map_err(|_| corrupt("invalid utf-8 in field name"))?;
                        pos += 1 + read;
                        if rest.get(pos) != Some(&ARRAY_VALUE_DELIM) {
                            return Err(corrupt("missing field delimiter"));
                        }
                        let (v, read) = decode_value(&rest[pos + 1..])?;
                        obj.set(&name, v);
                        pos += 1 + read;
                    }
                    _ => return Err(corrupt("unterminated object")),
                }
            }
        }
        t => Err(corrupt(&format!("unknown key tag {t:#04x}"))),
    }
}

fn encode_number(buf: &mut Vec<u8>, floor: i64, frac: u8) {
    buf.extend_from_slice(&((floor as u64) ^ SIGN_BIT).to_be_bytes());
    buf.push(frac);
}

/// Splits a double into floored integer part and one fraction byte,
/// saturating doubles outside the i64 range.
fn split_double(d: f64) -> (i64, u8) {
    if d.is_nan() {
        return (i64::MIN, 0);
    }
    let floor = d.floor();
    if floor >= i64::MAX as f64 {
        return (i64::MAX, 0xFF);
    }
    if floor <= i64::MIN as f64 {
        return (i64::MIN, 0);
    }
    let floor_i = floor as i64;
    let frac = ((d - floor) * 256.0) as u8;
    (floor_i, frac)
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == 0x00 {
            buf.push(0x00);
            buf.push(0xFF);
        } else {
            buf.push(b);
        }
    }
    buf.push(TERMINATOR);
    buf.push(TERMINATOR);
}

fn decode_bytes(bytes: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        match bytes.get(pos) {
            Some(&0x00) => match bytes.get(pos + 1) {
                Some(&0xFF) => {
                    out.push(0x00);
                    pos += 2;
                }
                Some(&0x00) => return Ok((out, pos + 2)),
                _ => return Err(corrupt("bad escape in text/blob key")),
            },
            Some(&b) => {
                out.push(b);
                pos += 1;
            }
            None => return Err(corrupt("unterminated text/blob key")),
        }
    }
}

fn corrupt(msg: &str) -> Error {
    Error::Type(format!("corrupt key encoding: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(v: &Value) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_value(&mut buf, v);
        buf
    }

    fn roundtrip(v: &Value) -> Value {
        decode_value(&enc(v)).unwrap().0
    }

    #[test]
    fn test_integer_roundtrip() {
        for i in [i64::MIN, -1_000_000, -1, 0, 1, 42, 1_000_000, i64::MAX] {
            assert_eq!(roundtrip(&Value::Integer(i)), Value::Integer(i));
        }
    }

    #[test]
    fn test_scalar_roundtrips() {
        for v in [
            Value::Null,
            Value::Boolean(false),
            Value::Boolean(true),
            Value::Timestamp(-5),
            Value::Timestamp(1_700_000_000_000_000_000),
            Value::Text("hello".into()),
            Value::Text("with\0zero".into()),
            Value::Text(String::new()),
            Value::Blob(vec![0, 1, 0xFF, 0]),
            Value::Array(vec![Value::Integer(1), Value::Text("x".into())]),
        ] {
            assert_eq!(roundtrip(&v), v);
        }
    }

    #[test]
    fn test_object_roundtrip_sorts_fields() {
        let o = Object::from_pairs(vec![
            ("b".to_string(), Value::Integer(2)),
            ("a".to_string(), Value::Integer(1)),
        ]);
        let decoded = roundtrip(&Value::Object(o.clone()));
        assert_eq!(decoded, Value::Object(o));
    }

    #[test]
    fn test_integer_order() {
        let mut values: Vec<i64> = vec![i64::MIN, -500, -1, 0, 1, 7, 500, i64::MAX];
        values.sort();
        for w in values.windows(2) {
            assert!(
                enc(&Value::Integer(w[0])) < enc(&Value::Integer(w[1])),
                "{} !< {}",
                w[0],
                w[1]
            );
        }
    }

    #[test]
    fn test_random_integer_order() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let a: i64 = rng.gen();
            let b: i64 = rng.gen();
            if a == b {
                continue;
            }
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            assert!(enc(&Value::Integer(lo)) < enc(&Value::Integer(hi)));
        }
    }

    #[test]
    fn test_mixed_number_order() {
        // Integers and doubles interleave with no type tie-break.
        let ordered = [
            Value::Double(-10.5),
            Value::Integer(-10),
            Value::Double(-0.5),
            Value::Integer(0),
            Value::Double(0.25),
            Value::Integer(1),
            Value::Double(1.5),
            Value::Integer(2),
            Value::Double(1e18),
        ];
        for w in ordered.windows(2) {
            assert!(enc(&w[0]) < enc(&w[1]), "{} !< {}", w[0], w[1]);
        }
    }

    #[test]
    fn test_equal_magnitudes_encode_identically() {
        assert_eq!(enc(&Value::Integer(2)), enc(&Value::Double(2.0)));
    }

    #[test]
    fn test_cross_type_order() {
        let ordered = [
            Value::Null,
            Value::Boolean(false),
            Value::Boolean(true),
            Value::Integer(i64::MIN),
            Value::Integer(i64::MAX),
            Value::Timestamp(i64::MIN),
            Value::Text("".into()),
            Value::Text("z".into()),
            Value::Blob(vec![]),
            Value::Array(vec![]),
            Value::Object(Object::new()),
        ];
        for w in ordered.windows(2) {
            assert!(enc(&w[0]) < enc(&w[1]), "{} !< {}", w[0], w[1]);
        }
    }

    #[test]
    fn test_text_order_matches_bytes() {
        let mut words = vec!["", "a", "a\0", "a\0b", "ab", "b", "ba"];
        words.sort();
        for w in words.windows(2) {
            assert!(
                enc(&Value::Text(w[0].into())) < enc(&Value::Text(w[1].into())),
                "{:?} !< {:?}",
                w[0],
                w[1]
            );
        }
    }

    #[test]
    fn test_composite_key_order() {
        let k = |vals: &[i64]| encode_key(&vals.iter().map(|&i| Value::Integer(i)).collect::<Vec<_>>());
        assert!(k(&[1]) < k(&[1, 1]));
        assert!(k(&[1, 9223372036854775807]) < k(&[2]));
        assert!(k(&[1, 2]) < k(&[1, 3]));
        assert!(k(&[1, 3]) < k(&[2, 2]));
    }

    #[test]
    fn test_composite_key_roundtrip() {
        let vals = vec![
            Value::Integer(1),
            Value::Text("x".into()),
            Value::Boolean(true),
        ];
        let bytes = encode_key(&vals);
        assert_eq!(decode_key(&bytes).unwrap(), vals);
    }

    #[test]
    fn test_exclusive_bound_trick() {
        // key ++ DELIM ++ 0xFF sorts after every extension of key and
        // before the next distinct key.
        let base = encode_key(&[Value::Integer(1)]);
        let mut bound = base.clone();
        bound.push(ARRAY_VALUE_DELIM);
        bound.push(0xFF);

        let ext = encode_key(&[Value::Integer(1), Value::Integer(i64::MAX)]);
        let next = encode_key(&[Value::Integer(2)]);
        assert!(base < bound);
        assert!(ext < bound);
        assert!(bound < next);
    }

    #[test]
    fn test_double_fraction_granularity() {
        // Fractions survive key encoding at 1/256 granularity and
        // re-encode to the same bytes.
        let v = Value::Double(2.5);
        let decoded = roundtrip(&v);
        assert_eq!(decoded, Value::Double(2.5));
        assert_eq!(enc(&decoded), enc(&v));

        // Whole doubles normalize to integers.
        assert_eq!(roundtrip(&Value::Double(3.0)), Value::Integer(3));
    }
}
