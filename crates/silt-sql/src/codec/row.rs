//! Row body encoding and lazy decoding.
//!
//! Row bodies use an exact tagged binary form, unrelated to key order:
//! a marker byte, a field count, then length-prefixed names and tagged
//! values with full-precision payloads. The empty document encodes as the
//! single byte `0x00`, which doubles as the tombstone-style value stored
//! for index entries.
//!
//! `LazyRow` wraps encoded bytes and defers decoding until the first field
//! access; the decoded object is memoized and never handed out mutably.

use bytes::Bytes;
use once_cell::unsync::OnceCell;

use crate::error::{Error, Result};
use crate::object::Object;
use crate::value::Value;

const MARKER_EMPTY: u8 = 0x00;
const MARKER_OBJECT: u8 = 0x01;

const TAG_NULL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_INTEGER: u8 = 2;
const TAG_DOUBLE: u8 = 3;
const TAG_TIMESTAMP: u8 = 4;
const TAG_TEXT: u8 = 5;
const TAG_BLOB: u8 = 6;
const TAG_ARRAY: u8 = 7;
const TAG_OBJECT: u8 = 8;

/// Encodes an object to its row-body form.
pub fn encode_object(obj: &Object) -> Vec<u8> {
    if obj.is_empty() {
        return vec![MARKER_EMPTY];
    }
    let mut buf = Vec::with_capacity(64);
    buf.push(MARKER_OBJECT);
    write_fields(&mut buf, obj);
    buf
}

/// Decodes a row body back into an object.
pub fn decode_object(bytes: &[u8]) -> Result<Object> {
    match bytes.first() {
        Some(&MARKER_EMPTY) => Ok(Object::new()),
        Some(&MARKER_OBJECT) => {
            let mut pos = 1;
            read_fields(bytes, &mut pos)
        }
        _ => Err(corrupt("bad row marker")),
    }
}

fn write_fields(buf: &mut Vec<u8>, obj: &Object) {
    buf.extend_from_slice(&(obj.len() as u32).to_le_bytes());
    for (name, value) in obj.iter() {
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        write_value(buf, value);
    }
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(*b as u8);
        }
        Value::Integer(i) => {
            buf.push(TAG_INTEGER);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Double(d) => {
            buf.push(TAG_DOUBLE);
            buf.extend_from_slice(&d.to_le_bytes());
        }
        Value::Timestamp(ns) => {
            buf.push(TAG_TIMESTAMP);
            buf.extend_from_slice(&ns.to_le_bytes());
        }
        Value::Text(s) => {
            buf.push(TAG_TEXT);
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Blob(b) => {
            buf.push(TAG_BLOB);
            buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
            buf.extend_from_slice(b);
        }
        Value::Array(vals) => {
            buf.push(TAG_ARRAY);
            buf.extend_from_slice(&(vals.len() as u32).to_le_bytes());
            for v in vals {
                write_value(buf, v);
            }
        }
        Value::Object(obj) => {
            buf.push(TAG_OBJECT);
            write_fields(buf, obj);
        }
    }
}

fn read_fields(bytes: &[u8], pos: &mut usize) -> Result<Object> {
    let count = read_u32(bytes, pos)? as usize;
    let mut obj = Object::new();
    for _ in 0..count {
        let name_len = read_u32(bytes, pos)? as usize;
        let name = std::str::from_utf8(read_slice(bytes, pos, name_len)?)
            .map_err(|_| corrupt("invalid utf-8 in field name"))?
            .to_string();
        let value = read_value(bytes, pos)?;
        obj.set(&name, value);
    }
    Ok(obj)
}

fn read_value(bytes: &[u8], pos: &mut usize) -> Result<Value> {
    let tag = *bytes.get(*pos).ok_or_else(|| corrupt("truncated value"))?;
    *pos += 1;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOLEAN => {
            let b = *bytes.get(*pos).ok_or_else(|| corrupt("short boolean"))?;
            *pos += 1;
            Ok(Value::Boolean(b != 0))
        }
        TAG_INTEGER => Ok(Value::Integer(i64::from_le_bytes(
            read_slice(bytes, pos, 8)?.try_into().unwrap(),
        ))),
        TAG_DOUBLE => Ok(Value::Double(f64::from_le_bytes(
            read_slice(bytes, pos, 8)?.try_into().unwrap(),
        ))),
        TAG_TIMESTAMP => Ok(Value::Timestamp(i64::from_le_bytes(
            read_slice(bytes, pos, 8)?.try_into().unwrap(),
        ))),
        TAG_TEXT => {
            let len = read_u32(bytes, pos)? as usize;
            let s = std::str::from_utf8(read_slice(bytes, pos, len)?)
                .map_err(|_| corrupt("invalid utf-8 in text"))?
                .to_string();
            Ok(Value::Text(s))
        }
        TAG_BLOB => {
            let len = read_u32(bytes, pos)? as usize;
            Ok(Value::Blob(read_slice(bytes, pos, len)?.to_vec()))
        }
        TAG_ARRAY => {
            let count = read_u32(bytes, pos)? as usize;
            let mut vals = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                vals.push(read_value(bytes, pos)?);
            }
            Ok(Value::Array(vals))
        }
        TAG_OBJECT => Ok(Value::Object(read_fields(bytes, pos)?)),
        t => Err(corrupt(&format!("unknown row tag {t}"))),
    }
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32> {
    let slice = read_slice(bytes, pos, 4)?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_slice<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|&e| e <= bytes.len())
        .ok_or_else(|| corrupt("truncated row"))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn corrupt(msg: &str) -> Error {
    Error::Type(format!("corrupt row encoding: {msg}"))
}

/// A row body that decodes itself on first access.
///
/// Equality and hashing of encoded rows happen on the raw bytes; the
/// decoded object is cached and only exposed behind a shared reference.
#[derive(Debug, Clone)]
pub struct LazyRow {
    encoded: Bytes,
    decoded: OnceCell<Object>,
}

impl LazyRow {
    /// Wraps encoded row bytes without decoding them.
    pub fn from_encoded(encoded: Bytes) -> Self {
        Self {
            encoded,
            decoded: OnceCell::new(),
        }
    }

    /// Wraps an already-decoded object.
    pub fn from_object(obj: Object) -> Self {
        let encoded = Bytes::from(encode_object(&obj));
        let decoded = OnceCell::new();
        let _ = decoded.set(obj);
        Self { encoded, decoded }
    }

    /// The raw encoded bytes.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// The decoded object, decoding and memoizing on first call.
    pub fn object(&self) -> Result<&Object> {
        self.decoded
            .get_or_try_init(|| decode_object(&self.encoded))
    }

    /// A mutable copy of the object; the cached decode stays untouched.
    pub fn to_object(&self) -> Result<Object> {
        self.object().cloned()
    }
}

impl PartialEq for LazyRow {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}
