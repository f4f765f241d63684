//! Runtime values.
//!
//! `Value` is the tagged variant every row field, key element and
//! expression result is made of. All variants are totally ordered across
//! types (null < boolean < number < timestamp < text < blob < array <
//! object); integers and doubles share one numeric order with no
//! type-based tie-break.

use std::cmp::Ordering;
use std::fmt;

use serde_json::json;

use crate::error::{Error, Result};
use crate::object::Object;

/// The type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    /// Absence of a resolved type; used only in unresolved positions.
    Any,
    Null,
    Boolean,
    Integer,
    Double,
    Timestamp,
    Text,
    Blob,
    Array,
    Object,
}

impl ValueKind {
    /// Returns true for the numeric kinds, which share one order.
    pub fn is_number(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Double)
    }

    /// Returns true if this kind is `Any`.
    pub fn is_any(&self) -> bool {
        matches!(self, ValueKind::Any)
    }

    /// Cross-type sort rank; numbers collapse to one rank.
    fn rank(&self) -> u8 {
        match self {
            ValueKind::Any => 0,
            ValueKind::Null => 1,
            ValueKind::Boolean => 2,
            ValueKind::Integer | ValueKind::Double => 3,
            ValueKind::Timestamp => 4,
            ValueKind::Text => 5,
            ValueKind::Blob => 6,
            ValueKind::Array => 7,
            ValueKind::Object => 8,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Any => "any",
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Double => "double",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Text => "text",
            ValueKind::Blob => "blob",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    /// Nanoseconds since the Unix epoch.
    Timestamp(i64),
    Text(String),
    Blob(Vec<u8>),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Double(_) => ValueKind::Double,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Text(_) => ValueKind::Text,
            Value::Blob(_) => ValueKind::Blob,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value counts as true in a filter position.
    /// NULL is not truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::Timestamp(_) => true,
            Value::Text(s) => !s.is_empty(),
            Value::Blob(b) => !b.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => o.len() != 0,
        }
    }

    /// Returns the numeric view of this value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the integer view of this value, if exact.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
            _ => None,
        }
    }

    /// Compares two values, or None when their kinds are not comparable.
    /// Numbers of either kind compare numerically.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => compare_arrays(a, b),
            (Value::Object(a), Value::Object(b)) => a.compare(b),
            (a, b) if a.kind().is_number() && b.kind().is_number() => {
                // Mixed integer/double comparison goes through f64; exact
                // for every double and for integers up to 2^53.
                a.as_f64().unwrap().partial_cmp(&b.as_f64().unwrap())
            }
            _ => None,
        }
    }

    /// Total order across all kinds: values of different kinds order by
    /// kind rank, same-kind (and any two numbers) order by `compare`.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        let (ra, rb) = (self.kind().rank(), other.kind().rank());
        if ra != rb {
            return ra.cmp(&rb);
        }
        self.compare(other).unwrap_or(Ordering::Equal)
    }

    /// Converts this value to `target`, or fails with a type error.
    pub fn cast(&self, target: ValueKind) -> Result<Value> {
        if self.kind() == target || target == ValueKind::Any {
            return Ok(self.clone());
        }
        if self.is_null() {
            return Ok(Value::Null);
        }

        let fail = || {
            Error::Type(format!(
                "cannot convert {} to {}",
                self.kind(),
                target
            ))
        };

        match target {
            ValueKind::Boolean => match self {
                Value::Integer(0) => Ok(Value::Boolean(false)),
                Value::Integer(1) => Ok(Value::Boolean(true)),
                _ => Err(fail()),
            },
            ValueKind::Integer => match self {
                Value::Boolean(b) => Ok(Value::Integer(*b as i64)),
                Value::Double(d) if d.fract() == 0.0 && d.is_finite() => {
                    Ok(Value::Integer(*d as i64))
                }
                Value::Double(_) => Err(fail()),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| fail()),
                _ => Err(fail()),
            },
            ValueKind::Double => match self {
                Value::Integer(i) => Ok(Value::Double(*i as f64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| fail()),
                _ => Err(fail()),
            },
            ValueKind::Timestamp => match self {
                Value::Integer(ns) => Ok(Value::Timestamp(*ns)),
                Value::Text(s) => parse_timestamp(s).ok_or_else(fail),
                _ => Err(fail()),
            },
            ValueKind::Text => match self {
                Value::Array(_) | Value::Object(_) => Err(fail()),
                Value::Text(s) => Ok(Value::Text(s.clone())),
                other => Ok(Value::Text(other.raw_text())),
            },
            ValueKind::Blob => match self {
                Value::Text(s) => Ok(Value::Blob(s.as_bytes().to_vec())),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        }
    }

    /// Converts this value to a JSON value. Blobs become hex strings,
    /// timestamps integer nanoseconds.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => json!(b),
            Value::Integer(i) => json!(i),
            Value::Double(d) => json!(d),
            Value::Timestamp(ns) => json!(ns),
            Value::Text(s) => json!(s),
            Value::Blob(b) => json!(hex_string(b)),
            Value::Array(vals) => {
                serde_json::Value::Array(vals.iter().map(Value::to_json).collect())
            }
            Value::Object(obj) => obj.to_json(),
        }
    }

    /// The unquoted textual form, used by casts to text.
    fn raw_text(&self) -> String {
        match self {
            Value::Null => "NULL".into(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Timestamp(ns) => ns.to_string(),
            Value::Text(s) => s.clone(),
            Value::Blob(b) => hex_string(b),
            other => other.to_string(),
        }
    }
}

fn compare_arrays(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.total_cmp(y) {
            Ordering::Equal => continue,
            non_eq => return Some(non_eq),
        }
    }
    Some(a.len().cmp(&b.len()))
}

fn parse_timestamp(s: &str) -> Option<Value> {
    use chrono::DateTime;
    let dt = DateTime::parse_from_rfc3339(s.trim()).ok()?;
    Some(Value::Timestamp(dt.timestamp_nanos_opt()?))
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Timestamp(ns) => write!(f, "{ns}"),
            Value::Text(s) => write!(f, "\"{s}\""),
            Value::Blob(b) => write!(f, "\"{}\"", hex_string(b)),
            Value::Array(vals) => {
                write!(f, "[")?;
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "{obj}"),
        }
    }
}
