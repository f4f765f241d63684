//! Objects and paths.
//!
//! An object is an ordered mapping from field name to value, iterable in
//! definition order. Rows are objects; nested objects and arrays are
//! ordinary values. A `Path` addresses a leaf or sub-object inside one.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value::Value;

/// An ordered field-name/value mapping.
#[derive(Debug, Clone, Default)]
pub struct Object {
    fields: Vec<(String, Value)>,
}

impl Object {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Creates an object from field/value pairs, keeping their order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            fields: pairs.into_iter().collect(),
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// Returns the value of `field`, failing with `FieldNotFound`.
    pub fn get_by_field(&self, field: &str) -> Result<&Value> {
        self.get(field)
            .ok_or_else(|| Error::FieldNotFound(field.to_string()))
    }

    /// Sets `field` to `value`, replacing in place or appending.
    pub fn set(&mut self, field: &str, value: Value) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, v)) => *v = value,
            None => self.fields.push((field.to_string(), value)),
        }
    }

    /// Removes `field`, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(idx).1)
    }

    /// Iterates fields in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Compares two objects by sorted field name, then value.
    pub fn compare(&self, other: &Object) -> Option<Ordering> {
        let mut a: Vec<_> = self.fields.iter().collect();
        let mut b: Vec<_> = other.fields.iter().collect();
        a.sort_by(|x, y| x.0.cmp(&y.0));
        b.sort_by(|x, y| x.0.cmp(&y.0));

        for ((an, av), (bn, bv)) in a.iter().zip(b.iter()) {
            match an.cmp(bn) {
                Ordering::Equal => {}
                non_eq => return Some(non_eq),
            }
            match av.total_cmp(bv) {
                Ordering::Equal => {}
                non_eq => return Some(non_eq),
            }
        }
        Some(a.len().cmp(&b.len()))
    }

    /// Converts to a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Returns the value at `path`, if the whole path resolves.
    pub fn get_path(&self, path: &Path) -> Option<&Value> {
        let mut current: Option<&Value> = None;
        for (i, step) in path.steps().iter().enumerate() {
            current = match (i, step, current) {
                (0, PathStep::Field(name), _) => self.get(name),
                (_, PathStep::Field(name), Some(Value::Object(obj))) => obj.get(name),
                (_, PathStep::Index(idx), Some(Value::Array(arr))) => arr.get(*idx),
                _ => None,
            };
            current?;
        }
        current
    }

    /// Sets the value at `path`, failing when an intermediate step is
    /// missing or of the wrong kind. A missing final field is created.
    pub fn set_path(&mut self, path: &Path, value: Value) -> Result<()> {
        set_path_steps(self, path.steps(), value)
            .map_err(|_| Error::FieldNotFound(path.to_string()))
    }

    /// Removes the value at `path`; missing paths are a no-op.
    pub fn unset_path(&mut self, path: &Path) {
        let steps = path.steps();
        if steps.len() == 1 {
            if let PathStep::Field(name) = &steps[0] {
                self.remove(name);
            }
            return;
        }
        if let Some(PathStep::Field(first)) = steps.first() {
            if let Some((_, v)) = self.fields.iter_mut().find(|(n, _)| n == first) {
                unset_value_steps(v, &steps[1..]);
            }
        }
    }
}

fn set_path_steps(obj: &mut Object, steps: &[PathStep], value: Value) -> std::result::Result<(), ()> {
    match steps {
        [PathStep::Field(name)] => {
            obj.set(name, value);
            Ok(())
        }
        [PathStep::Field(name), rest @ ..] => {
            let slot = obj
                .fields
                .iter_mut()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or(())?;
            set_value_steps(slot, rest, value)
        }
        _ => Err(()),
    }
}

fn set_value_steps(
    slot: &mut Value,
    steps: &[PathStep],
    value: Value,
) -> std::result::Result<(), ()> {
    match steps {
        [] => {
            *slot = value;
            Ok(())
        }
        [PathStep::Field(name), rest @ ..] => match slot {
            Value::Object(obj) => {
                if rest.is_empty() {
                    obj.set(name, value);
                    Ok(())
                } else {
                    let inner = obj
                        .fields
                        .iter_mut()
                        .find(|(n, _)| n == name)
                        .map(|(_, v)| v)
                        .ok_or(())?;
                    set_value_steps(inner, rest, value)
                }
            }
            _ => Err(()),
        },
        [PathStep::Index(idx), rest @ ..] => match slot {
            Value::Array(arr) => {
                let inner = arr.get_mut(*idx).ok_or(())?;
                set_value_steps(inner, rest, value)
            }
            _ => Err(()),
        },
    }
}

fn unset_value_steps(slot: &mut Value, steps: &[PathStep]) {
    match steps {
        [PathStep::Field(name)] => {
            if let Value::Object(obj) = slot {
                obj.remove(name);
            }
        }
        [PathStep::Field(name), rest @ ..] => {
            if let Value::Object(obj) = slot {
                if let Some((_, v)) = obj.fields.iter_mut().find(|(n, _)| n == name) {
                    unset_value_steps(v, rest);
                }
            }
        }
        [PathStep::Index(idx), rest @ ..] => {
            if let Value::Array(arr) = slot {
                if rest.is_empty() {
                    if *idx < arr.len() {
                        arr.remove(*idx);
                    }
                } else if let Some(v) = arr.get_mut(*idx) {
                    unset_value_steps(v, rest);
                }
            }
        }
        [] => {}
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

/// One step of a path: a field name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Field(String),
    Index(usize),
}

/// A dotted path into an object, e.g. `address.lines[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// Builds a path from explicit steps.
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Builds a single-field path.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            steps: vec![PathStep::Field(name.into())],
        }
    }

    /// The steps of this path.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// The leading field name, when the path starts with one.
    pub fn root_field(&self) -> Option<&str> {
        match self.steps.first() {
            Some(PathStep::Field(name)) => Some(name),
            _ => None,
        }
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for part in s.split('.') {
            if part.is_empty() {
                return Err(Error::Parse(format!("invalid path: {s:?}")));
            }
            // Each dotted part may carry [n] index suffixes.
            let mut rest = part;
            let field_end = rest.find('[').unwrap_or(rest.len());
            if field_end > 0 {
                steps.push(PathStep::Field(rest[..field_end].to_string()));
            }
            rest = &rest[field_end..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped
                    .find(']')
                    .ok_or_else(|| Error::Parse(format!("invalid path: {s:?}")))?;
                let idx = stripped[..close]
                    .parse::<usize>()
                    .map_err(|_| Error::Parse(format!("invalid path: {s:?}")))?;
                steps.push(PathStep::Index(idx));
                rest = &stripped[close + 1..];
            }
            if !rest.is_empty() {
                return Err(Error::Parse(format!("invalid path: {s:?}")));
            }
        }
        if steps.is_empty() {
            return Err(Error::Parse(format!("invalid path: {s:?}")));
        }
        Ok(Path { steps })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            match step {
                PathStep::Field(name) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathStep::Index(idx) => write!(f, "[{idx}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Value)]) -> Object {
        Object::from_pairs(pairs.iter().map(|(n, v)| (n.to_string(), v.clone())))
    }

    #[test]
    fn test_field_order_is_preserved() {
        let o = obj(&[("b", Value::Integer(1)), ("a", Value::Integer(2))]);
        let names: Vec<_> = o.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_get_by_field_missing() {
        let o = obj(&[("a", Value::Integer(1))]);
        assert!(matches!(
            o.get_by_field("nope"),
            Err(Error::FieldNotFound(_))
        ));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut o = obj(&[("a", Value::Integer(1)), ("b", Value::Integer(2))]);
        o.set("a", Value::Integer(10));
        assert_eq!(o.get("a"), Some(&Value::Integer(10)));
        let names: Vec<_> = o.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_equality_ignores_field_order() {
        let a = obj(&[("x", Value::Integer(1)), ("y", Value::Integer(2))]);
        let b = obj(&[("y", Value::Integer(2)), ("x", Value::Integer(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_parse_and_display() {
        let p: Path = "a.b[0].c".parse().unwrap();
        assert_eq!(p.steps().len(), 4);
        assert_eq!(p.to_string(), "a.b[0].c");
        assert!("".parse::<Path>().is_err());
        assert!("a[".parse::<Path>().is_err());
    }

    #[test]
    fn test_get_path_nested() {
        let inner = obj(&[("c", Value::Integer(42))]);
        let o = obj(&[(
            "a",
            Value::Array(vec![Value::Object(inner)]),
        )]);
        let p: Path = "a[0].c".parse().unwrap();
        assert_eq!(o.get_path(&p), Some(&Value::Integer(42)));

        let missing: Path = "a[1].c".parse().unwrap();
        assert_eq!(o.get_path(&missing), None);
    }

    #[test]
    fn test_set_path_creates_final_field() {
        let mut o = obj(&[("a", Value::Object(Object::new()))]);
        let p: Path = "a.b".parse().unwrap();
        o.set_path(&p, Value::Integer(1)).unwrap();
        assert_eq!(o.get_path(&p), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_set_path_missing_intermediate_fails() {
        let mut o = Object::new();
        let p: Path = "a.b".parse().unwrap();
        assert!(o.set_path(&p, Value::Integer(1)).is_err());
    }

    #[test]
    fn test_unset_path() {
        let mut o = obj(&[("a", Value::Integer(1)), ("b", Value::Integer(2))]);
        o.unset_path(&Path::field("a"));
        assert_eq!(o.get("a"), None);
        assert_eq!(o.len(), 1);
        // Unsetting a missing path is a no-op.
        o.unset_path(&Path::field("zzz"));
        assert_eq!(o.len(), 1);
    }
}
