//! Trees: typed ordered key-value views.
//!
//! A tree layers composite typed keys and lazily decoded row bodies over
//! one namespace of the byte store. Tables and indexes are both trees.
//! A transient tree (used by sorting) keeps its entries in private memory,
//! supports only put and iterate, and omits the namespace prefix.
//!
//! Range iteration translates a typed `Range` to byte bounds:
//!
//! | SQL form | Range                | lower           | upper           |
//! |----------|----------------------|-----------------|-----------------|
//! | `= k`    | min=max=k, exact     | `P‖k`           | `P‖k‖D‖0xFF`    |
//! | `>= k`   | min=k                | `P‖k`           | namespace end   |
//! | `> k`    | min=k, exclusive     | `P‖k‖D‖0xFF`    | namespace end   |
//! | `<= k`   | max=k                | `P`             | `P‖k‖D‖0xFF`    |
//! | `< k`    | max=k, exclusive     | `P`             | `P‖k`           |
//!
//! The same formulas widen partial composite keys: a bound of `[1]`
//! against an index on `(a, b)` covers every key extending `[1]`, because
//! `P‖enc(1)‖D‖0xFF` sorts after every such extension.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use once_cell::unsync::OnceCell;
use silt_storage::{NamespaceId, ScanBounds, Transaction};

use crate::codec::key as keycodec;
use crate::codec::row::{self, LazyRow};
use crate::error::{Error, Result};
use crate::object::{Object, Path};
use crate::value::Value;

/// A composite tree key: a sequence of values whose encoding preserves
/// their order byte-wise. Decoding back to values is lazy.
#[derive(Debug, Clone)]
pub struct Key {
    encoded: Vec<u8>,
    values: OnceCell<Vec<Value>>,
}

impl Key {
    /// Builds a key from its values.
    pub fn from_values(values: Vec<Value>) -> Self {
        let encoded = keycodec::encode_key(&values);
        let cell = OnceCell::new();
        let _ = cell.set(values);
        Self {
            encoded,
            values: cell,
        }
    }

    /// Wraps already-encoded key bytes (without namespace prefix).
    pub fn from_encoded(encoded: Vec<u8>) -> Self {
        Self {
            encoded,
            values: OnceCell::new(),
        }
    }

    /// The encoded form, without namespace prefix.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// The decoded values, decoding and memoizing on first call.
    pub fn values(&self) -> Result<&[Value]> {
        self.values
            .get_or_try_init(|| keycodec::decode_key(&self.encoded))
            .map(|v| v.as_slice())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for Key {}

/// A slice of a tree's key space. Unset bounds are open; `exact` marks a
/// point (or prefix) lookup where min and max are the same key. `paths`
/// carries the key column list for display and planning.
#[derive(Debug, Clone, Default)]
pub struct Range {
    pub min: Option<Vec<Value>>,
    pub max: Option<Vec<Value>>,
    pub exclusive: bool,
    pub exact: bool,
    pub paths: Vec<Path>,
}

impl Range {
    /// An equality range: min = max = `values`, exact.
    pub fn exact(values: Vec<Value>, paths: Vec<Path>) -> Self {
        Self {
            min: Some(values.clone()),
            max: Some(values),
            exclusive: false,
            exact: true,
            paths,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_bound = |vals: &[Value]| {
            let parts: Vec<String> = vals.iter().map(|v| v.to_string()).collect();
            format!("[{}]", parts.join(", "))
        };
        write!(f, "{{")?;
        let mut wrote = false;
        if let Some(min) = &self.min {
            write!(f, "\"min\": {}", fmt_bound(min))?;
            wrote = true;
        }
        if let Some(max) = &self.max {
            if wrote {
                write!(f, ", ")?;
            }
            write!(f, "\"max\": {}", fmt_bound(max))?;
            wrote = true;
        }
        if self.exclusive {
            if wrote {
                write!(f, ", ")?;
            }
            write!(f, "\"exclusive\": true")?;
        }
        write!(f, "}}")
    }
}

enum Backing<'a> {
    Namespace {
        tx: &'a Transaction,
        ns: NamespaceId,
    },
    Transient(RefCell<BTreeMap<Vec<u8>, Vec<u8>>>),
}

/// A typed ordered view over one namespace (or over transient memory).
pub struct Tree<'a> {
    backing: Backing<'a>,
}

impl<'a> Tree<'a> {
    /// A tree over `ns` within the given transaction.
    pub fn new(tx: &'a Transaction, ns: NamespaceId) -> Self {
        Self {
            backing: Backing::Namespace { tx, ns },
        }
    }

    /// A transient in-memory tree; supports only put and iterate.
    pub fn transient() -> Self {
        Self {
            backing: Backing::Transient(RefCell::new(BTreeMap::new())),
        }
    }

    fn build_key(&self, key: &Key) -> Vec<u8> {
        match &self.backing {
            Backing::Namespace { ns, .. } => ns.build_key(key.encoded()),
            Backing::Transient(_) => key.encoded().to_vec(),
        }
    }

    /// Stores `obj` at `key`, replacing any existing value. `None` writes
    /// the single-byte tombstone-style empty doc used by index entries.
    pub fn put(&self, key: &Key, obj: Option<&Object>) -> Result<()> {
        let value = match obj {
            Some(obj) => row::encode_object(obj),
            None => vec![0x00],
        };
        match &self.backing {
            Backing::Namespace { tx, .. } => {
                tx.put(self.build_key(key), value)?;
            }
            Backing::Transient(map) => {
                map.borrow_mut().insert(self.build_key(key), value);
            }
        }
        Ok(())
    }

    /// Returns the row at `key`, or `KeyNotFound`.
    pub fn get(&self, key: &Key) -> Result<LazyRow> {
        match &self.backing {
            Backing::Namespace { tx, .. } => match tx.get(&self.build_key(key)) {
                Some(bytes) => Ok(LazyRow::from_encoded(Bytes::from(bytes))),
                None => Err(Error::Storage(silt_storage::StorageError::KeyNotFound)),
            },
            Backing::Transient(_) => {
                Err(Error::Runtime("get is not supported on a transient tree".into()))
            }
        }
    }

    /// Returns whether `key` exists.
    pub fn exists(&self, key: &Key) -> Result<bool> {
        match &self.backing {
            Backing::Namespace { tx, .. } => Ok(tx.exists(&self.build_key(key))),
            Backing::Transient(_) => Err(Error::Runtime(
                "exists is not supported on a transient tree".into(),
            )),
        }
    }

    /// Deletes `key`, or fails with `KeyNotFound`.
    pub fn delete(&self, key: &Key) -> Result<()> {
        match &self.backing {
            Backing::Namespace { tx, .. } => {
                let full = self.build_key(key);
                if !tx.exists(&full) {
                    return Err(Error::Storage(silt_storage::StorageError::KeyNotFound));
                }
                tx.delete(&full)?;
                Ok(())
            }
            Backing::Transient(_) => Err(Error::Runtime(
                "delete is not supported on a transient tree".into(),
            )),
        }
    }

    /// Removes every key in the namespace.
    pub fn truncate(&self) -> Result<()> {
        match &self.backing {
            Backing::Namespace { tx, ns } => {
                let bounds = ScanBounds {
                    lower: ns.prefix().to_vec(),
                    upper: ns.upper_bound(),
                };
                for (key, _) in tx.scan(&bounds, false) {
                    tx.delete(&key)?;
                }
                Ok(())
            }
            Backing::Transient(map) => {
                map.borrow_mut().clear();
                Ok(())
            }
        }
    }

    /// Computes the byte bounds of `range` per the table in the module
    /// docs. Bounds are half-open: lower inclusive, upper exclusive.
    fn bounds(&self, range: &Range) -> ScanBounds {
        let (prefix, ns_upper) = match &self.backing {
            Backing::Namespace { ns, .. } => (ns.prefix().to_vec(), ns.upper_bound()),
            // Transient keys carry no prefix; every encoded key starts
            // with a type tag below 0xFF.
            Backing::Transient(_) => (Vec::new(), vec![0xFF]),
        };

        let lower = match &range.min {
            None => prefix.clone(),
            Some(min) => {
                let mut buf = prefix.clone();
                buf.extend_from_slice(&keycodec::encode_key(min));
                if range.exclusive {
                    buf.push(keycodec::ARRAY_VALUE_DELIM);
                    buf.push(0xFF);
                }
                buf
            }
        };

        let upper = match &range.max {
            None => ns_upper,
            Some(max) => {
                let mut buf = prefix;
                buf.extend_from_slice(&keycodec::encode_key(max));
                if !range.exclusive {
                    buf.push(keycodec::ARRAY_VALUE_DELIM);
                    buf.push(0xFF);
                }
                buf
            }
        };

        ScanBounds { lower, upper }
    }

    /// Visits every `(key, row)` in `range`, ascending, or descending when
    /// `reverse` is set.
    pub fn iterate_on_range(
        &self,
        range: &Range,
        reverse: bool,
        mut f: impl FnMut(Key, LazyRow) -> Result<()>,
    ) -> Result<()> {
        let bounds = self.bounds(range);
        match &self.backing {
            Backing::Namespace { tx, ns } => {
                for (full_key, value) in tx.scan(&bounds, reverse) {
                    let key = Key::from_encoded(ns.trim_key(&full_key).to_vec());
                    f(key, LazyRow::from_encoded(Bytes::from(value)))?;
                }
            }
            Backing::Transient(map) => {
                let snapshot: Vec<(Vec<u8>, Vec<u8>)> = {
                    let map = map.borrow();
                    let iter = map.range(bounds.lower..bounds.upper);
                    if reverse {
                        iter.rev().map(|(k, v)| (k.clone(), v.clone())).collect()
                    } else {
                        iter.map(|(k, v)| (k.clone(), v.clone())).collect()
                    }
                };
                for (key, value) in snapshot {
                    f(
                        Key::from_encoded(key),
                        LazyRow::from_encoded(Bytes::from(value)),
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silt_storage::Store;

    fn int_key(vals: &[i64]) -> Key {
        Key::from_values(vals.iter().map(|&i| Value::Integer(i)).collect())
    }

    fn obj(i: i64) -> Object {
        Object::from_pairs(vec![("v".to_string(), Value::Integer(i))])
    }

    fn collect(tree: &Tree, range: &Range, reverse: bool) -> Vec<Vec<Value>> {
        let mut out = Vec::new();
        tree.iterate_on_range(range, reverse, |key, _| {
            out.push(key.values().unwrap().to_vec());
            Ok(())
        })
        .unwrap();
        out
    }

    fn ints(got: Vec<Vec<Value>>) -> Vec<Vec<i64>> {
        got.into_iter()
            .map(|vals| {
                vals.into_iter()
                    .map(|v| match v {
                        Value::Integer(i) => i,
                        other => panic!("unexpected {other:?}"),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_put_get_delete() {
        let store = Store::open_in_memory();
        let tx = store.begin(false);
        let tree = Tree::new(&tx, NamespaceId(10));

        let key = int_key(&[1]);
        tree.put(&key, Some(&obj(10))).unwrap();
        assert!(tree.exists(&key).unwrap());

        let row = tree.get(&key).unwrap();
        assert_eq!(row.object().unwrap().get("v"), Some(&Value::Integer(10)));

        tree.delete(&key).unwrap();
        assert!(!tree.exists(&key).unwrap());
        assert!(tree.get(&key).unwrap_err().is_key_not_found());
        assert!(tree.delete(&key).unwrap_err().is_key_not_found());
    }

    #[test]
    fn test_put_replaces() {
        let store = Store::open_in_memory();
        let tx = store.begin(false);
        let tree = Tree::new(&tx, NamespaceId(10));

        let key = int_key(&[1]);
        tree.put(&key, Some(&obj(1))).unwrap();
        tree.put(&key, Some(&obj(2))).unwrap();
        let row = tree.get(&key).unwrap();
        assert_eq!(row.object().unwrap().get("v"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = Store::open_in_memory();
        let tx = store.begin(false);
        let a = Tree::new(&tx, NamespaceId(1));
        let b = Tree::new(&tx, NamespaceId(2));

        a.put(&int_key(&[1]), Some(&obj(1))).unwrap();
        b.put(&int_key(&[2]), Some(&obj(2))).unwrap();

        assert_eq!(ints(collect(&a, &Range::default(), false)), vec![vec![1]]);
        assert_eq!(ints(collect(&b, &Range::default(), false)), vec![vec![2]]);

        a.truncate().unwrap();
        assert!(collect(&a, &Range::default(), false).is_empty());
        assert_eq!(ints(collect(&b, &Range::default(), false)), vec![vec![2]]);
    }

    fn seeded_tree(tx: &Transaction) -> Tree<'_> {
        let tree = Tree::new(tx, NamespaceId(5));
        for i in [1, 2, 3, 4, 5] {
            tree.put(&int_key(&[i]), Some(&obj(i))).unwrap();
        }
        tree
    }

    #[test]
    fn test_range_semantics() {
        let store = Store::open_in_memory();
        let tx = store.begin(false);
        let tree = seeded_tree(&tx);

        let min = |v: i64, excl: bool| Range {
            min: Some(vec![Value::Integer(v)]),
            exclusive: excl,
            ..Default::default()
        };
        let max = |v: i64, excl: bool| Range {
            max: Some(vec![Value::Integer(v)]),
            exclusive: excl,
            ..Default::default()
        };

        // >= 3, > 3, <= 3, < 3, = 3
        assert_eq!(ints(collect(&tree, &min(3, false), false)), vec![vec![3], vec![4], vec![5]]);
        assert_eq!(ints(collect(&tree, &min(3, true), false)), vec![vec![4], vec![5]]);
        assert_eq!(ints(collect(&tree, &max(3, false), false)), vec![vec![1], vec![2], vec![3]]);
        assert_eq!(ints(collect(&tree, &max(3, true), false)), vec![vec![1], vec![2]]);
        let eq = Range::exact(vec![Value::Integer(3)], vec![]);
        assert_eq!(ints(collect(&tree, &eq, false)), vec![vec![3]]);
    }

    #[test]
    fn test_reverse_iteration() {
        let store = Store::open_in_memory();
        let tx = store.begin(false);
        let tree = seeded_tree(&tx);

        let range = Range {
            min: Some(vec![Value::Integer(2)]),
            max: Some(vec![Value::Integer(4)]),
            ..Default::default()
        };
        assert_eq!(
            ints(collect(&tree, &range, true)),
            vec![vec![4], vec![3], vec![2]]
        );
    }

    #[test]
    fn test_partial_composite_range_widens() {
        let store = Store::open_in_memory();
        let tx = store.begin(false);
        let tree = Tree::new(&tx, NamespaceId(9));

        for (a, b) in [(1, 1), (2, 2), (1, i64::MAX)] {
            tree.put(&int_key(&[a, b]), Some(&obj(a))).unwrap();
        }

        // An exact range on [1] against keys (a, b) covers both rows with
        // a = 1, including b = i64::MAX.
        let range = Range::exact(vec![Value::Integer(1)], vec![]);
        assert_eq!(
            ints(collect(&tree, &range, false)),
            vec![vec![1, 1], vec![1, i64::MAX]]
        );

        // min [1] exclusive skips every (1, *).
        let range = Range {
            min: Some(vec![Value::Integer(1)]),
            exclusive: true,
            ..Default::default()
        };
        assert_eq!(ints(collect(&tree, &range, false)), vec![vec![2, 2]]);

        // max [1] inclusive keeps every (1, *).
        let range = Range {
            max: Some(vec![Value::Integer(1)]),
            ..Default::default()
        };
        assert_eq!(
            ints(collect(&tree, &range, false)),
            vec![vec![1, 1], vec![1, i64::MAX]]
        );
    }

    #[test]
    fn test_iteration_is_monotonic() {
        let store = Store::open_in_memory();
        let tx = store.begin(false);
        let tree = seeded_tree(&tx);

        let mut last: Option<Vec<u8>> = None;
        tree.iterate_on_range(&Range::default(), false, |key, _| {
            if let Some(prev) = &last {
                assert!(prev.as_slice() < key.encoded());
            }
            last = Some(key.encoded().to_vec());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_transient_tree_put_iterate() {
        let tree = Tree::transient();
        for i in [3, 1, 2] {
            tree.put(&int_key(&[i]), Some(&obj(i))).unwrap();
        }
        assert_eq!(
            ints(collect(&tree, &Range::default(), false)),
            vec![vec![1], vec![2], vec![3]]
        );
        assert!(tree.get(&int_key(&[1])).is_err());
    }

    #[test]
    fn test_range_display() {
        let range = Range {
            min: Some(vec![Value::Integer(1)]),
            max: Some(vec![Value::Integer(2)]),
            ..Default::default()
        };
        assert_eq!(range.to_string(), r#"{"min": [1], "max": [2]}"#);
    }
}
