//! Typed access to tables and indexes.
//!
//! `Table` and `Index` wrap catalog metadata with the tree operations the
//! operators and DDL paths share: key generation, uniqueness checks, and
//! index-entry maintenance.
//!
//! Index entries are composite keys of the indexed values followed by the
//! row's primary-key values, mapped to the empty doc. The primary-key
//! suffix keeps entries distinct when indexed values repeat, and scanning
//! a prefix of indexed values finds every owning row.

use crate::catalog::{IndexInfo, TableInfo};
use crate::codec::row::LazyRow;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::session::Tx;
use crate::tree::{Key, Range, Tree};
use crate::value::Value;

/// A table: its metadata plus the tree holding its rows.
pub struct Table<'a> {
    pub info: TableInfo,
    tx: &'a Tx,
}

impl<'a> Table<'a> {
    /// Opens `name` within the transaction.
    pub fn open(tx: &'a Tx, name: &str) -> Result<Self> {
        let info = tx.catalog().table(name)?;
        Ok(Self { info, tx })
    }

    fn tree(&self) -> Tree<'a> {
        Tree::new(self.tx.storage(), self.info.namespace)
    }

    /// The primary-key values of `obj` as a key, or None for rowid
    /// tables. Missing or NULL key values fail the NOT NULL constraint.
    pub fn primary_key_of(&self, obj: &Object) -> Result<Option<Key>> {
        let Some(pk) = &self.info.primary_key else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(pk.paths.len());
        for path in &pk.paths {
            match obj.get_path(path) {
                Some(v) if !v.is_null() => values.push(v.clone()),
                _ => return Err(Error::not_null(path)),
            }
        }
        Ok(Some(Key::from_values(values)))
    }

    /// Computes the key for `obj`: its primary-key values, or the next
    /// rowid for tables without a declared primary key.
    pub fn generate_key(&self, obj: &Object) -> Result<Key> {
        match self.primary_key_of(obj)? {
            Some(key) => Ok(key),
            None => {
                let seq = self
                    .info
                    .rowid_sequence
                    .as_ref()
                    .ok_or_else(|| Error::Runtime("table has no key source".into()))?;
                let rowid = self
                    .tx
                    .catalog()
                    .sequence_next(self.tx.storage(), seq)?;
                Ok(Key::from_values(vec![Value::Integer(rowid)]))
            }
        }
    }

    /// Inserts a new row, failing on a duplicate key.
    pub fn insert(&self, key: &Key, obj: &Object) -> Result<()> {
        if self.tree().exists(key)? {
            return Err(Error::primary_key_conflict(self.info.primary_key_paths()));
        }
        self.tree().put(key, Some(obj))
    }

    /// Overwrites the row at `key`, which must exist.
    pub fn replace(&self, key: &Key, obj: &Object) -> Result<()> {
        if !self.tree().exists(key)? {
            return Err(Error::Storage(silt_storage::StorageError::KeyNotFound));
        }
        self.tree().put(key, Some(obj))
    }

    /// Deletes the row at `key`, which must exist.
    pub fn delete(&self, key: &Key) -> Result<()> {
        self.tree().delete(key)
    }

    /// Returns the row at `key`.
    pub fn get(&self, key: &Key) -> Result<LazyRow> {
        self.tree().get(key)
    }

    /// Visits rows in key order.
    pub fn iterate(
        &self,
        range: &Range,
        reverse: bool,
        f: impl FnMut(Key, LazyRow) -> Result<()>,
    ) -> Result<()> {
        self.tree().iterate_on_range(range, reverse, f)
    }
}

/// An index: its metadata plus the tree holding its entries.
pub struct Index<'a> {
    pub info: IndexInfo,
    tx: &'a Tx,
}

impl<'a> Index<'a> {
    /// Opens `name` within the transaction.
    pub fn open(tx: &'a Tx, name: &str) -> Result<Self> {
        let info = tx.catalog().index(name)?;
        Ok(Self { info, tx })
    }

    fn tree(&self) -> Tree<'a> {
        Tree::new(self.tx.storage(), self.info.namespace)
    }

    /// The indexed values of `obj`, or None when any indexed path is
    /// missing or NULL; such rows carry no entry in this index.
    pub fn indexed_values(&self, obj: &Object) -> Option<Vec<Value>> {
        let mut values = Vec::with_capacity(self.info.paths.len());
        for path in &self.info.paths {
            match obj.get_path(path) {
                Some(v) if !v.is_null() => values.push(v.clone()),
                _ => return None,
            }
        }
        Some(values)
    }

    fn entry_key(&self, obj: &Object, pk: &Key) -> Result<Option<Key>> {
        let Some(mut values) = self.indexed_values(obj) else {
            return Ok(None);
        };
        values.extend(pk.values()?.iter().cloned());
        Ok(Some(Key::from_values(values)))
    }

    /// Adds the entry for `obj` owned by the row at `pk`.
    pub fn insert(&self, obj: &Object, pk: &Key) -> Result<()> {
        if let Some(key) = self.entry_key(obj, pk)? {
            self.tree().put(&key, None)?;
        }
        Ok(())
    }

    /// Removes the entry for `obj` owned by the row at `pk`. Rows that
    /// carry no entry (NULL indexed values) are a no-op.
    pub fn delete(&self, obj: &Object, pk: &Key) -> Result<()> {
        if let Some(key) = self.entry_key(obj, pk)? {
            if self.tree().exists(&key)? {
                self.tree().delete(&key)?;
            }
        }
        Ok(())
    }

    /// Fails when another row already holds this object's indexed values.
    /// Only meaningful on unique indexes.
    pub fn validate_unique(&self, obj: &Object) -> Result<()> {
        let Some(values) = self.indexed_values(obj) else {
            return Ok(());
        };
        let range = Range::exact(values, self.info.paths.clone());
        let mut conflict = false;
        self.tree().iterate_on_range(&range, false, |_, _| {
            conflict = true;
            Err(Error::StreamClosed)
        })
        .or_else(|e| match e {
            Error::StreamClosed => Ok(()),
            other => Err(other),
        })?;
        if conflict {
            return Err(Error::unique_conflict(&self.info.paths));
        }
        Ok(())
    }

    /// Visits `(entry key, owning row key)` pairs in `range` order. The
    /// owning key is the entry-key suffix past the indexed columns; it is
    /// re-encoded rather than re-read, so hits resolve through the table.
    pub fn iterate(
        &self,
        range: &Range,
        reverse: bool,
        mut f: impl FnMut(Key) -> Result<()>,
    ) -> Result<()> {
        let arity = self.info.paths.len();
        self.tree().iterate_on_range(range, reverse, |key, _| {
            let values = key.values()?;
            if values.len() <= arity {
                return Err(Error::Type("corrupt index entry".into()));
            }
            let pk = Key::from_values(values[arity..].to_vec());
            f(pk)
        })
    }
}
