//! Index operators: insert, delete, validate.
//!
//! All three derive the index entry from the current row and its bound
//! key; rows whose indexed paths are missing or NULL carry no entries and
//! pass through untouched.

use std::fmt;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::stream::{EmitFn, Operator, Upstream};
use crate::table::Index;

/// Adds this row's entry to one index.
pub struct IndexInsert {
    name: String,
}

impl IndexInsert {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operator for IndexInsert {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let index = Index::open(e.tx()?, &self.name)?;
            let row = e
                .row()
                .ok_or_else(|| Error::Runtime("no current row".into()))?;
            let key = row
                .key()
                .ok_or_else(|| Error::Runtime("row has no key".into()))?;
            index.insert(row.object()?, key)?;
            emit(e)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for IndexInsert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index.insert({})", self.name)
    }
}

/// Removes this row's entry from one index.
///
/// The entry is derived from the row as stored in the table, not from the
/// (possibly already rewritten) row in the environment: during an UPDATE
/// this operator runs after the SET/UNSET rewrites but before the table
/// write, and it is the old values whose entries must go.
pub struct IndexDelete {
    name: String,
}

impl IndexDelete {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operator for IndexDelete {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let tx = e.tx()?;
            let index = Index::open(tx, &self.name)?;
            let row = e
                .row()
                .ok_or_else(|| Error::Runtime("no current row".into()))?;
            let key = row
                .key()
                .ok_or_else(|| Error::Runtime("row has no key".into()))?;
            let table = crate::table::Table::open(tx, &index.info.table)?;
            let stored = table.get(key)?;
            index.delete(stored.object()?, key)?;
            emit(e)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for IndexDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index.delete({})", self.name)
    }
}

/// Fails when another row already holds this row's indexed values.
pub struct IndexValidate {
    name: String,
}

impl IndexValidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Operator for IndexValidate {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let index = Index::open(e.tx()?, &self.name)?;
            let row = e
                .row()
                .ok_or_else(|| Error::Runtime("no current row".into()))?;
            index.validate_unique(row.object()?)?;
            emit(e)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for IndexValidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index.validate({})", self.name)
    }
}
