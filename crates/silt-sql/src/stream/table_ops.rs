//! Table operators: validate, insert, replace, delete.

use std::fmt;
use std::sync::Arc;

use crate::codec::row::LazyRow;
use crate::environment::{Environment, Row};
use crate::error::{Error, Result};
use crate::expr::{ExprArena, ExprId};
use crate::stream::{EmitFn, Operator, Upstream};
use crate::table::Table;
use crate::tree::Key;

fn current_row<'e>(e: &'e Environment<'_>) -> Result<&'e Row> {
    e.row().ok_or_else(|| Error::Runtime("no current row".into()))
}

/// The key a write targets: the one bound in the environment, else the
/// row's primary-key values. Rowid tables must arrive with a bound key.
fn resolve_key(table: &Table<'_>, row: &Row) -> Result<Key> {
    if let Some(key) = row.key() {
        return Ok(key.clone());
    }
    table
        .primary_key_of(row.object()?)?
        .ok_or_else(|| Error::Runtime("row has no key".into()))
}

/// Enforces column types, NOT NULL and CHECK constraints, applying
/// declared defaults and coercing values to their declared kinds.
pub struct TableValidate {
    table: String,
    arena: Arc<ExprArena>,
    /// CHECK constraints compiled into the statement arena, paired with
    /// their original SQL text for error messages.
    checks: Vec<(ExprId, String)>,
}

impl TableValidate {
    pub fn new(table: impl Into<String>, arena: Arc<ExprArena>, checks: Vec<(ExprId, String)>) -> Self {
        Self {
            table: table.into(),
            arena,
            checks,
        }
    }
}

impl Operator for TableValidate {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        // Catalog entries are read once per statement, not per row.
        let info = env.tx()?.catalog().table(&self.table)?;

        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let row = current_row(e)?;
            let mut obj = row.object()?.clone();

            for field in &info.fields {
                let mut value = obj.get_path(&field.path).cloned();

                if value.is_none() {
                    if let Some(default) = &field.default {
                        obj.set_path(&field.path, default.clone())?;
                        value = Some(default.clone());
                    }
                }

                match value {
                    None | Some(crate::value::Value::Null) => {
                        if field.not_null {
                            return Err(Error::not_null(&field.path));
                        }
                    }
                    Some(v) => {
                        let coerced = v.cast(field.kind)?;
                        obj.set_path(&field.path, coerced)?;
                    }
                }
            }

            let row = match row.key() {
                Some(key) => Row::new(key.clone(), LazyRow::from_object(obj)),
                None => Row::from_object(obj),
            };
            let child = e.with_row(row);

            // CHECK constraints see the coerced row; NULL results pass.
            for (check, sql) in &self.checks {
                let v = self.arena.eval(*check, &child)?;
                if !v.is_null() && !v.is_truthy() {
                    return Err(Error::check_failed(sql));
                }
            }

            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for TableValidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table.validate({})", self.table)
    }
}

/// Computes the row's key and inserts it, failing on duplicates unless an
/// upstream `on_conflict` recovers the error.
pub struct TableInsert {
    table: String,
}

impl TableInsert {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl Operator for TableInsert {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let table = Table::open(e.tx()?, &self.table)?;
            let row = current_row(e)?;
            let obj = row.object()?;
            let key = table.generate_key(obj)?;
            table.insert(&key, obj)?;
            let child = e.with_row(Row::new(key, row.body().clone()));
            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for TableInsert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table.insert({})", self.table)
    }
}

/// Overwrites the existing row at the current key.
pub struct TableReplace {
    table: String,
}

impl TableReplace {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl Operator for TableReplace {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let table = Table::open(e.tx()?, &self.table)?;
            let row = current_row(e)?;
            let key = resolve_key(&table, row)?;
            table.replace(&key, row.object()?)?;
            let child = e.with_row(Row::new(key, row.body().clone()));
            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for TableReplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table.replace({})", self.table)
    }
}

/// Deletes the current row by key, pruning its index entries along with
/// it. Emits nothing.
pub struct TableDelete {
    table: String,
}

impl TableDelete {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl Operator for TableDelete {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        _emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let tx = e.tx()?;
            let table = Table::open(tx, &self.table)?;
            let row = current_row(e)?;
            let key = resolve_key(&table, row)?;
            // Entries are derived from the stored row; the row in the
            // environment may already have been rewritten upstream.
            let stored = table.get(&key)?;
            for index_name in tx.catalog().list_indexes(&self.table) {
                let index = crate::table::Index::open(tx, &index_name)?;
                index.delete(stored.object()?, &key)?;
            }
            table.delete(&key)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for TableDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table.delete({})", self.table)
    }
}
