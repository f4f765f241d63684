//! Statement execution.
//!
//! Stream statements are driven through their tail operator and their
//! emitted rows collected; DDL statements act on the catalog directly.

use tracing::debug;

use crate::catalog::{FieldConstraint, PrimaryKey, SequenceInfo, TableSpec};
use crate::environment::{Environment, Param};
use crate::error::{Error, Result};
use crate::object::{Object, Path};
use crate::parser::{CreateIndexStmt, CreateSequenceStmt, CreateTableStmt};
use crate::planner::Prepared;
use crate::session::Tx;
use crate::stream::Stream;
use crate::table::{Index, Table};
use crate::tree::Range;

/// The materialized result of one statement.
#[derive(Debug, Default)]
pub struct ResultSet {
    rows: Vec<Object>,
}

impl ResultSet {
    /// The result rows, in emission order.
    pub fn rows(&self) -> &[Object] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the statement produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Visits every row in order.
    pub fn iterate(&self, mut f: impl FnMut(&Object) -> Result<()>) -> Result<()> {
        for row in &self.rows {
            f(row)?;
        }
        Ok(())
    }

    /// Marshals every row to JSON.
    pub fn to_json(&self) -> Vec<serde_json::Value> {
        self.rows.iter().map(Object::to_json).collect()
    }
}

/// Runs a prepared statement within `tx`.
pub fn run(prepared: &Prepared, tx: &Tx, params: &[Param]) -> Result<ResultSet> {
    match prepared {
        Prepared::Stream { stream, .. } => run_stream(stream, tx, params),
        Prepared::CreateTable { stmt, arena } => {
            create_table(stmt, arena, tx)?;
            Ok(ResultSet::default())
        }
        Prepared::CreateIndex(stmt) => {
            create_index(stmt, tx)?;
            Ok(ResultSet::default())
        }
        Prepared::CreateSequence(stmt) => {
            create_sequence(stmt, tx)?;
            Ok(ResultSet::default())
        }
        Prepared::DropTable(stmt) => {
            swallow_not_found(tx.catalog().drop_table(tx.storage(), &stmt.name).map(|_| ()), stmt.if_exists)?;
            Ok(ResultSet::default())
        }
        Prepared::DropIndex(stmt) => {
            swallow_not_found(tx.catalog().drop_index(tx.storage(), &stmt.name).map(|_| ()), stmt.if_exists)?;
            Ok(ResultSet::default())
        }
        Prepared::DropSequence(stmt) => {
            swallow_not_found(tx.catalog().drop_sequence(tx.storage(), &stmt.name), stmt.if_exists)?;
            Ok(ResultSet::default())
        }
        Prepared::Begin { .. } | Prepared::Commit | Prepared::Rollback => Err(Error::Runtime(
            "transaction control is handled by the session".into(),
        )),
    }
}

fn run_stream(stream: &Stream, tx: &Tx, params: &[Param]) -> Result<ResultSet> {
    let env = Environment::new(tx, params);
    let mut rows = Vec::new();
    stream.iterate(&env, |e| {
        if let Some(row) = e.row() {
            rows.push(row.object()?.clone());
        }
        Ok(())
    })?;
    debug!(rows = rows.len(), "stream executed");
    Ok(ResultSet { rows })
}

fn swallow_not_found(result: Result<()>, if_exists: bool) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() && if_exists => Ok(()),
        other => other,
    }
}

fn create_table(
    stmt: &CreateTableStmt,
    arena: &crate::expr::ExprArena,
    tx: &Tx,
) -> Result<()> {
    if tx.catalog().table_exists(&stmt.name) {
        if stmt.if_not_exists {
            return Ok(());
        }
        return Err(Error::AlreadyExists {
            kind: "table",
            name: stmt.name.clone(),
        });
    }

    // Defaults evaluate once, here; they may not reference rows or
    // parameters.
    let env = Environment::default();
    let fields = stmt
        .fields
        .iter()
        .map(|f| {
            let default = f
                .default
                .map(|id| arena.eval(id, &env))
                .transpose()?;
            Ok(FieldConstraint {
                path: f.path.clone(),
                kind: f.kind,
                not_null: f.not_null,
                default,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tx.catalog().create_table(
        tx.storage(),
        TableSpec {
            name: stmt.name.clone(),
            fields,
            primary_key: stmt
                .primary_key
                .clone()
                .map(|paths| PrimaryKey { paths }),
            checks: stmt.checks.clone(),
        },
    )?;

    // UNIQUE constraints become unique indexes. The table is brand new,
    // so there is nothing to backfill.
    for paths in &stmt.unique {
        let name = unique_index_name(&stmt.name, paths);
        tx.catalog()
            .create_index(tx.storage(), name, stmt.name.clone(), paths.clone(), true)?;
    }
    Ok(())
}

fn unique_index_name(table: &str, paths: &[Path]) -> String {
    let cols: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
    format!("{table}_{}_idx", cols.join("_"))
}

fn create_index(stmt: &CreateIndexStmt, tx: &Tx) -> Result<()> {
    if tx.catalog().index(&stmt.name).is_ok() {
        if stmt.if_not_exists {
            return Ok(());
        }
        return Err(Error::AlreadyExists {
            kind: "index",
            name: stmt.name.clone(),
        });
    }

    tx.catalog().create_index(
        tx.storage(),
        stmt.name.clone(),
        stmt.table.clone(),
        stmt.paths.clone(),
        stmt.unique,
    )?;

    // Backfill entries for the rows the table already holds.
    let table = Table::open(tx, &stmt.table)?;
    let index = Index::open(tx, &stmt.name)?;
    table.iterate(&Range::default(), false, |key, body| {
        let obj = body.object()?;
        if stmt.unique {
            index.validate_unique(obj)?;
        }
        index.insert(obj, &key)
    })?;
    debug!(index = %stmt.name, table = %stmt.table, "index backfilled");
    Ok(())
}

fn create_sequence(stmt: &CreateSequenceStmt, tx: &Tx) -> Result<()> {
    if tx.catalog().sequence(&stmt.name).is_ok() && stmt.if_not_exists {
        return Ok(());
    }
    tx.catalog().create_sequence(
        tx.storage(),
        SequenceInfo {
            name: stmt.name.clone(),
            start: stmt.start,
            owner_table: None,
        },
    )
}
