//! The embedded API: database handles, transactions, statements.

use std::sync::Arc;

use silt_storage::{Store, Transaction};
use tracing::debug;

use crate::catalog::Catalog;
use crate::environment::Param;
use crate::error::{Error, Result};
use crate::executor::{self, ResultSet};
use crate::parser::Parser;
use crate::planner::{self, Prepared};

/// A database handle. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Db {
    store: Store,
    catalog: Arc<Catalog>,
}

impl Db {
    /// Opens a database at `path`; `":memory:"` opens a purely in-memory
    /// one.
    pub fn open(path: &str) -> Result<Db> {
        let store = if path == ":memory:" {
            Store::open_in_memory()
        } else {
            Store::open(path)?
        };
        let boot = store.begin(true);
        let catalog = Arc::new(Catalog::load(&boot)?);
        boot.rollback();
        debug!(path, "database opened");
        Ok(Db { store, catalog })
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> Result<Db> {
        Self::open(":memory:")
    }

    /// Starts a transaction.
    pub fn begin(&self, read_only: bool) -> Result<Tx> {
        Ok(Tx {
            store: self.store.clone(),
            storage: self.store.begin(read_only),
            catalog: self.catalog.clone(),
        })
    }

    /// Runs every statement in `sql`, discarding results.
    pub fn exec(&self, sql: &str) -> Result<()> {
        self.run_all(sql, &[]).map(|_| ())
    }

    /// Runs every statement in `sql` with `params`, discarding results.
    pub fn exec_with_params(&self, sql: &str, params: &[Param]) -> Result<()> {
        self.run_all(sql, params).map(|_| ())
    }

    /// Runs every statement in `sql` and returns the last result set.
    pub fn query(&self, sql: &str) -> Result<ResultSet> {
        self.run_all(sql, &[])
    }

    /// Runs every statement in `sql` with `params` and returns the last
    /// result set.
    pub fn query_with_params(&self, sql: &str, params: &[Param]) -> Result<ResultSet> {
        self.run_all(sql, params)
    }

    /// The shared statement loop: statements outside an explicit
    /// transaction auto-commit one by one; `BEGIN` opens an explicit
    /// transaction that `COMMIT`/`ROLLBACK` close. An explicit
    /// transaction still open at the end is committed.
    fn run_all(&self, sql: &str, params: &[Param]) -> Result<ResultSet> {
        let parsed = Parser::parse(sql)?;

        let mut last = ResultSet::default();
        let mut explicit: Option<Tx> = None;

        // Statements compile against the catalog as it stands when they
        // run, so DDL in the same batch is visible downstream.
        for statement in parsed.statements {
            // Transaction control never reaches the executor.
            match &statement {
                crate::parser::Statement::Begin { read_only } => {
                    if explicit.is_some() {
                        return Err(Error::Runtime(
                            "nested transactions are not supported".into(),
                        ));
                    }
                    explicit = Some(self.begin(*read_only)?);
                    continue;
                }
                crate::parser::Statement::Commit => match explicit.take() {
                    Some(tx) => {
                        tx.commit()?;
                        continue;
                    }
                    None => return Err(Error::Runtime("no transaction in progress".into())),
                },
                crate::parser::Statement::Rollback => match explicit.take() {
                    Some(tx) => {
                        tx.rollback();
                        continue;
                    }
                    None => return Err(Error::Runtime("no transaction in progress".into())),
                },
                _ => {}
            }

            let single = crate::parser::ParsedQuery {
                statements: vec![statement],
                arena: parsed.arena.clone(),
            };

            let mut auto: Option<Tx> = None;
            let tx: &Tx = match &explicit {
                Some(tx) => tx,
                None => {
                    auto = Some(self.begin(false)?);
                    auto.as_ref().unwrap()
                }
            };

            let mut prepared = planner::prepare_all(single, tx)?;
            let result = executor::run(&prepared.remove(0), tx, params);

            match (result, auto) {
                (Ok(rows), Some(tx)) => {
                    tx.commit()?;
                    last = rows;
                }
                (Ok(rows), None) => last = rows,
                (Err(e), Some(tx)) => {
                    tx.rollback();
                    return Err(e);
                }
                (Err(e), None) => {
                    // A failed statement aborts the explicit transaction.
                    if let Some(tx) = explicit.take() {
                        tx.rollback();
                    }
                    return Err(e);
                }
            }
        }

        if let Some(tx) = explicit.take() {
            tx.commit()?;
        }
        Ok(last)
    }
}

/// A transaction: the storage write buffer plus the shared catalog.
#[derive(Debug)]
pub struct Tx {
    store: Store,
    storage: Transaction,
    catalog: Arc<Catalog>,
}

impl Tx {
    /// The underlying storage transaction.
    pub fn storage(&self) -> &Transaction {
        &self.storage
    }

    /// The catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parses and compiles `sql` into runnable statements.
    pub fn prepare(&self, sql: &str) -> Result<Vec<Statement>> {
        let parsed = Parser::parse(sql)?;
        Ok(planner::prepare_all(parsed, self)?
            .into_iter()
            .map(|prepared| Statement { prepared })
            .collect())
    }

    /// Commits the transaction.
    pub fn commit(self) -> Result<()> {
        self.storage.commit()?;
        Ok(())
    }

    /// Rolls the transaction back. The catalog cache reloads from the
    /// committed state, since the buffer may have carried DDL.
    pub fn rollback(self) {
        self.storage.rollback();
        let fresh = self.store.begin(true);
        if let Err(e) = self.catalog.reload(&fresh) {
            debug!(error = %e, "catalog reload after rollback failed");
        }
        fresh.rollback();
    }
}

/// A prepared statement, bound to the transaction that compiles it.
#[derive(Debug)]
pub struct Statement {
    prepared: Prepared,
}

impl Statement {
    /// Runs the statement in `tx` with `params`.
    pub fn run(&self, tx: &Tx, params: &[Param]) -> Result<ResultSet> {
        executor::run(&self.prepared, tx, params)
    }

    /// Returns true when the statement performs no writes.
    pub fn is_read_only(&self) -> bool {
        matches!(self.prepared, Prepared::Stream { read_only: true, .. })
    }

    /// The compiled plan, when the statement is a stream.
    pub fn plan(&self) -> Option<String> {
        match &self.prepared {
            Prepared::Stream { stream, .. } => Some(stream.to_string()),
            _ => None,
        }
    }
}
