//! Path operators: set, unset, rename.

use std::fmt;
use std::sync::Arc;

use crate::codec::row::LazyRow;
use crate::environment::{Environment, Row};
use crate::error::{Error, Result};
use crate::expr::{ExprArena, ExprId};
use crate::object::{Object, Path};
use crate::stream::{EmitFn, Operator, Upstream};

fn replace_row(e: &Environment<'_>, obj: Object) -> Row {
    match e.row().and_then(|r| r.key()) {
        Some(key) => Row::new(key.clone(), LazyRow::from_object(obj)),
        None => Row::from_object(obj),
    }
}

/// Sets a path on the current row to an expression's value.
pub struct PathSet {
    arena: Arc<ExprArena>,
    path: Path,
    expr: ExprId,
}

impl PathSet {
    pub fn new(arena: Arc<ExprArena>, path: Path, expr: ExprId) -> Self {
        Self { arena, path, expr }
    }
}

impl Operator for PathSet {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let row = e
                .row()
                .ok_or_else(|| Error::Runtime("no current row".into()))?;
            let value = self.arena.eval(self.expr, e)?;
            let mut obj = row.object()?.clone();
            obj.set_path(&self.path, value)?;
            let child = e.with_row(replace_row(e, obj));
            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for PathSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paths.set({}, {})", self.path, self.arena.display(self.expr))
    }
}

/// Removes a path from the current row.
pub struct PathUnset {
    path: Path,
}

impl PathUnset {
    pub fn new(path: Path) -> Self {
        Self { path }
    }
}

impl Operator for PathUnset {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let row = e
                .row()
                .ok_or_else(|| Error::Runtime("no current row".into()))?;
            let mut obj = row.object()?.clone();
            obj.unset_path(&self.path);
            let child = e.with_row(replace_row(e, obj));
            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for PathUnset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paths.unset({})", self.path)
    }
}

/// Renames the top-level fields of the current row positionally, keeping
/// values and order. Used by `INSERT INTO t (a, b) SELECT ...`.
pub struct PathsRename {
    names: Vec<String>,
}

impl PathsRename {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Operator for PathsRename {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let row = e
                .row()
                .ok_or_else(|| Error::Runtime("no current row".into()))?;
            let obj = row.object()?;
            if obj.len() != self.names.len() {
                return Err(Error::Runtime(format!(
                    "{} values for {} fields",
                    obj.len(),
                    self.names.len()
                )));
            }
            let renamed = Object::from_pairs(
                self.names
                    .iter()
                    .cloned()
                    .zip(obj.iter().map(|(_, v)| v.clone())),
            );
            let child = e.with_row(replace_row(e, renamed));
            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for PathsRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paths.rename({})", self.names.join(", "))
    }
}
