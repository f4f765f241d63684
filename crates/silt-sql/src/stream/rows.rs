//! Row-shaping operators: emit, filter, map, project, take, skip.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::environment::{Environment, Row};
use crate::error::{Error, Result};
use crate::expr::{ExprArena, ExprId, ExprNode};
use crate::object::Object;
use crate::stream::{EmitFn, Operator, Upstream};
use crate::value::Value;

/// Evaluates each expression in order; every object result becomes a row.
/// The usual source of INSERT ... VALUES streams.
pub struct Emit {
    arena: Arc<ExprArena>,
    exprs: Vec<ExprId>,
}

impl Emit {
    pub fn new(arena: Arc<ExprArena>, exprs: Vec<ExprId>) -> Self {
        Self { arena, exprs }
    }
}

impl Operator for Emit {
    fn iterate(
        &self,
        env: &Environment<'_>,
        _upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        for expr in &self.exprs {
            let value = self.arena.eval(*expr, env)?;
            let obj = match value {
                Value::Object(obj) => obj,
                other => {
                    return Err(Error::Type(format!(
                        "expected an object, got a {}",
                        other.kind()
                    )))
                }
            };
            let child = env.with_row(Row::from_object(obj));
            emit(&child)?;
        }
        Ok(())
    }
}

impl fmt::Display for Emit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emit(")?;
        for (i, expr) in self.exprs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.arena.display(*expr))?;
        }
        write!(f, ")")
    }
}

/// Drops rows whose predicate is not truthy; NULL counts as false.
pub struct Filter {
    arena: Arc<ExprArena>,
    expr: ExprId,
}

impl Filter {
    pub fn new(arena: Arc<ExprArena>, expr: ExprId) -> Self {
        Self { arena, expr }
    }
}

impl Operator for Filter {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            if self.arena.eval(self.expr, e)?.is_truthy() {
                emit(e)
            } else {
                Ok(())
            }
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter({})", self.arena.display(self.expr))
    }
}

/// Replaces the current row with the object value of an expression. The
/// row key, when bound, carries over.
pub struct Map {
    arena: Arc<ExprArena>,
    expr: ExprId,
}

impl Map {
    pub fn new(arena: Arc<ExprArena>, expr: ExprId) -> Self {
        Self { arena, expr }
    }
}

impl Operator for Map {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let value = self.arena.eval(self.expr, e)?;
            let obj = match value {
                Value::Object(obj) => obj,
                other => {
                    return Err(Error::Type(format!(
                        "map expects an object, got a {}",
                        other.kind()
                    )))
                }
            };
            let row = match e.row().and_then(|r| r.key()) {
                Some(key) => Row::new(key.clone(), crate::codec::row::LazyRow::from_object(obj)),
                None => Row::from_object(obj),
            };
            let child = e.with_row(row);
            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map({})", self.arena.display(self.expr))
    }
}

/// One projected column: an expression and its optional alias.
pub struct ProjectItem {
    pub expr: ExprId,
    pub alias: Option<String>,
}

/// Materializes a new row with the named columns; `*` expands the current
/// row's fields in place.
pub struct Project {
    arena: Arc<ExprArena>,
    items: Vec<ProjectItem>,
}

impl Project {
    pub fn new(arena: Arc<ExprArena>, items: Vec<ProjectItem>) -> Self {
        Self { arena, items }
    }
}

impl Operator for Project {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            let mut out = Object::new();
            for item in &self.items {
                if matches!(self.arena.node(item.expr), ExprNode::Wildcard) {
                    let row = e
                        .row()
                        .ok_or_else(|| Error::Runtime("no table specified".into()))?;
                    for (name, value) in row.object()?.iter() {
                        out.set(name, value.clone());
                    }
                    continue;
                }
                let name = match &item.alias {
                    Some(alias) => alias.clone(),
                    None => self.arena.display(item.expr).to_string(),
                };
                out.set(&name, self.arena.eval(item.expr, e)?);
            }
            let row = match e.row().and_then(|r| r.key()) {
                Some(key) => Row::new(key.clone(), crate::codec::row::LazyRow::from_object(out)),
                None => Row::from_object(out),
            };
            let child = e.with_row(row);
            emit(&child)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project(")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.arena.display(item.expr))?;
            if let Some(alias) = &item.alias {
                write!(f, " AS {alias}")?;
            }
        }
        write!(f, ")")
    }
}

/// Forwards the first `n` rows, then asks the upstream to stop.
pub struct Take {
    n: i64,
    seen: Cell<i64>,
}

impl Take {
    pub fn new(n: i64) -> Self {
        Self {
            n,
            seen: Cell::new(0),
        }
    }
}

impl Operator for Take {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        self.seen.set(0);
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            if self.seen.get() >= self.n {
                return Err(Error::StreamClosed);
            }
            self.seen.set(self.seen.get() + 1);
            emit(e)?;
            if self.seen.get() >= self.n {
                // Quota reached: short-circuit the upstream scan.
                return Err(Error::StreamClosed);
            }
            Ok(())
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for Take {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "take({})", self.n)
    }
}

/// Drops the first `n` rows and forwards the rest.
pub struct Skip {
    n: i64,
    seen: Cell<i64>,
}

impl Skip {
    pub fn new(n: i64) -> Self {
        Self {
            n,
            seen: Cell::new(0),
        }
    }
}

impl Operator for Skip {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        self.seen.set(0);
        let mut forward = |e: &Environment<'_>| -> Result<()> {
            if self.seen.get() < self.n {
                self.seen.set(self.seen.get() + 1);
                return Ok(());
            }
            emit(e)
        };
        upstream.iterate(env, &mut forward)
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skip({})", self.n)
    }
}
