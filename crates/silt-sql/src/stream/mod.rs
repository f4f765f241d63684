//! Streaming operators.
//!
//! A stream is a linear chain of single-input single-output operators.
//! Each operator owns its upstream link; the executor holds only the
//! tail. Iteration is pull-based: an operator asks its upstream to
//! iterate, transforms each environment it receives, and forwards zero or
//! more environments to its `emit` callback. Errors short-circuit the
//! whole chain.
//!
//! An operator with no upstream link processes the input environment
//! exactly once. That is how sources embedded mid-stream work (`emit`),
//! and how the recovery stream of `on_conflict` runs on a single row.

use std::fmt;

use crate::environment::Environment;
use crate::error::{Error, Result};

mod control;
mod index_ops;
mod path_ops;
mod rows;
mod scan;
mod sort;
mod table_ops;

pub use control::{Discard, OnConflict};
pub use index_ops::{IndexDelete, IndexInsert, IndexValidate};
pub use path_ops::{PathSet, PathUnset, PathsRename};
pub use rows::{Emit, Filter, Map, Project, ProjectItem, Skip, Take};
pub use scan::{IndexScan, SeqScan};
pub use sort::TempTreeSort;
pub use table_ops::{TableDelete, TableInsert, TableReplace, TableValidate};

/// The downstream continuation an operator forwards environments to.
pub type EmitFn<'a> = &'a mut dyn FnMut(&Environment<'_>) -> Result<()>;

/// A streaming operator.
///
/// `fmt::Display` must produce a stable textual form; plans compare by
/// that text in tests.
pub trait Operator: fmt::Display {
    /// Pulls environments from `upstream`, transforms them, and forwards
    /// results to `emit`. Returns the first error raised anywhere
    /// downstream or upstream.
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()>;
}

struct Node {
    op: Box<dyn Operator>,
    prev: Option<Box<Node>>,
}

impl Node {
    fn iterate(&self, env: &Environment<'_>, emit: EmitFn<'_>) -> Result<()> {
        self.op.iterate(env, Upstream(self.prev.as_deref()), emit)
    }
}

/// Handle to an operator's upstream link.
pub struct Upstream<'a>(Option<&'a Node>);

impl Upstream<'_> {
    /// Iterates the upstream chain. Without an upstream, the input
    /// environment is processed exactly once.
    pub fn iterate(&self, env: &Environment<'_>, emit: EmitFn<'_>) -> Result<()> {
        match self.0 {
            Some(node) => node.iterate(env, emit),
            None => emit(env),
        }
    }
}

/// An operator chain, built source-first with `pipe`.
pub struct Stream {
    tail: Option<Box<Node>>,
}

impl Stream {
    /// A stream with a single operator.
    pub fn new(op: impl Operator + 'static) -> Self {
        Self {
            tail: Some(Box::new(Node {
                op: Box::new(op),
                prev: None,
            })),
        }
    }

    /// An empty stream; iterating it yields nothing.
    pub fn empty() -> Self {
        Self { tail: None }
    }

    /// Appends `op` after the current tail and returns the new chain.
    pub fn pipe(self, op: impl Operator + 'static) -> Self {
        Self {
            tail: Some(Box::new(Node {
                op: Box::new(op),
                prev: self.tail,
            })),
        }
    }

    /// Drives the stream to completion, invoking `f` for every
    /// environment the tail emits. The early-termination sentinel raised
    /// by `take` is converted to clean EOF here.
    pub fn iterate(
        &self,
        env: &Environment<'_>,
        mut f: impl FnMut(&Environment<'_>) -> Result<()>,
    ) -> Result<()> {
        match self.iterate_raw(env, &mut f) {
            Err(Error::StreamClosed) => Ok(()),
            other => other,
        }
    }

    /// Drives the stream without converting the termination sentinel;
    /// used when a stream runs nested inside another operator.
    pub(crate) fn iterate_raw(&self, env: &Environment<'_>, emit: EmitFn<'_>) -> Result<()> {
        match &self.tail {
            Some(node) => node.iterate(env, emit),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops = Vec::new();
        let mut node = self.tail.as_deref();
        while let Some(n) = node {
            ops.push(&n.op);
            node = n.prev.as_deref();
        }
        for (i, op) in ops.iter().rev().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, ExprArena, ExprId, ExprNode};
    use crate::value::Value;
    use std::sync::Arc;

    /// Builds one object-constructor expression per row of `objs`.
    fn object_exprs(arena: &mut ExprArena, objs: &[&[(&str, i64)]]) -> Vec<ExprId> {
        objs.iter()
            .map(|pairs| {
                let fields = pairs
                    .iter()
                    .map(|(n, v)| {
                        let id = arena.push(ExprNode::Literal(Value::Integer(*v)));
                        (n.to_string(), id)
                    })
                    .collect();
                arena.push(ExprNode::ObjectExpr(fields))
            })
            .collect()
    }

    fn collect_field(stream: &Stream, field: &str) -> Vec<Value> {
        let env = Environment::default();
        let mut out = Vec::new();
        stream
            .iterate(&env, |e| {
                let row = e.row().expect("row");
                out.push(row.object().unwrap().get(field).cloned().unwrap());
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn test_stream_pipes_through_filter() {
        let mut arena = ExprArena::new();
        let exprs = object_exprs(&mut arena, &[&[("a", 1)], &[("a", 2)], &[("a", 3)]]);
        let a = arena.push(ExprNode::Path("a".parse().unwrap()));
        let two = arena.push(ExprNode::Literal(Value::Integer(2)));
        let pred = arena.push(ExprNode::Binary {
            op: BinaryOp::GtEq,
            left: a,
            right: two,
        });

        let arena = Arc::new(arena);
        let stream = Stream::new(Emit::new(arena.clone(), exprs))
            .pipe(Filter::new(arena.clone(), pred));

        assert_eq!(
            collect_field(&stream, "a"),
            vec![Value::Integer(2), Value::Integer(3)]
        );
    }

    #[test]
    fn test_take_terminates_early() {
        let mut arena = ExprArena::new();
        let exprs = object_exprs(&mut arena, &[&[("a", 1)], &[("a", 2)], &[("a", 3)]]);
        let arena = Arc::new(arena);
        let stream = Stream::new(Emit::new(arena, exprs)).pipe(Take::new(2));

        assert_eq!(
            collect_field(&stream, "a"),
            vec![Value::Integer(1), Value::Integer(2)]
        );
    }

    #[test]
    fn test_skip_drops_prefix() {
        let mut arena = ExprArena::new();
        let exprs = object_exprs(&mut arena, &[&[("a", 1)], &[("a", 2)], &[("a", 3)]]);
        let arena = Arc::new(arena);
        let stream = Stream::new(Emit::new(arena, exprs)).pipe(Skip::new(2));

        assert_eq!(collect_field(&stream, "a"), vec![Value::Integer(3)]);
    }

    #[test]
    fn test_map_replaces_the_row() {
        let mut arena = ExprArena::new();
        let exprs = object_exprs(&mut arena, &[&[("a", 1)], &[("a", 2)]]);

        // map({v: a + 10})
        let a = arena.push(ExprNode::Path("a".parse().unwrap()));
        let ten = arena.push(ExprNode::Literal(Value::Integer(10)));
        let sum = arena.push(ExprNode::Binary {
            op: BinaryOp::Add,
            left: a,
            right: ten,
        });
        let obj = arena.push(ExprNode::ObjectExpr(vec![("v".into(), sum)]));

        let arena = Arc::new(arena);
        let stream = Stream::new(Emit::new(arena.clone(), exprs)).pipe(Map::new(arena, obj));

        assert_eq!(
            collect_field(&stream, "v"),
            vec![Value::Integer(11), Value::Integer(12)]
        );
    }

    #[test]
    fn test_empty_stream_yields_nothing() {
        let env = Environment::default();
        let mut count = 0;
        Stream::empty()
            .iterate(&env, |_| {
                count += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_stream_display_joins_operators() {
        let mut arena = ExprArena::new();
        let a = arena.push(ExprNode::Path("a".parse().unwrap()));
        let one = arena.push(ExprNode::Literal(Value::Integer(1)));
        let pred = arena.push(ExprNode::Binary {
            op: BinaryOp::Eq,
            left: a,
            right: one,
        });
        let arena = Arc::new(arena);

        let stream = Stream::new(SeqScan::new("t"))
            .pipe(Filter::new(arena, pred))
            .pipe(Take::new(5));
        assert_eq!(stream.to_string(), "seq_scan(t) | filter(a = 1) | take(5)");
    }
}
