//! Sorting through a transient tree.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::row::LazyRow;
use crate::environment::{Environment, Row};
use crate::error::{Error, Result};
use crate::expr::{ExprArena, ExprId};
use crate::object::Object;
use crate::stream::{EmitFn, Operator, Upstream};
use crate::tree::{Key, Range, Tree};
use crate::value::Value;

/// Buffers the incoming rows into a transient tree keyed by the sort
/// expression, then yields them in key order. The tree key gets a
/// monotonically increasing counter appended so duplicate sort values
/// never collide; the sort stays stable as a side effect.
pub struct TempTreeSort {
    arena: Arc<ExprArena>,
    expr: ExprId,
    reverse: bool,
}

impl TempTreeSort {
    /// An ascending sort on `expr`.
    pub fn new(arena: Arc<ExprArena>, expr: ExprId) -> Self {
        Self {
            arena,
            expr,
            reverse: false,
        }
    }

    /// A descending sort on `expr`.
    pub fn reverse(arena: Arc<ExprArena>, expr: ExprId) -> Self {
        Self {
            arena,
            expr,
            reverse: true,
        }
    }
}

impl Operator for TempTreeSort {
    fn iterate(
        &self,
        env: &Environment<'_>,
        upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let tree = Tree::transient();
        let mut counter: i64 = 0;

        let mut buffer = |e: &Environment<'_>| -> Result<()> {
            let row = e
                .row()
                .ok_or_else(|| Error::Runtime("no current row".into()))?;
            let by = self.arena.eval(self.expr, e)?;

            let sort_key = Key::from_values(vec![by, Value::Integer(counter)]);
            counter += 1;

            // The entry value carries the row key (when bound) and the
            // encoded body, so downstream writers still see both.
            let mut entry = Object::new();
            if let Some(key) = row.key() {
                entry.set("k", Value::Blob(key.encoded().to_vec()));
            }
            entry.set("d", Value::Blob(row.body().encoded().to_vec()));
            tree.put(&sort_key, Some(&entry))
        };
        upstream.iterate(env, &mut buffer)?;

        tree.iterate_on_range(&Range::default(), self.reverse, |_, entry| {
            let entry = entry.object()?;
            let body = match entry.get("d") {
                Some(Value::Blob(bytes)) => LazyRow::from_encoded(Bytes::from(bytes.clone())),
                _ => return Err(Error::Type("corrupt sort entry".into())),
            };
            let row = match entry.get("k") {
                Some(Value::Blob(key)) => Row::new(Key::from_encoded(key.clone()), body),
                _ => Row::from_object(body.object()?.clone()),
            };
            let child = env.with_row(row);
            emit(&child)
        })
    }
}

impl fmt::Display for TempTreeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reverse {
            write!(f, "temp_tree_sort_reverse({})", self.arena.display(self.expr))
        } else {
            write!(f, "temp_tree_sort({})", self.arena.display(self.expr))
        }
    }
}
