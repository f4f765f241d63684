//! Per-row execution context.
//!
//! An environment carries the current row, a link to an outer environment,
//! the statement parameters, and the transaction handle. Operators pass
//! one environment pointer down the pipeline; the innermost source is the
//! only writer of the current-row slot.

use crate::codec::row::LazyRow;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::session::Tx;
use crate::tree::Key;
use crate::value::Value;

/// One statement parameter, positional (no name) or named.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub value: Value,
}

impl Param {
    /// A positional parameter.
    pub fn positional(value: Value) -> Self {
        Self { name: None, value }
    }

    /// A named parameter.
    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// A row as observed inside an environment: the table key (when the row
/// came from or went to a tree) and the lazily decoded body.
#[derive(Debug, Clone)]
pub struct Row {
    key: Option<Key>,
    body: LazyRow,
}

impl Row {
    /// A row with a bound key.
    pub fn new(key: Key, body: LazyRow) -> Self {
        Self {
            key: Some(key),
            body,
        }
    }

    /// A keyless row, e.g. one produced by `emit`.
    pub fn from_object(obj: Object) -> Self {
        Self {
            key: None,
            body: LazyRow::from_object(obj),
        }
    }

    /// The table key, when bound.
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The row body, decoding lazily.
    pub fn object(&self) -> Result<&Object> {
        self.body.object()
    }

    /// The underlying lazy body.
    pub fn body(&self) -> &LazyRow {
        &self.body
    }
}

/// The execution context threaded through an operator stream.
#[derive(Debug, Default)]
pub struct Environment<'a> {
    row: Option<Row>,
    outer: Option<&'a Environment<'a>>,
    params: Option<&'a [Param]>,
    tx: Option<&'a Tx>,
}

impl<'a> Environment<'a> {
    /// The root environment of a statement run.
    pub fn new(tx: &'a Tx, params: &'a [Param]) -> Self {
        Self {
            row: None,
            outer: None,
            params: Some(params),
            tx: Some(tx),
        }
    }

    /// Derives a child environment carrying `row`, with `self` as outer.
    pub fn with_row(&'a self, row: Row) -> Environment<'a> {
        Environment {
            row: Some(row),
            outer: Some(self),
            params: None,
            tx: None,
        }
    }

    /// The current row, looked up through the chain.
    pub fn row(&self) -> Option<&Row> {
        match &self.row {
            Some(row) => Some(row),
            None => self.outer.and_then(|o| o.row()),
        }
    }

    /// The transaction handle, looked up through the chain.
    pub fn tx(&self) -> Result<&Tx> {
        match self.tx {
            Some(tx) => Ok(tx),
            None => self
                .outer
                .ok_or_else(|| Error::Runtime("no transaction in environment".into()))
                .and_then(|o| o.tx()),
        }
    }

    /// Resolves the 1-based positional parameter `idx`.
    pub fn positional_param(&self, idx: usize) -> Result<Value> {
        let params = self.all_params();
        params
            .and_then(|p| p.get(idx.checked_sub(1)?))
            .map(|p| p.value.clone())
            .ok_or_else(|| Error::Runtime(format!("no parameter for placeholder ?{idx}")))
    }

    /// Resolves the named parameter `$name`.
    pub fn named_param(&self, name: &str) -> Result<Value> {
        self.all_params()
            .and_then(|params| params.iter().find(|p| p.name.as_deref() == Some(name)))
            .map(|p| p.value.clone())
            .ok_or_else(|| Error::Runtime(format!("no parameter named ${name}")))
    }

    fn all_params(&self) -> Option<&[Param]> {
        match self.params {
            Some(p) => Some(p),
            None => self.outer.and_then(|o| o.all_params()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_walks_chain() {
        let base = Environment::default();
        assert!(base.row().is_none());

        let row = Row::from_object(Object::from_pairs(vec![(
            "a".to_string(),
            Value::Integer(1),
        )]));
        let child = base.with_row(row);
        let grandchild = child.with_row(Row::from_object(Object::new()));

        assert!(child.row().is_some());
        assert!(grandchild.row().unwrap().object().unwrap().is_empty());
    }

    #[test]
    fn test_param_resolution() {
        let tx_less = Environment {
            row: None,
            outer: None,
            params: Some(&[]),
            tx: None,
        };
        assert!(tx_less.positional_param(1).is_err());

        let params = [
            Param::positional(Value::Integer(10)),
            Param::named("name", Value::Text("x".into())),
        ];
        let env = Environment {
            row: None,
            outer: None,
            params: Some(&params),
            tx: None,
        };
        assert_eq!(env.positional_param(1).unwrap(), Value::Integer(10));
        assert_eq!(env.named_param("name").unwrap(), Value::Text("x".into()));
        assert!(env.positional_param(3).is_err());
        assert!(env.named_param("missing").is_err());

        // Params resolve through child environments.
        let child = env.with_row(Row::from_object(Object::new()));
        assert_eq!(child.positional_param(1).unwrap(), Value::Integer(10));
    }
}
