//! Expressions.
//!
//! Expression trees are built during parsing and shared by the compiled
//! stream. Nodes live in an arena and reference their children by index;
//! equality is structural over the arena. Evaluation takes an environment
//! and yields a value.

use std::fmt;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::object::{Object, Path};
use crate::value::{Value, ValueKind};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => "||",
        }
    }

    /// Returns true for `= < <= > >=`, the operators index ranges can
    /// serve.
    pub fn is_range_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Handle to an expression node within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// One expression node. Children are arena indices.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Literal(Value),
    Path(Path),
    Wildcard,
    /// 1-based `?` placeholder.
    PositionalParam(usize),
    /// `$name` placeholder.
    NamedParam(String),
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Cast {
        expr: ExprId,
        to: ValueKind,
    },
    Between {
        expr: ExprId,
        negated: bool,
        low: ExprId,
        high: ExprId,
    },
    InList {
        expr: ExprId,
        list: Vec<ExprId>,
        negated: bool,
    },
    Function {
        name: String,
        args: Vec<ExprId>,
    },
    ObjectExpr(Vec<(String, ExprId)>),
    ArrayExpr(Vec<ExprId>),
}

/// The fixed builtin set.
pub const BUILTIN_FUNCTIONS: &[&str] = &["pk", "typeof", "len", "abs", "coalesce"];

/// Arena of expression nodes, owned by a parsed query.
#[derive(Debug, Default, Clone)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its handle. Shared sub-expressions may
    /// reuse handles freely; the arena is append-only.
    pub fn push(&mut self, node: ExprNode) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Returns the node behind `id`.
    pub fn node(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.0 as usize]
    }

    /// Structural equality of two expressions within this arena.
    pub fn expr_eq(&self, a: ExprId, b: ExprId) -> bool {
        if a == b {
            return true;
        }
        match (self.node(a), self.node(b)) {
            (ExprNode::Literal(x), ExprNode::Literal(y)) => x == y,
            (ExprNode::Path(x), ExprNode::Path(y)) => x == y,
            (ExprNode::Wildcard, ExprNode::Wildcard) => true,
            (ExprNode::PositionalParam(x), ExprNode::PositionalParam(y)) => x == y,
            (ExprNode::NamedParam(x), ExprNode::NamedParam(y)) => x == y,
            (
                ExprNode::Binary {
                    op: oa,
                    left: la,
                    right: ra,
                },
                ExprNode::Binary {
                    op: ob,
                    left: lb,
                    right: rb,
                },
            ) => oa == ob && self.expr_eq(*la, *lb) && self.expr_eq(*ra, *rb),
            (
                ExprNode::Unary { op: oa, operand: a },
                ExprNode::Unary { op: ob, operand: b },
            ) => oa == ob && self.expr_eq(*a, *b),
            (ExprNode::Cast { expr: ea, to: ta }, ExprNode::Cast { expr: eb, to: tb }) => {
                ta == tb && self.expr_eq(*ea, *eb)
            }
            (
                ExprNode::Function { name: na, args: aa },
                ExprNode::Function { name: nb, args: ab },
            ) => {
                na == nb
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| self.expr_eq(*x, *y))
            }
            (
                ExprNode::Between {
                    expr: ea,
                    negated: na,
                    low: la,
                    high: ha,
                },
                ExprNode::Between {
                    expr: eb,
                    negated: nb,
                    low: lb,
                    high: hb,
                },
            ) => {
                na == nb
                    && self.expr_eq(*ea, *eb)
                    && self.expr_eq(*la, *lb)
                    && self.expr_eq(*ha, *hb)
            }
            (
                ExprNode::InList {
                    expr: ea,
                    list: la,
                    negated: na,
                },
                ExprNode::InList {
                    expr: eb,
                    list: lb,
                    negated: nb,
                },
            ) => {
                na == nb
                    && self.expr_eq(*ea, *eb)
                    && la.len() == lb.len()
                    && la.iter().zip(lb).all(|(x, y)| self.expr_eq(*x, *y))
            }
            (ExprNode::ArrayExpr(xa), ExprNode::ArrayExpr(xb)) => {
                xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| self.expr_eq(*x, *y))
            }
            (ExprNode::ObjectExpr(fa), ExprNode::ObjectExpr(fb)) => {
                fa.len() == fb.len()
                    && fa
                        .iter()
                        .zip(fb)
                        .all(|((n1, e1), (n2, e2))| n1 == n2 && self.expr_eq(*e1, *e2))
            }
            _ => false,
        }
    }

    /// Evaluates `id` in `env`.
    pub fn eval(&self, id: ExprId, env: &Environment<'_>) -> Result<Value> {
        match self.node(id) {
            ExprNode::Literal(v) => Ok(v.clone()),
            ExprNode::Path(path) => {
                let Some(row) = env.row() else {
                    return Ok(Value::Null);
                };
                Ok(row.object()?.get_path(path).cloned().unwrap_or(Value::Null))
            }
            ExprNode::Wildcard => Err(Error::Runtime(
                "wildcard is only valid in a projection".into(),
            )),
            ExprNode::PositionalParam(idx) => env.positional_param(*idx),
            ExprNode::NamedParam(name) => env.named_param(name),
            ExprNode::Binary { op, left, right } => self.eval_binary(*op, *left, *right, env),
            ExprNode::Unary { op, operand } => {
                let v = self.eval(*operand, env)?;
                match op {
                    UnaryOp::Neg => match v {
                        Value::Null => Ok(Value::Null),
                        Value::Integer(i) => Ok(Value::Integer(-i)),
                        Value::Double(d) => Ok(Value::Double(-d)),
                        other => Err(Error::Type(format!(
                            "cannot negate a {}",
                            other.kind()
                        ))),
                    },
                    UnaryOp::Not => Ok(Value::Boolean(!v.is_truthy())),
                }
            }
            ExprNode::Cast { expr, to } => self.eval(*expr, env)?.cast(*to),
            ExprNode::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let v = self.eval(*expr, env)?;
                let lo = self.eval(*low, env)?;
                let hi = self.eval(*high, env)?;
                if v.is_null() || lo.is_null() || hi.is_null() {
                    return Ok(Value::Null);
                }
                let inside = matches!(
                    v.compare(&lo),
                    Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                ) && matches!(
                    v.compare(&hi),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                );
                Ok(Value::Boolean(inside != *negated))
            }
            ExprNode::InList {
                expr,
                list,
                negated,
            } => {
                let v = self.eval(*expr, env)?;
                if v.is_null() {
                    return Ok(Value::Null);
                }
                let mut found = false;
                for item in list {
                    if self.eval(*item, env)? == v {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Boolean(found != *negated))
            }
            ExprNode::Function { name, args } => self.eval_function(name, args, env),
            ExprNode::ObjectExpr(fields) => {
                let mut obj = Object::new();
                for (name, expr) in fields {
                    obj.set(name, self.eval(*expr, env)?);
                }
                Ok(Value::Object(obj))
            }
            ExprNode::ArrayExpr(items) => {
                let mut vals = Vec::with_capacity(items.len());
                for item in items {
                    vals.push(self.eval(*item, env)?);
                }
                Ok(Value::Array(vals))
            }
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        env: &Environment<'_>,
    ) -> Result<Value> {
        // AND/OR evaluate left-first and short-circuit on truthiness.
        match op {
            BinaryOp::And => {
                if !self.eval(left, env)?.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                return Ok(Value::Boolean(self.eval(right, env)?.is_truthy()));
            }
            BinaryOp::Or => {
                if self.eval(left, env)?.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                return Ok(Value::Boolean(self.eval(right, env)?.is_truthy()));
            }
            _ => {}
        }

        let a = self.eval(left, env)?;
        let b = self.eval(right, env)?;

        match op {
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt
            | BinaryOp::GtEq => {
                if a.is_null() || b.is_null() {
                    return Ok(Value::Null);
                }
                use std::cmp::Ordering::*;
                let cmp = a.compare(&b);
                let result = match op {
                    BinaryOp::Eq => cmp == Some(Equal),
                    BinaryOp::NotEq => cmp != Some(Equal),
                    BinaryOp::Lt => cmp == Some(Less),
                    BinaryOp::LtEq => matches!(cmp, Some(Less | Equal)),
                    BinaryOp::Gt => cmp == Some(Greater),
                    BinaryOp::GtEq => matches!(cmp, Some(Greater | Equal)),
                    _ => unreachable!(),
                };
                Ok(Value::Boolean(result))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                arithmetic(op, &a, &b)
            }
            BinaryOp::Concat => match (&a, &b) {
                (Value::Text(x), Value::Text(y)) => Ok(Value::Text(format!("{x}{y}"))),
                _ => Ok(Value::Null),
            },
            BinaryOp::And | BinaryOp::Or => unreachable!(),
        }
    }

    fn eval_function(
        &self,
        name: &str,
        args: &[ExprId],
        env: &Environment<'_>,
    ) -> Result<Value> {
        if matches!(name, "typeof" | "len" | "abs") && args.len() != 1 {
            return Err(Error::Runtime(format!(
                "{name}() takes 1 argument, got {}",
                args.len()
            )));
        }
        match name {
            "pk" => {
                let Some(key) = env.row().and_then(|r| r.key()) else {
                    return Ok(Value::Null);
                };
                Ok(Value::Array(key.values()?.to_vec()))
            }
            "typeof" => {
                let v = self.eval(args[0], env)?;
                Ok(Value::Text(v.kind().to_string()))
            }
            "len" => {
                let v = self.eval(args[0], env)?;
                match v {
                    Value::Null => Ok(Value::Null),
                    Value::Text(s) => Ok(Value::Integer(s.chars().count() as i64)),
                    Value::Blob(b) => Ok(Value::Integer(b.len() as i64)),
                    Value::Array(a) => Ok(Value::Integer(a.len() as i64)),
                    Value::Object(o) => Ok(Value::Integer(o.len() as i64)),
                    other => Err(Error::Type(format!("len() expects a sized value, got {}", other.kind()))),
                }
            }
            "abs" => {
                let v = self.eval(args[0], env)?;
                match v {
                    Value::Null => Ok(Value::Null),
                    Value::Integer(i) => Ok(Value::Integer(i.abs())),
                    Value::Double(d) => Ok(Value::Double(d.abs())),
                    other => Err(Error::Type(format!("abs() expects a number, got {}", other.kind()))),
                }
            }
            "coalesce" => {
                for arg in args {
                    let v = self.eval(*arg, env)?;
                    if !v.is_null() {
                        return Ok(v);
                    }
                }
                Ok(Value::Null)
            }
            other => Err(Error::Runtime(format!("no such function: {other}"))),
        }
    }

    /// Returns a displayable handle for `id`.
    pub fn display(&self, id: ExprId) -> ExprDisplay<'_> {
        ExprDisplay { arena: self, id }
    }
}

fn arithmetic(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            let (x, y) = (*x, *y);
            match op {
                // Integer overflow promotes to double rather than wrapping.
                BinaryOp::Add => Ok(x
                    .checked_add(y)
                    .map(Value::Integer)
                    .unwrap_or(Value::Double(x as f64 + y as f64))),
                BinaryOp::Sub => Ok(x
                    .checked_sub(y)
                    .map(Value::Integer)
                    .unwrap_or(Value::Double(x as f64 - y as f64))),
                BinaryOp::Mul => Ok(x
                    .checked_mul(y)
                    .map(Value::Integer)
                    .unwrap_or(Value::Double(x as f64 * y as f64))),
                BinaryOp::Div => {
                    if y == 0 {
                        Err(Error::Runtime("division by zero".into()))
                    } else {
                        Ok(Value::Integer(x / y))
                    }
                }
                BinaryOp::Mod => {
                    if y == 0 {
                        Err(Error::Runtime("division by zero".into()))
                    } else {
                        Ok(Value::Integer(x % y))
                    }
                }
                _ => unreachable!(),
            }
        }
        _ => {
            let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
                return Err(Error::Type(format!(
                    "cannot apply {} to {} and {}",
                    op.symbol(),
                    a.kind(),
                    b.kind()
                )));
            };
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                // Double division follows IEEE semantics.
                BinaryOp::Div => x / y,
                BinaryOp::Mod => x % y,
                _ => unreachable!(),
            };
            Ok(Value::Double(result))
        }
    }
}

/// Displays an expression as SQL-ish text; stable, used in plan output.
pub struct ExprDisplay<'a> {
    arena: &'a ExprArena,
    id: ExprId,
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = |id: ExprId| self.arena.display(id);
        match self.arena.node(self.id) {
            ExprNode::Literal(v) => write!(f, "{v}"),
            ExprNode::Path(p) => write!(f, "{p}"),
            ExprNode::Wildcard => write!(f, "*"),
            ExprNode::PositionalParam(_) => write!(f, "?"),
            ExprNode::NamedParam(name) => write!(f, "${name}"),
            ExprNode::Binary { op, left, right } => {
                write!(f, "{} {} {}", d(*left), op.symbol(), d(*right))
            }
            ExprNode::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{}", d(*operand)),
                UnaryOp::Not => write!(f, "NOT {}", d(*operand)),
            },
            ExprNode::Cast { expr, to } => write!(f, "CAST({} AS {})", d(*expr), to),
            ExprNode::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {not}BETWEEN {} AND {}", d(*expr), d(*low), d(*high))
            }
            ExprNode::InList {
                expr,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {not}IN (", d(*expr))?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", d(*item))?;
                }
                write!(f, ")")
            }
            ExprNode::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", d(*arg))?;
                }
                write!(f, ")")
            }
            ExprNode::ObjectExpr(fields) => {
                write!(f, "{{")?;
                for (i, (name, expr)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {}", d(*expr))?;
                }
                write!(f, "}}")
            }
            ExprNode::ArrayExpr(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", d(*item))?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Row;

    fn env_with_row(pairs: Vec<(&str, Value)>) -> (Environment<'static>, Row) {
        let obj = Object::from_pairs(pairs.into_iter().map(|(n, v)| (n.to_string(), v)));
        (Environment::default(), Row::from_object(obj))
    }

    fn eval_with(
        arena: &ExprArena,
        id: ExprId,
        pairs: Vec<(&str, Value)>,
    ) -> Result<Value> {
        let (base, row) = env_with_row(pairs);
        let env = base.with_row(row);
        arena.eval(id, &env)
    }

    #[test]
    fn test_eval_comparison() {
        let mut arena = ExprArena::new();
        let age = arena.push(ExprNode::Path(Path::field("age")));
        let ten = arena.push(ExprNode::Literal(Value::Integer(10)));
        let cmp = arena.push(ExprNode::Binary {
            op: BinaryOp::Eq,
            left: age,
            right: ten,
        });

        assert_eq!(
            eval_with(&arena, cmp, vec![("age", Value::Integer(10))]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval_with(&arena, cmp, vec![("age", Value::Integer(11))]).unwrap(),
            Value::Boolean(false)
        );
        // Missing field evaluates to NULL, and NULL comparisons yield NULL.
        assert_eq!(eval_with(&arena, cmp, vec![]).unwrap(), Value::Null);
    }

    #[test]
    fn test_integer_division_by_zero_errors() {
        let mut arena = ExprArena::new();
        let one = arena.push(ExprNode::Literal(Value::Integer(1)));
        let zero = arena.push(ExprNode::Literal(Value::Integer(0)));
        let div = arena.push(ExprNode::Binary {
            op: BinaryOp::Div,
            left: one,
            right: zero,
        });
        assert!(eval_with(&arena, div, vec![]).is_err());
    }

    #[test]
    fn test_double_division_follows_ieee() {
        let mut arena = ExprArena::new();
        let one = arena.push(ExprNode::Literal(Value::Double(1.0)));
        let zero = arena.push(ExprNode::Literal(Value::Double(0.0)));
        let div = arena.push(ExprNode::Binary {
            op: BinaryOp::Div,
            left: one,
            right: zero,
        });
        match eval_with(&arena, div, vec![]).unwrap() {
            Value::Double(d) => assert!(d.is_infinite()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_integer_overflow_promotes_to_double() {
        let mut arena = ExprArena::new();
        let max = arena.push(ExprNode::Literal(Value::Integer(i64::MAX)));
        let one = arena.push(ExprNode::Literal(Value::Integer(1)));
        let add = arena.push(ExprNode::Binary {
            op: BinaryOp::Add,
            left: max,
            right: one,
        });
        assert!(matches!(
            eval_with(&arena, add, vec![]).unwrap(),
            Value::Double(_)
        ));
    }

    #[test]
    fn test_between_and_in() {
        let mut arena = ExprArena::new();
        let x = arena.push(ExprNode::Path(Path::field("x")));
        let one = arena.push(ExprNode::Literal(Value::Integer(1)));
        let five = arena.push(ExprNode::Literal(Value::Integer(5)));
        let between = arena.push(ExprNode::Between {
            expr: x,
            negated: false,
            low: one,
            high: five,
        });
        let inlist = arena.push(ExprNode::InList {
            expr: x,
            list: vec![one, five],
            negated: false,
        });

        assert_eq!(
            eval_with(&arena, between, vec![("x", Value::Integer(3))]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval_with(&arena, between, vec![("x", Value::Integer(9))]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            eval_with(&arena, inlist, vec![("x", Value::Integer(5))]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval_with(&arena, inlist, vec![("x", Value::Integer(2))]).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_builtin_functions() {
        let mut arena = ExprArena::new();
        let text = arena.push(ExprNode::Literal(Value::Text("hello".into())));
        let len = arena.push(ExprNode::Function {
            name: "len".into(),
            args: vec![text],
        });
        assert_eq!(eval_with(&arena, len, vec![]).unwrap(), Value::Integer(5));

        let neg = arena.push(ExprNode::Literal(Value::Integer(-3)));
        let abs = arena.push(ExprNode::Function {
            name: "abs".into(),
            args: vec![neg],
        });
        assert_eq!(eval_with(&arena, abs, vec![]).unwrap(), Value::Integer(3));

        let null = arena.push(ExprNode::Literal(Value::Null));
        let coalesce = arena.push(ExprNode::Function {
            name: "coalesce".into(),
            args: vec![null, abs],
        });
        assert_eq!(
            eval_with(&arena, coalesce, vec![]).unwrap(),
            Value::Integer(3)
        );

        let unknown = arena.push(ExprNode::Function {
            name: "nope".into(),
            args: vec![],
        });
        assert!(eval_with(&arena, unknown, vec![]).is_err());
    }

    #[test]
    fn test_object_constructor() {
        let mut arena = ExprArena::new();
        let one = arena.push(ExprNode::Literal(Value::Integer(1)));
        let a = arena.push(ExprNode::Path(Path::field("a")));
        let obj = arena.push(ExprNode::ObjectExpr(vec![
            ("x".into(), one),
            ("y".into(), a),
        ]));
        let v = eval_with(&arena, obj, vec![("a", Value::Integer(7))]).unwrap();
        match v {
            Value::Object(o) => {
                assert_eq!(o.get("x"), Some(&Value::Integer(1)));
                assert_eq!(o.get("y"), Some(&Value::Integer(7)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let mut arena = ExprArena::new();
        let age = arena.push(ExprNode::Path(Path::field("age")));
        let ten = arena.push(ExprNode::Literal(Value::Integer(10)));
        let cmp = arena.push(ExprNode::Binary {
            op: BinaryOp::Eq,
            left: age,
            right: ten,
        });
        assert_eq!(arena.display(cmp).to_string(), "age = 10");

        let pk = arena.push(ExprNode::Function {
            name: "pk".into(),
            args: vec![],
        });
        assert_eq!(arena.display(pk).to_string(), "pk()");
    }

    #[test]
    fn test_structural_equality() {
        let mut arena = ExprArena::new();
        let a1 = arena.push(ExprNode::Path(Path::field("a")));
        let a2 = arena.push(ExprNode::Path(Path::field("a")));
        let one1 = arena.push(ExprNode::Literal(Value::Integer(1)));
        let one2 = arena.push(ExprNode::Literal(Value::Integer(1)));
        let e1 = arena.push(ExprNode::Binary {
            op: BinaryOp::Gt,
            left: a1,
            right: one1,
        });
        let e2 = arena.push(ExprNode::Binary {
            op: BinaryOp::Gt,
            left: a2,
            right: one2,
        });
        let e3 = arena.push(ExprNode::Binary {
            op: BinaryOp::Lt,
            left: a1,
            right: one1,
        });

        assert!(arena.expr_eq(e1, e2));
        assert!(!arena.expr_eq(e1, e3));
    }
}
