//! Transformation of `sqlparser` expressions into the engine arena.

use sqlparser::ast as sql_ast;

use crate::error::{Error, Result};
use crate::expr::{BinaryOp, ExprId, ExprNode, UnaryOp, BUILTIN_FUNCTIONS};
use crate::object::{Path, PathStep};
use crate::parser::TransformCtx;
use crate::value::{Value, ValueKind};

/// Transforms one sqlparser expression into an arena node.
pub(crate) fn transform(expr: sql_ast::Expr, ctx: &mut TransformCtx) -> Result<ExprId> {
    let node = match expr {
        sql_ast::Expr::Identifier(ident) => ExprNode::Path(Path::field(ident.value)),
        sql_ast::Expr::CompoundIdentifier(idents) => ExprNode::Path(Path::new(
            idents
                .into_iter()
                .map(|i| PathStep::Field(i.value))
                .collect(),
        )),
        sql_ast::Expr::Value(value) => return transform_value(value, ctx),
        sql_ast::Expr::Nested(inner) => return transform(*inner, ctx),
        sql_ast::Expr::BinaryOp { left, op, right } => {
            let op = transform_binary_op(op)?;
            let left = transform(*left, ctx)?;
            let right = transform(*right, ctx)?;
            ExprNode::Binary { op, left, right }
        }
        sql_ast::Expr::UnaryOp { op, expr } => {
            let operand = transform(*expr, ctx)?;
            match op {
                sql_ast::UnaryOperator::Minus => ExprNode::Unary {
                    op: UnaryOp::Neg,
                    operand,
                },
                sql_ast::UnaryOperator::Not => ExprNode::Unary {
                    op: UnaryOp::Not,
                    operand,
                },
                sql_ast::UnaryOperator::Plus => return Ok(operand),
                other => {
                    return Err(Error::Parse(format!("unsupported operator: {other}")))
                }
            }
        }
        sql_ast::Expr::Cast {
            expr, data_type, ..
        } => ExprNode::Cast {
            expr: transform(*expr, ctx)?,
            to: transform_data_type(&data_type)?,
        },
        sql_ast::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => ExprNode::Between {
            expr: transform(*expr, ctx)?,
            negated,
            low: transform(*low, ctx)?,
            high: transform(*high, ctx)?,
        },
        sql_ast::Expr::InList {
            expr,
            list,
            negated,
        } => {
            let expr = transform(*expr, ctx)?;
            let list = list
                .into_iter()
                .map(|e| transform(e, ctx))
                .collect::<Result<Vec<_>>>()?;
            ExprNode::InList {
                expr,
                list,
                negated,
            }
        }
        sql_ast::Expr::IsNull(inner) => {
            // `x IS NULL` compiles to typeof(x) = "null"; a dedicated
            // node is not worth carrying for one predicate.
            let operand = transform(*inner, ctx)?;
            let type_of = ctx.arena.push(ExprNode::Function {
                name: "typeof".into(),
                args: vec![operand],
            });
            let null_text = ctx
                .arena
                .push(ExprNode::Literal(Value::Text("null".into())));
            ExprNode::Binary {
                op: BinaryOp::Eq,
                left: type_of,
                right: null_text,
            }
        }
        sql_ast::Expr::IsNotNull(inner) => {
            let operand = transform(*inner, ctx)?;
            let type_of = ctx.arena.push(ExprNode::Function {
                name: "typeof".into(),
                args: vec![operand],
            });
            let null_text = ctx
                .arena
                .push(ExprNode::Literal(Value::Text("null".into())));
            ExprNode::Binary {
                op: BinaryOp::NotEq,
                left: type_of,
                right: null_text,
            }
        }
        sql_ast::Expr::Function(func) => return transform_function(func, ctx),
        sql_ast::Expr::Array(array) => {
            let items = array
                .elem
                .into_iter()
                .map(|e| transform(e, ctx))
                .collect::<Result<Vec<_>>>()?;
            ExprNode::ArrayExpr(items)
        }
        other => {
            return Err(Error::Parse(format!(
                "unsupported expression: {other}"
            )))
        }
    };
    Ok(ctx.arena.push(node))
}

fn transform_value(value: sql_ast::Value, ctx: &mut TransformCtx) -> Result<ExprId> {
    let node = match value {
        sql_ast::Value::Null => ExprNode::Literal(Value::Null),
        sql_ast::Value::Boolean(b) => ExprNode::Literal(Value::Boolean(b)),
        sql_ast::Value::Number(text, _) => {
            if let Ok(i) = text.parse::<i64>() {
                ExprNode::Literal(Value::Integer(i))
            } else {
                let d = text
                    .parse::<f64>()
                    .map_err(|_| Error::Parse(format!("invalid number literal: {text}")))?;
                ExprNode::Literal(Value::Double(d))
            }
        }
        sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
            ExprNode::Literal(Value::Text(s))
        }
        sql_ast::Value::Placeholder(text) => {
            if text == "?" {
                ctx.positional += 1;
                ExprNode::PositionalParam(ctx.positional)
            } else if let Some(name) = text.strip_prefix('$') {
                ExprNode::NamedParam(name.to_string())
            } else {
                return Err(Error::Parse(format!("unsupported placeholder: {text}")));
            }
        }
        other => return Err(Error::Parse(format!("unsupported literal: {other}"))),
    };
    Ok(ctx.arena.push(node))
}

fn transform_binary_op(op: sql_ast::BinaryOperator) -> Result<BinaryOp> {
    Ok(match op {
        sql_ast::BinaryOperator::Eq => BinaryOp::Eq,
        sql_ast::BinaryOperator::NotEq => BinaryOp::NotEq,
        sql_ast::BinaryOperator::Lt => BinaryOp::Lt,
        sql_ast::BinaryOperator::LtEq => BinaryOp::LtEq,
        sql_ast::BinaryOperator::Gt => BinaryOp::Gt,
        sql_ast::BinaryOperator::GtEq => BinaryOp::GtEq,
        sql_ast::BinaryOperator::And => BinaryOp::And,
        sql_ast::BinaryOperator::Or => BinaryOp::Or,
        sql_ast::BinaryOperator::Plus => BinaryOp::Add,
        sql_ast::BinaryOperator::Minus => BinaryOp::Sub,
        sql_ast::BinaryOperator::Multiply => BinaryOp::Mul,
        sql_ast::BinaryOperator::Divide => BinaryOp::Div,
        sql_ast::BinaryOperator::Modulo => BinaryOp::Mod,
        sql_ast::BinaryOperator::StringConcat => BinaryOp::Concat,
        other => return Err(Error::Parse(format!("unsupported operator: {other}"))),
    })
}

fn transform_function(func: sql_ast::Function, ctx: &mut TransformCtx) -> Result<ExprId> {
    let sql_ast::Function { name, args, .. } = func;
    let name = name.to_string().to_lowercase();
    if !BUILTIN_FUNCTIONS.contains(&name.as_str()) {
        return Err(Error::Parse(format!("no such function: {name}")));
    }

    let mut arg_ids = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            sql_ast::FunctionArg::Unnamed(sql_ast::FunctionArgExpr::Expr(e)) => {
                arg_ids.push(transform(e, ctx)?);
            }
            other => {
                return Err(Error::Parse(format!(
                    "unsupported function argument: {other}"
                )))
            }
        }
    }

    let expected = match name.as_str() {
        "pk" => 0,
        "coalesce" => arg_ids.len().max(1),
        _ => 1,
    };
    if arg_ids.len() != expected {
        return Err(Error::Parse(format!(
            "{name}() takes {expected} argument(s), got {}",
            arg_ids.len()
        )));
    }

    Ok(ctx.arena.push(ExprNode::Function {
        name,
        args: arg_ids,
    }))
}

/// Maps a SQL column type to a value kind.
pub(crate) fn transform_data_type(data_type: &sql_ast::DataType) -> Result<ValueKind> {
    use sql_ast::DataType::*;
    Ok(match data_type {
        TinyInt(_) | SmallInt(_) | Int(_) | Integer(_) | BigInt(_) => ValueKind::Integer,
        Real | Float(_) | Double | DoublePrecision => ValueKind::Double,
        Boolean => ValueKind::Boolean,
        Text | Varchar(_) | Char(_) | CharacterVarying(_) | Character(_) => ValueKind::Text,
        Timestamp(_, _) => ValueKind::Timestamp,
        Bytea | Blob(_) | Binary(_) | Varbinary(_) => ValueKind::Blob,
        Array(_) => ValueKind::Array,
        JSON => ValueKind::Object,
        other => {
            return Err(Error::Parse(format!("unsupported column type: {other}")))
        }
    })
}
