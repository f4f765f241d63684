//! SQL front end.
//!
//! Parsing is built on the `sqlparser` crate: expressions, SELECT bodies
//! and DDL statements go through its PostgreSQL-style grammar and are
//! transformed into the engine's internal AST. The statements whose
//! grammar it does not cover (`UPDATE ... UNSET`, the `ON CONFLICT`
//! action set, `DELETE` with ORDER BY/LIMIT) are parsed by driving
//! `sqlparser`'s token-level parser directly.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser as SqlParser;
use sqlparser::tokenizer::Token;

use crate::error::{Error, Result};
use crate::expr::{ExprArena, ExprId};

mod expr;
mod stmt;

pub use stmt::{
    CreateIndexStmt, CreateSequenceStmt, CreateTableStmt, DeleteStmt, DropStmt, FieldDef,
    InsertSource, InsertStmt, OnConflictAction, OrderBy, SelectStmt, Statement, UpdateStmt,
};

impl From<sqlparser::parser::ParserError> for Error {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Error::Parse(err.to_string())
    }
}

/// A parsed query: its statements plus the expression arena they share.
#[derive(Debug)]
pub struct ParsedQuery {
    pub statements: Vec<Statement>,
    pub arena: ExprArena,
}

/// Shared state of one parse: the arena under construction and the
/// running count of `?` placeholders (they number from 1, in order of
/// appearance).
pub(crate) struct TransformCtx {
    pub arena: ExprArena,
    pub positional: usize,
}

/// The SQL parser.
pub struct Parser;

impl Parser {
    /// Parses a semicolon-separated list of statements.
    pub fn parse(sql: &str) -> Result<ParsedQuery> {
        if sql.trim().is_empty() {
            return Err(Error::Parse("empty query".into()));
        }

        let dialect = PostgreSqlDialect {};
        let mut parser = SqlParser::new(&dialect).try_with_sql(sql)?;
        let mut ctx = TransformCtx {
            arena: ExprArena::new(),
            positional: 0,
        };

        let mut statements = Vec::new();
        loop {
            while parser.consume_token(&Token::SemiColon) {}
            if parser.peek_token().token == Token::EOF {
                break;
            }
            statements.push(stmt::parse_statement(&mut parser, &mut ctx)?);

            match parser.peek_token().token {
                Token::SemiColon | Token::EOF => {}
                other => {
                    return Err(Error::Parse(format!(
                        "unexpected token after statement: {other}"
                    )))
                }
            }
        }

        if statements.is_empty() {
            return Err(Error::Parse("empty query".into()));
        }

        Ok(ParsedQuery {
            statements,
            arena: ctx.arena,
        })
    }

    /// Parses a single statement.
    pub fn parse_one(sql: &str) -> Result<(Statement, ExprArena)> {
        let mut parsed = Self::parse(sql)?;
        if parsed.statements.len() != 1 {
            return Err(Error::Parse(format!(
                "expected 1 statement, got {}",
                parsed.statements.len()
            )));
        }
        Ok((parsed.statements.remove(0), parsed.arena))
    }

    /// Parses a standalone expression into `arena`. Used to recompile
    /// catalog CHECK constraints per statement.
    pub fn parse_expr_into(arena: &mut ExprArena, sql: &str) -> Result<ExprId> {
        let dialect = PostgreSqlDialect {};
        let mut parser = SqlParser::new(&dialect).try_with_sql(sql)?;
        let sql_expr = parser.parse_expr()?;

        let mut ctx = TransformCtx {
            arena: std::mem::take(arena),
            positional: 0,
        };
        let id = expr::transform(sql_expr, &mut ctx)?;
        *arena = ctx.arena;
        Ok(id)
    }
}
