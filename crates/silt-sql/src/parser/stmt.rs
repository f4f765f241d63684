//! Statement parsing and the internal AST.
//!
//! `parse_statement` dispatches on the leading keyword. SELECT and the
//! DDL statements ride sqlparser's own grammar and get transformed;
//! INSERT, UPDATE and DELETE are parsed with sqlparser's token-level
//! primitives because their tails deviate from standard SQL
//! (`ON CONFLICT {DO REPLACE | REPLACE | IGNORE}`, `UNSET`, `DELETE ...
//! ORDER BY/LIMIT/OFFSET`).

use sqlparser::ast as sql_ast;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser as SqlParser;
use sqlparser::tokenizer::Token;

use crate::error::{Error, Result};
use crate::expr::{ExprId, ExprNode};
use crate::object::{Path, PathStep};
use crate::parser::{expr, TransformCtx};
use crate::value::ValueKind;

/// A parsed statement.
#[derive(Debug)]
pub enum Statement {
    CreateTable(CreateTableStmt),
    DropTable(DropStmt),
    CreateIndex(CreateIndexStmt),
    DropIndex(DropStmt),
    CreateSequence(CreateSequenceStmt),
    DropSequence(DropStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Select(SelectStmt),
    Begin { read_only: bool },
    Commit,
    Rollback,
}

impl Statement {
    /// Returns true when the statement performs no writes.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Statement::Select(_))
    }
}

/// One declared column.
#[derive(Debug)]
pub struct FieldDef {
    pub path: Path,
    pub kind: ValueKind,
    pub not_null: bool,
    /// Default expression; evaluated once when the table is created.
    pub default: Option<ExprId>,
}

/// CREATE TABLE.
#[derive(Debug)]
pub struct CreateTableStmt {
    pub name: String,
    pub if_not_exists: bool,
    pub fields: Vec<FieldDef>,
    pub primary_key: Option<Vec<Path>>,
    /// CHECK constraints, as SQL text.
    pub checks: Vec<String>,
    /// UNIQUE constraints; each becomes a unique index.
    pub unique: Vec<Vec<Path>>,
}

/// CREATE INDEX.
#[derive(Debug)]
pub struct CreateIndexStmt {
    pub name: String,
    pub table: String,
    pub paths: Vec<Path>,
    pub unique: bool,
    pub if_not_exists: bool,
}

/// CREATE SEQUENCE.
#[derive(Debug)]
pub struct CreateSequenceStmt {
    pub name: String,
    pub if_not_exists: bool,
    pub start: i64,
}

/// DROP TABLE / INDEX / SEQUENCE.
#[derive(Debug)]
pub struct DropStmt {
    pub name: String,
    pub if_exists: bool,
}

/// The row source of an INSERT.
#[derive(Debug)]
pub enum InsertSource {
    /// `VALUES (..), (..)` tuples.
    Values(Vec<Vec<ExprId>>),
    /// `INSERT INTO ... SELECT`.
    Select(Box<SelectStmt>),
}

/// The accepted ON CONFLICT actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflictAction {
    DoNothing,
    DoReplace,
}

/// INSERT.
#[derive(Debug)]
pub struct InsertStmt {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
    pub on_conflict: Option<OnConflictAction>,
    pub returning: Vec<(ExprId, Option<String>)>,
}

/// UPDATE. Exactly one of `set`/`unset` is non-empty.
#[derive(Debug)]
pub struct UpdateStmt {
    pub table: String,
    pub set: Vec<(Path, ExprId)>,
    pub unset: Vec<Path>,
    pub filter: Option<ExprId>,
}

/// A single ORDER BY term.
#[derive(Debug, Clone, Copy)]
pub struct OrderBy {
    pub expr: ExprId,
    pub desc: bool,
}

/// DELETE.
#[derive(Debug)]
pub struct DeleteStmt {
    pub table: String,
    pub filter: Option<ExprId>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// SELECT.
#[derive(Debug)]
pub struct SelectStmt {
    pub table: Option<String>,
    pub projection: Vec<(ExprId, Option<String>)>,
    pub filter: Option<ExprId>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parses the next statement off the token stream.
pub(crate) fn parse_statement(
    parser: &mut SqlParser<'_>,
    ctx: &mut TransformCtx,
) -> Result<Statement> {
    let keyword = match &parser.peek_token().token {
        Token::Word(w) => w.keyword,
        other => return Err(Error::Parse(format!("unexpected token: {other}"))),
    };

    match keyword {
        Keyword::SELECT => {
            let query = parser.parse_query()?;
            Ok(Statement::Select(transform_query(query, ctx)?))
        }
        Keyword::INSERT => parse_insert(parser, ctx),
        Keyword::UPDATE => parse_update(parser, ctx),
        Keyword::DELETE => parse_delete(parser, ctx),
        _ => {
            let stmt = parser.parse_statement()?;
            transform_sql_statement(stmt, ctx)
        }
    }
}

// =============================================================================
// Token-level grammars
// =============================================================================

fn parse_insert(parser: &mut SqlParser<'_>, ctx: &mut TransformCtx) -> Result<Statement> {
    parser.expect_keyword(Keyword::INSERT)?;
    parser.expect_keyword(Keyword::INTO)?;
    let table = object_name_to_string(parser.parse_object_name(false)?)?;

    let columns: Vec<String> = parser
        .parse_parenthesized_column_list(sqlparser::parser::IsOptional::Optional, false)?
        .into_iter()
        .map(|i| i.value)
        .collect();

    let source = if parser.parse_keyword(Keyword::VALUES) {
        let rows = parser.parse_comma_separated(|p| {
            p.expect_token(&Token::LParen)?;
            let exprs = p.parse_comma_separated(SqlParser::parse_expr)?;
            p.expect_token(&Token::RParen)?;
            Ok(exprs)
        })?;

        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            if !columns.is_empty() && row.len() != columns.len() {
                return Err(Error::Parse(format!(
                    "{} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            let tuple = row
                .into_iter()
                .map(|e| expr::transform(e, ctx))
                .collect::<Result<Vec<_>>>()?;
            tuples.push(tuple);
        }
        InsertSource::Values(tuples)
    } else if matches!(
        &parser.peek_token().token,
        Token::Word(w) if w.keyword == Keyword::SELECT
    ) {
        let query = parser.parse_query()?;
        InsertSource::Select(Box::new(transform_query(query, ctx)?))
    } else {
        return Err(Error::Parse("expected VALUES or SELECT".into()));
    };

    let on_conflict = if parser.parse_keywords(&[Keyword::ON, Keyword::CONFLICT]) {
        if parser.parse_keyword(Keyword::DO) {
            if parser.parse_keyword(Keyword::NOTHING) {
                Some(OnConflictAction::DoNothing)
            } else if parser.parse_keyword(Keyword::REPLACE) {
                Some(OnConflictAction::DoReplace)
            } else {
                return Err(Error::Parse(format!(
                    "unknown ON CONFLICT action: {}",
                    parser.peek_token()
                )));
            }
        } else if parser.parse_keyword(Keyword::REPLACE) {
            Some(OnConflictAction::DoReplace)
        } else if parser.parse_keyword(Keyword::IGNORE) {
            Some(OnConflictAction::DoNothing)
        } else {
            return Err(Error::Parse(format!(
                "unknown ON CONFLICT action: {}",
                parser.peek_token()
            )));
        }
    } else {
        None
    };

    let returning = if parser.parse_keyword(Keyword::RETURNING) {
        let items = parser.parse_comma_separated(SqlParser::parse_select_item)?;
        items
            .into_iter()
            .map(|item| transform_select_item(item, ctx))
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(Statement::Insert(InsertStmt {
        table,
        columns,
        source,
        on_conflict,
        returning,
    }))
}

fn parse_update(parser: &mut SqlParser<'_>, ctx: &mut TransformCtx) -> Result<Statement> {
    parser.expect_keyword(Keyword::UPDATE)?;
    let table = object_name_to_string(parser.parse_object_name(false)?)?;

    let mut set = Vec::new();
    let mut unset = Vec::new();

    if parser.parse_keyword(Keyword::SET) {
        let pairs = parser.parse_comma_separated(|p| {
            let name = p.parse_object_name(false)?;
            p.expect_token(&Token::Eq)?;
            let value = p.parse_expr()?;
            Ok((name, value))
        })?;
        for (name, value) in pairs {
            set.push((object_name_to_path(name), expr::transform(value, ctx)?));
        }
    } else if parse_unset_keyword(parser) {
        let paths = parser.parse_comma_separated(|p| p.parse_object_name(false))?;
        unset = paths.into_iter().map(object_name_to_path).collect();
    } else {
        return Err(Error::Parse("expected SET or UNSET".into()));
    }

    let filter = if parser.parse_keyword(Keyword::WHERE) {
        Some(expr::transform(parser.parse_expr()?, ctx)?)
    } else {
        None
    };

    Ok(Statement::Update(UpdateStmt {
        table,
        set,
        unset,
        filter,
    }))
}

/// `UNSET` is not a sqlparser keyword; match it as a bare word.
fn parse_unset_keyword(parser: &mut SqlParser<'_>) -> bool {
    match &parser.peek_token().token {
        Token::Word(w) if w.value.eq_ignore_ascii_case("UNSET") => {
            parser.next_token();
            true
        }
        _ => false,
    }
}

fn parse_delete(parser: &mut SqlParser<'_>, ctx: &mut TransformCtx) -> Result<Statement> {
    parser.expect_keyword(Keyword::DELETE)?;
    parser.expect_keyword(Keyword::FROM)?;
    let table = object_name_to_string(parser.parse_object_name(false)?)?;

    let filter = if parser.parse_keyword(Keyword::WHERE) {
        Some(expr::transform(parser.parse_expr()?, ctx)?)
    } else {
        None
    };

    let order_by = parse_order_by_clause(parser, ctx)?;

    let limit = if parser.parse_keyword(Keyword::LIMIT) {
        Some(parser.parse_literal_uint()? as i64)
    } else {
        None
    };
    let offset = if parser.parse_keyword(Keyword::OFFSET) {
        Some(parser.parse_literal_uint()? as i64)
    } else {
        None
    };

    Ok(Statement::Delete(DeleteStmt {
        table,
        filter,
        order_by,
        limit,
        offset,
    }))
}

/// `ORDER BY expr [ASC | DESC]`, one term only.
fn parse_order_by_clause(
    parser: &mut SqlParser<'_>,
    ctx: &mut TransformCtx,
) -> Result<Option<OrderBy>> {
    if !parser.parse_keywords(&[Keyword::ORDER, Keyword::BY]) {
        return Ok(None);
    }
    let e = expr::transform(parser.parse_expr()?, ctx)?;
    let desc = if parser.parse_keyword(Keyword::DESC) {
        true
    } else {
        parser.parse_keyword(Keyword::ASC);
        false
    };
    if parser.consume_token(&Token::Comma) {
        return Err(Error::Parse("only one ORDER BY term is supported".into()));
    }
    Ok(Some(OrderBy { expr: e, desc }))
}

// =============================================================================
// sqlparser AST transforms
// =============================================================================

fn transform_sql_statement(
    stmt: sql_ast::Statement,
    ctx: &mut TransformCtx,
) -> Result<Statement> {
    match stmt {
        sql_ast::Statement::CreateTable {
            name,
            columns,
            constraints,
            if_not_exists,
            ..
        } => transform_create_table(name, columns, constraints, if_not_exists, ctx),
        sql_ast::Statement::CreateIndex {
            name,
            table_name,
            columns,
            unique,
            if_not_exists,
            ..
        } => {
            let name = name
                .ok_or_else(|| Error::Parse("index name is required".into()))?;
            let paths = columns
                .into_iter()
                .map(|col| expr_to_path(&col.expr))
                .collect::<Result<Vec<_>>>()?;
            Ok(Statement::CreateIndex(CreateIndexStmt {
                name: object_name_to_string(name)?,
                table: object_name_to_string(table_name)?,
                paths,
                unique,
                if_not_exists,
            }))
        }
        sql_ast::Statement::CreateSequence {
            name,
            if_not_exists,
            sequence_options,
            ..
        } => {
            let mut start = 1i64;
            for option in sequence_options {
                if let sql_ast::SequenceOptions::StartWith(e, ..) = option {
                    start = literal_int(&e)?;
                }
            }
            Ok(Statement::CreateSequence(CreateSequenceStmt {
                name: object_name_to_string(name)?,
                if_not_exists,
                start,
            }))
        }
        sql_ast::Statement::Drop {
            object_type,
            if_exists,
            mut names,
            ..
        } => {
            if names.len() != 1 {
                return Err(Error::Parse("expected exactly one object name".into()));
            }
            let drop = DropStmt {
                name: object_name_to_string(names.remove(0))?,
                if_exists,
            };
            match object_type {
                sql_ast::ObjectType::Table => Ok(Statement::DropTable(drop)),
                sql_ast::ObjectType::Index => Ok(Statement::DropIndex(drop)),
                sql_ast::ObjectType::Sequence => Ok(Statement::DropSequence(drop)),
                other => Err(Error::Parse(format!("unsupported DROP: {other}"))),
            }
        }
        sql_ast::Statement::StartTransaction { modes, .. } => Ok(Statement::Begin {
            read_only: modes.iter().any(|m| {
                matches!(
                    m,
                    sql_ast::TransactionMode::AccessMode(
                        sql_ast::TransactionAccessMode::ReadOnly
                    )
                )
            }),
        }),
        sql_ast::Statement::Commit { .. } => Ok(Statement::Commit),
        sql_ast::Statement::Rollback { .. } => Ok(Statement::Rollback),
        sql_ast::Statement::Query(query) => {
            Ok(Statement::Select(transform_query(*query, ctx)?))
        }
        other => Err(Error::Parse(format!("unsupported statement: {other}"))),
    }
}

fn transform_create_table(
    name: sql_ast::ObjectName,
    columns: Vec<sql_ast::ColumnDef>,
    constraints: Vec<sql_ast::TableConstraint>,
    if_not_exists: bool,
    ctx: &mut TransformCtx,
) -> Result<Statement> {
    let mut fields = Vec::with_capacity(columns.len());
    let mut primary_key: Option<Vec<Path>> = None;
    let mut checks = Vec::new();
    let mut unique = Vec::new();

    let set_primary_key = |pk: Vec<Path>, primary_key: &mut Option<Vec<Path>>| {
        if primary_key.is_some() {
            return Err(Error::Parse("multiple primary keys".into()));
        }
        *primary_key = Some(pk);
        Ok(())
    };

    for column in columns {
        let path = Path::field(column.name.value.clone());
        let mut field = FieldDef {
            path: path.clone(),
            kind: expr::transform_data_type(&column.data_type)?,
            not_null: false,
            default: None,
        };

        for option_def in column.options {
            match option_def.option {
                sql_ast::ColumnOption::NotNull => field.not_null = true,
                sql_ast::ColumnOption::Null => {}
                sql_ast::ColumnOption::Default(e) => {
                    field.default = Some(expr::transform(e, ctx)?);
                }
                sql_ast::ColumnOption::Unique { is_primary, .. } => {
                    if is_primary {
                        field.not_null = true;
                        set_primary_key(vec![path.clone()], &mut primary_key)?;
                    } else {
                        unique.push(vec![path.clone()]);
                    }
                }
                sql_ast::ColumnOption::Check(e) => checks.push(e.to_string()),
                other => {
                    return Err(Error::Parse(format!(
                        "unsupported column option: {other}"
                    )))
                }
            }
        }
        fields.push(field);
    }

    for constraint in constraints {
        match constraint {
            sql_ast::TableConstraint::Unique {
                columns,
                is_primary,
                ..
            } => {
                let paths: Vec<Path> = columns
                    .into_iter()
                    .map(|c| Path::field(c.value))
                    .collect();
                if is_primary {
                    // Composite key columns are implicitly NOT NULL.
                    for field in &mut fields {
                        if paths.contains(&field.path) {
                            field.not_null = true;
                        }
                    }
                    set_primary_key(paths, &mut primary_key)?;
                } else {
                    unique.push(paths);
                }
            }
            sql_ast::TableConstraint::Check { expr: e, .. } => checks.push(e.to_string()),
            other => {
                return Err(Error::Parse(format!(
                    "unsupported table constraint: {other}"
                )))
            }
        }
    }

    Ok(Statement::CreateTable(CreateTableStmt {
        name: object_name_to_string(name)?,
        if_not_exists,
        fields,
        primary_key,
        checks,
        unique,
    }))
}

fn transform_query(query: sql_ast::Query, ctx: &mut TransformCtx) -> Result<SelectStmt> {
    if query.with.is_some() {
        return Err(Error::Parse("WITH is not supported".into()));
    }

    let select = match *query.body {
        sql_ast::SetExpr::Select(select) => select,
        other => return Err(Error::Parse(format!("unsupported query: {other}"))),
    };

    if select.distinct.is_some() {
        return Err(Error::Parse("DISTINCT is not supported".into()));
    }
    if select.having.is_some() {
        return Err(Error::Parse("HAVING is not supported".into()));
    }
    match &select.group_by {
        sql_ast::GroupByExpr::Expressions(exprs) if exprs.is_empty() => {}
        _ => return Err(Error::Parse("GROUP BY is not supported".into())),
    }

    let table = match select.from.len() {
        0 => None,
        1 => {
            let item = &select.from[0];
            if !item.joins.is_empty() {
                return Err(Error::Parse("JOIN is not supported".into()));
            }
            match &item.relation {
                sql_ast::TableFactor::Table { name, .. } => {
                    Some(object_name_to_string(name.clone())?)
                }
                other => {
                    return Err(Error::Parse(format!("unsupported FROM: {other}")))
                }
            }
        }
        _ => return Err(Error::Parse("multiple FROM tables are not supported".into())),
    };

    let projection = select
        .projection
        .into_iter()
        .map(|item| transform_select_item(item, ctx))
        .collect::<Result<Vec<_>>>()?;

    let filter = select
        .selection
        .map(|e| expr::transform(e, ctx))
        .transpose()?;

    let order_by = match query.order_by.len() {
        0 => None,
        1 => {
            let term = query.order_by.into_iter().next().unwrap();
            Some(OrderBy {
                expr: expr::transform(term.expr, ctx)?,
                desc: term.asc == Some(false),
            })
        }
        _ => return Err(Error::Parse("only one ORDER BY term is supported".into())),
    };

    let limit = query.limit.map(|e| literal_int(&e)).transpose()?;
    let offset = query.offset.map(|o| literal_int(&o.value)).transpose()?;

    Ok(SelectStmt {
        table,
        projection,
        filter,
        order_by,
        limit,
        offset,
    })
}

fn transform_select_item(
    item: sql_ast::SelectItem,
    ctx: &mut TransformCtx,
) -> Result<(ExprId, Option<String>)> {
    match item {
        sql_ast::SelectItem::UnnamedExpr(e) => Ok((expr::transform(e, ctx)?, None)),
        sql_ast::SelectItem::ExprWithAlias { expr: e, alias } => {
            Ok((expr::transform(e, ctx)?, Some(alias.value)))
        }
        sql_ast::SelectItem::Wildcard(_) => Ok((ctx.arena.push(ExprNode::Wildcard), None)),
        other => Err(Error::Parse(format!("unsupported projection: {other}"))),
    }
}

// =============================================================================
// Small helpers
// =============================================================================

fn object_name_to_string(name: sql_ast::ObjectName) -> Result<String> {
    if name.0.len() != 1 {
        return Err(Error::Parse(format!(
            "qualified names are not supported: {name}"
        )));
    }
    Ok(name.0.into_iter().next().unwrap().value)
}

fn object_name_to_path(name: sql_ast::ObjectName) -> Path {
    Path::new(
        name.0
            .into_iter()
            .map(|i| PathStep::Field(i.value))
            .collect(),
    )
}

fn expr_to_path(e: &sql_ast::Expr) -> Result<Path> {
    match e {
        sql_ast::Expr::Identifier(ident) => Ok(Path::field(ident.value.clone())),
        sql_ast::Expr::CompoundIdentifier(idents) => Ok(Path::new(
            idents
                .iter()
                .map(|i| PathStep::Field(i.value.clone()))
                .collect(),
        )),
        other => Err(Error::Parse(format!("expected a column path, got {other}"))),
    }
}

fn literal_int(e: &sql_ast::Expr) -> Result<i64> {
    match e {
        sql_ast::Expr::Value(sql_ast::Value::Number(text, _)) => text
            .parse::<i64>()
            .map_err(|_| Error::Parse(format!("invalid integer literal: {text}"))),
        other => Err(Error::Parse(format!("expected an integer literal, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;

    use super::*;

    fn parse_one(sql: &str) -> Statement {
        Parser::parse_one(sql).unwrap().0
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse_one("CREATE TABLE t (a INT PRIMARY KEY, b INT, c TEXT NOT NULL)");
        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.name, "t");
                assert_eq!(ct.fields.len(), 3);
                assert_eq!(ct.primary_key, Some(vec![Path::field("a")]));
                assert!(ct.fields[0].not_null);
                assert!(!ct.fields[1].not_null);
                assert!(ct.fields[2].not_null);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_table_composite_pk() {
        let stmt = parse_one("CREATE TABLE t (a INT, b INT, c INT, PRIMARY KEY (a, b))");
        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(
                    ct.primary_key,
                    Some(vec![Path::field("a"), Path::field("b")])
                );
                // Composite key columns become NOT NULL.
                assert!(ct.fields[0].not_null);
                assert!(ct.fields[1].not_null);
                assert!(!ct.fields[2].not_null);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_table_rejects_two_pks() {
        assert!(
            Parser::parse("CREATE TABLE t (a INT PRIMARY KEY, b INT PRIMARY KEY)").is_err()
        );
    }

    #[test]
    fn test_parse_insert_values() {
        let stmt = parse_one("INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y')");
        match stmt {
            Statement::Insert(insert) => {
                assert_eq!(insert.table, "t");
                assert_eq!(insert.columns, vec!["a", "b"]);
                match &insert.source {
                    InsertSource::Values(rows) => assert_eq!(rows.len(), 2),
                    other => panic!("unexpected {other:?}"),
                }
                assert!(insert.on_conflict.is_none());
                assert!(insert.returning.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_insert_arity_mismatch() {
        assert!(Parser::parse("INSERT INTO t (a, b) VALUES (1, 2, 3)").is_err());
    }

    #[test]
    fn test_parse_insert_on_conflict_forms() {
        for (sql, expected) in [
            ("INSERT INTO t (a) VALUES (1) ON CONFLICT DO NOTHING", OnConflictAction::DoNothing),
            ("INSERT INTO t (a) VALUES (1) ON CONFLICT IGNORE", OnConflictAction::DoNothing),
            ("INSERT INTO t (a) VALUES (1) ON CONFLICT DO REPLACE", OnConflictAction::DoReplace),
            ("INSERT INTO t (a) VALUES (1) ON CONFLICT REPLACE", OnConflictAction::DoReplace),
        ] {
            match parse_one(sql) {
                Statement::Insert(insert) => assert_eq!(insert.on_conflict, Some(expected)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_insert_on_conflict_unknown_action() {
        assert!(Parser::parse("INSERT INTO t (a) VALUES (1) ON CONFLICT BLA").is_err());
        assert!(Parser::parse("INSERT INTO t (a) VALUES (1) ON CONFLICT DO BLA").is_err());
    }

    #[test]
    fn test_parse_insert_select_with_returning() {
        let stmt = parse_one("INSERT INTO t (a, b) SELECT c, d FROM src RETURNING *, a AS x");
        match stmt {
            Statement::Insert(insert) => {
                assert!(matches!(insert.source, InsertSource::Select(_)));
                assert_eq!(insert.returning.len(), 2);
                assert_eq!(insert.returning[1].1.as_deref(), Some("x"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_update_set() {
        let stmt = parse_one("UPDATE t SET a = 2, b = a + 1 WHERE a = 1");
        match stmt {
            Statement::Update(update) => {
                assert_eq!(update.set.len(), 2);
                assert!(update.unset.is_empty());
                assert!(update.filter.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_update_unset() {
        let stmt = parse_one("UPDATE t UNSET a, b WHERE c = 1");
        match stmt {
            Statement::Update(update) => {
                assert!(update.set.is_empty());
                assert_eq!(update.unset, vec![Path::field("a"), Path::field("b")]);
                assert!(update.filter.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_delete_with_tail() {
        let stmt = parse_one("DELETE FROM t WHERE age = 10 ORDER BY age LIMIT 10 OFFSET 20");
        match stmt {
            Statement::Delete(delete) => {
                assert!(delete.filter.is_some());
                assert!(delete.order_by.is_some());
                assert_eq!(delete.limit, Some(10));
                assert_eq!(delete.offset, Some(20));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_select() {
        let stmt = parse_one("SELECT pk(), a, b AS bee FROM t WHERE a >= 2 ORDER BY a DESC LIMIT 3");
        match stmt {
            Statement::Select(select) => {
                assert_eq!(select.table.as_deref(), Some("t"));
                assert_eq!(select.projection.len(), 3);
                assert_eq!(select.projection[2].1.as_deref(), Some("bee"));
                assert!(select.order_by.unwrap().desc);
                assert_eq!(select.limit, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_select_without_from() {
        let stmt = parse_one("SELECT 1 + 1");
        match stmt {
            Statement::Select(select) => assert!(select.table.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_select_rejects_joins_and_groups() {
        assert!(Parser::parse("SELECT * FROM a, b").is_err());
        assert!(Parser::parse("SELECT * FROM a JOIN b ON a.x = b.x").is_err());
        assert!(Parser::parse("SELECT a FROM t GROUP BY a").is_err());
        assert!(Parser::parse("SELECT a FROM t ORDER BY a, b").is_err());
    }

    #[test]
    fn test_parse_sequences_and_drops() {
        match parse_one("CREATE SEQUENCE seq START WITH 100") {
            Statement::CreateSequence(seq) => {
                assert_eq!(seq.name, "seq");
                assert_eq!(seq.start, 100);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_one("DROP TABLE IF EXISTS t"),
            Statement::DropTable(DropStmt { if_exists: true, .. })
        ));
        assert!(matches!(
            parse_one("DROP INDEX idx"),
            Statement::DropIndex(DropStmt { if_exists: false, .. })
        ));
        assert!(matches!(
            parse_one("DROP SEQUENCE seq"),
            Statement::DropSequence(_)
        ));
    }

    #[test]
    fn test_parse_transactions() {
        assert!(matches!(
            parse_one("BEGIN"),
            Statement::Begin { read_only: false }
        ));
        assert!(matches!(parse_one("COMMIT"), Statement::Commit));
        assert!(matches!(parse_one("ROLLBACK"), Statement::Rollback));
    }

    #[test]
    fn test_parse_placeholders() {
        let (stmt, arena) = Parser::parse_one("SELECT * FROM t WHERE a = ? AND b = $foo").unwrap();
        match stmt {
            Statement::Select(select) => {
                let text = arena.display(select.filter.unwrap()).to_string();
                assert_eq!(text, "a = ? AND b = $foo");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_function() {
        assert!(Parser::parse("SELECT nope(a) FROM t").is_err());
    }
}
