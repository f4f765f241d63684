//! The statement compiler.
//!
//! DML statements compile into operator streams in a fixed order; DDL
//! statements become direct catalog actions carried as prepared variants.
//! Compilation happens in two phases: the first resolves catalog metadata
//! and appends any derived expressions (tuple-to-object pairing, CHECK
//! constraints) to the shared arena, the second freezes the arena behind
//! an `Arc` and assembles the streams.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{IndexInfo, TableInfo};
use crate::error::{Error, Result};
use crate::expr::{BinaryOp, ExprArena, ExprId, ExprNode};
use crate::parser::{
    self, CreateIndexStmt, CreateSequenceStmt, CreateTableStmt, DeleteStmt, DropStmt,
    InsertSource, InsertStmt, OnConflictAction, OrderBy, ParsedQuery, SelectStmt, Statement,
    UpdateStmt,
};
use crate::session::Tx;
use crate::stream::{
    Discard, Emit, Filter, IndexDelete, IndexInsert, IndexScan, IndexValidate, OnConflict,
    PathSet, PathUnset, PathsRename, Project, ProjectItem, SeqScan, Skip, Stream, Take,
    TableDelete, TableInsert, TableReplace, TableValidate, TempTreeSort,
};
use crate::tree::Range;
use crate::value::Value;

/// A statement ready to run.
#[derive(Debug)]
pub enum Prepared {
    /// A compiled operator stream.
    Stream { stream: Stream, read_only: bool },
    CreateTable {
        stmt: CreateTableStmt,
        arena: Arc<ExprArena>,
    },
    CreateIndex(CreateIndexStmt),
    CreateSequence(CreateSequenceStmt),
    DropTable(DropStmt),
    DropIndex(DropStmt),
    DropSequence(DropStmt),
    Begin { read_only: bool },
    Commit,
    Rollback,
}

/// CHECK constraints of one table, compiled into the statement arena and
/// paired with their SQL text.
type CompiledChecks = Vec<(ExprId, String)>;

enum PlanInput {
    Insert {
        stmt: InsertStmt,
        /// Object-constructor expressions for VALUES tuples.
        emit_exprs: Option<Vec<ExprId>>,
        checks: CompiledChecks,
        indexes: Vec<IndexInfo>,
    },
    Update {
        stmt: UpdateStmt,
        checks: CompiledChecks,
        pk_modified: bool,
        index_names: Vec<String>,
        unique: Vec<bool>,
    },
    Delete(DeleteStmt),
    Select {
        stmt: SelectStmt,
        /// Replacement source when one index serves the filter.
        index_source: Option<(String, Range)>,
        /// The empty-object expression FROM-less selects emit once.
        emit_empty: Option<ExprId>,
    },
    Passthrough(Prepared),
}

/// Compiles every statement of a parsed query against the transaction's
/// catalog.
pub fn prepare_all(parsed: ParsedQuery, tx: &Tx) -> Result<Vec<Prepared>> {
    let ParsedQuery {
        statements,
        mut arena,
    } = parsed;

    // Phase 1: catalog resolution and arena additions.
    let inputs = statements
        .into_iter()
        .map(|stmt| resolve(stmt, &mut arena, tx))
        .collect::<Result<Vec<_>>>()?;

    // Phase 2: stream assembly over the frozen arena.
    let arena = Arc::new(arena);
    let prepared = inputs
        .into_iter()
        .map(|input| assemble(input, &arena))
        .collect::<Result<Vec<_>>>()?;

    for p in &prepared {
        if let Prepared::Stream { stream, .. } = p {
            debug!(plan = %stream, "statement compiled");
        }
    }
    Ok(prepared)
}

fn resolve(stmt: Statement, arena: &mut ExprArena, tx: &Tx) -> Result<PlanInput> {
    match stmt {
        Statement::Insert(stmt) => {
            let info = tx.catalog().table(&stmt.table)?;
            let checks = compile_checks(&info, arena)?;
            let indexes = tx
                .catalog()
                .list_indexes(&stmt.table)
                .into_iter()
                .map(|name| tx.catalog().index(&name))
                .collect::<Result<Vec<_>>>()?;

            let emit_exprs = match &stmt.source {
                InsertSource::Values(tuples) => {
                    Some(pair_tuples(&stmt, tuples, &info, arena)?)
                }
                InsertSource::Select(select) => {
                    let source_table = select
                        .table
                        .as_deref()
                        .ok_or_else(|| Error::Parse("INSERT ... SELECT requires a table".into()))?;
                    tx.catalog().table(source_table)?;
                    None
                }
            };

            Ok(PlanInput::Insert {
                stmt,
                emit_exprs,
                checks,
                indexes,
            })
        }
        Statement::Update(stmt) => {
            let info = tx.catalog().table(&stmt.table)?;
            let pk_paths = info.primary_key_paths();

            for path in &stmt.unset {
                if pk_paths.contains(path) {
                    return Err(Error::Parse("cannot unset primary key path".into()));
                }
            }
            let pk_modified = stmt
                .set
                .iter()
                .any(|(path, _)| pk_paths.contains(path));

            let checks = compile_checks(&info, arena)?;
            let index_names = tx.catalog().list_indexes(&stmt.table);
            let unique = index_names
                .iter()
                .map(|name| Ok(tx.catalog().index(name)?.unique))
                .collect::<Result<Vec<_>>>()?;

            Ok(PlanInput::Update {
                stmt,
                checks,
                pk_modified,
                index_names,
                unique,
            })
        }
        Statement::Delete(stmt) => {
            tx.catalog().table(&stmt.table)?;
            Ok(PlanInput::Delete(stmt))
        }
        Statement::Select(stmt) => {
            let (index_source, emit_empty) = match &stmt.table {
                Some(table) => {
                    tx.catalog().table(table)?;
                    (select_index_source(&stmt, table, arena, tx)?, None)
                }
                None => (None, Some(arena.push(ExprNode::ObjectExpr(Vec::new())))),
            };
            Ok(PlanInput::Select {
                stmt,
                index_source,
                emit_empty,
            })
        }
        Statement::CreateTable(stmt) => Ok(PlanInput::Passthrough(Prepared::CreateTable {
            stmt,
            // Placeholder; replaced with the shared arena in phase 2.
            arena: Arc::new(ExprArena::new()),
        })),
        Statement::CreateIndex(stmt) => {
            Ok(PlanInput::Passthrough(Prepared::CreateIndex(stmt)))
        }
        Statement::CreateSequence(stmt) => {
            Ok(PlanInput::Passthrough(Prepared::CreateSequence(stmt)))
        }
        Statement::DropTable(stmt) => Ok(PlanInput::Passthrough(Prepared::DropTable(stmt))),
        Statement::DropIndex(stmt) => Ok(PlanInput::Passthrough(Prepared::DropIndex(stmt))),
        Statement::DropSequence(stmt) => {
            Ok(PlanInput::Passthrough(Prepared::DropSequence(stmt)))
        }
        Statement::Begin { read_only } => {
            Ok(PlanInput::Passthrough(Prepared::Begin { read_only }))
        }
        Statement::Commit => Ok(PlanInput::Passthrough(Prepared::Commit)),
        Statement::Rollback => Ok(PlanInput::Passthrough(Prepared::Rollback)),
    }
}

fn assemble(input: PlanInput, arena: &Arc<ExprArena>) -> Result<Prepared> {
    match input {
        PlanInput::Insert {
            stmt,
            emit_exprs,
            checks,
            indexes,
        } => Ok(Prepared::Stream {
            stream: assemble_insert(stmt, emit_exprs, checks, indexes, arena),
            read_only: false,
        }),
        PlanInput::Update {
            stmt,
            checks,
            pk_modified,
            index_names,
            unique,
        } => Ok(Prepared::Stream {
            stream: assemble_update(stmt, checks, pk_modified, index_names, unique, arena),
            read_only: false,
        }),
        PlanInput::Delete(stmt) => Ok(Prepared::Stream {
            stream: assemble_delete(stmt, arena),
            read_only: false,
        }),
        PlanInput::Select {
            stmt,
            index_source,
            emit_empty,
        } => Ok(Prepared::Stream {
            stream: assemble_select(stmt, index_source, emit_empty, arena),
            read_only: true,
        }),
        PlanInput::Passthrough(prepared) => Ok(match prepared {
            Prepared::CreateTable { stmt, .. } => Prepared::CreateTable {
                stmt,
                arena: arena.clone(),
            },
            other => other,
        }),
    }
}

// =============================================================================
// Per-statement assembly
// =============================================================================

fn assemble_select(
    stmt: SelectStmt,
    index_source: Option<(String, Range)>,
    emit_empty: Option<ExprId>,
    arena: &Arc<ExprArena>,
) -> Stream {
    let mut filter = stmt.filter;

    let mut stream = match (&stmt.table, index_source) {
        (Some(_), Some((index, range))) => {
            // The range covers the whole predicate.
            filter = None;
            Stream::new(IndexScan::new(index, vec![range]))
        }
        (Some(table), None) => Stream::new(SeqScan::new(table.clone())),
        // SELECT without FROM evaluates its projection once against an
        // empty row.
        (None, _) => {
            let empty = emit_empty.expect("emit_empty is set for FROM-less selects");
            Stream::new(Emit::new(arena.clone(), vec![empty]))
        }
    };

    if let Some(expr) = filter {
        stream = stream.pipe(Filter::new(arena.clone(), expr));
    }
    stream = pipe_sort_skip_take(stream, stmt.order_by, stmt.limit, stmt.offset, arena);
    stream.pipe(Project::new(arena.clone(), project_items(&stmt.projection)))
}

fn assemble_delete(stmt: DeleteStmt, arena: &Arc<ExprArena>) -> Stream {
    let mut stream = Stream::new(SeqScan::new(stmt.table.clone()));
    if let Some(expr) = stmt.filter {
        stream = stream.pipe(Filter::new(arena.clone(), expr));
    }
    stream = pipe_sort_skip_take(stream, stmt.order_by, stmt.limit, stmt.offset, arena);
    stream.pipe(TableDelete::new(stmt.table))
}

fn assemble_insert(
    stmt: InsertStmt,
    emit_exprs: Option<Vec<ExprId>>,
    checks: CompiledChecks,
    indexes: Vec<IndexInfo>,
    arena: &Arc<ExprArena>,
) -> Stream {
    let mut stream = match (stmt.source, emit_exprs) {
        (_, Some(exprs)) => Stream::new(Emit::new(arena.clone(), exprs)),
        (InsertSource::Select(select), None) => {
            let select = *select;
            let mut s = Stream::new(SeqScan::new(
                select.table.clone().expect("checked in phase 1"),
            ));
            if let Some(expr) = select.filter {
                s = s.pipe(Filter::new(arena.clone(), expr));
            }
            s = pipe_sort_skip_take(s, select.order_by, select.limit, select.offset, arena);
            if !projection_is_bare_wildcard(&select.projection, arena) {
                s = s.pipe(Project::new(arena.clone(), project_items(&select.projection)));
            }
            // Named target columns rename the source fields positionally.
            if !stmt.columns.is_empty() {
                s = s.pipe(PathsRename::new(stmt.columns.clone()));
            }
            s
        }
        (InsertSource::Values(_), None) => unreachable!("tuples are paired in phase 1"),
    };

    stream = stream.pipe(TableValidate::new(
        stmt.table.clone(),
        arena.clone(),
        checks,
    ));

    match stmt.on_conflict {
        Some(OnConflictAction::DoNothing) => {
            stream = stream.pipe(OnConflict::do_nothing());
        }
        Some(OnConflictAction::DoReplace) => {
            stream = stream.pipe(OnConflict::with_stream(Stream::new(TableReplace::new(
                stmt.table.clone(),
            ))));
        }
        None => {}
    }

    stream = stream.pipe(TableInsert::new(stmt.table.clone()));

    for index in &indexes {
        if index.unique {
            stream = stream.pipe(IndexValidate::new(index.name.clone()));
        }
        stream = stream.pipe(IndexInsert::new(index.name.clone()));
    }

    if stmt.returning.is_empty() {
        stream.pipe(Discard)
    } else {
        stream.pipe(Project::new(arena.clone(), project_items(&stmt.returning)))
    }
}

fn assemble_update(
    stmt: UpdateStmt,
    checks: CompiledChecks,
    pk_modified: bool,
    index_names: Vec<String>,
    unique: Vec<bool>,
    arena: &Arc<ExprArena>,
) -> Stream {
    let mut stream = Stream::new(SeqScan::new(stmt.table.clone()));
    if let Some(expr) = stmt.filter {
        stream = stream.pipe(Filter::new(arena.clone(), expr));
    }

    for (path, expr) in stmt.set {
        stream = stream.pipe(PathSet::new(arena.clone(), path, expr));
    }
    for path in stmt.unset {
        stream = stream.pipe(PathUnset::new(path));
    }

    stream = stream.pipe(TableValidate::new(
        stmt.table.clone(),
        arena.clone(),
        checks,
    ));

    // TODO(siltdb): this prunes every index entry of the row even when
    // the update touched none of its columns; narrowing it to the
    // modified indexes requires diffing old and new rows here.
    for name in &index_names {
        stream = stream.pipe(IndexDelete::new(name.clone()));
    }

    if pk_modified {
        stream = stream.pipe(TableDelete::new(stmt.table.clone()));
        stream = stream.pipe(TableInsert::new(stmt.table.clone()));
    } else {
        stream = stream.pipe(TableReplace::new(stmt.table.clone()));
    }

    for (name, is_unique) in index_names.iter().zip(unique) {
        if is_unique {
            stream = stream.pipe(IndexValidate::new(name.clone()));
        }
        stream = stream.pipe(IndexInsert::new(name.clone()));
    }

    stream.pipe(Discard)
}

// =============================================================================
// Helpers
// =============================================================================

fn pipe_sort_skip_take(
    mut stream: Stream,
    order_by: Option<OrderBy>,
    limit: Option<i64>,
    offset: Option<i64>,
    arena: &Arc<ExprArena>,
) -> Stream {
    if let Some(order) = order_by {
        stream = if order.desc {
            stream.pipe(TempTreeSort::reverse(arena.clone(), order.expr))
        } else {
            stream.pipe(TempTreeSort::new(arena.clone(), order.expr))
        };
    }
    if let Some(n) = offset {
        stream = stream.pipe(Skip::new(n));
    }
    if let Some(n) = limit {
        stream = stream.pipe(Take::new(n));
    }
    stream
}

fn project_items(items: &[(ExprId, Option<String>)]) -> Vec<ProjectItem> {
    items
        .iter()
        .map(|(expr, alias)| ProjectItem {
            expr: *expr,
            alias: alias.clone(),
        })
        .collect()
}

fn projection_is_bare_wildcard(
    items: &[(ExprId, Option<String>)],
    arena: &Arc<ExprArena>,
) -> bool {
    items.len() == 1
        && items[0].1.is_none()
        && matches!(arena.node(items[0].0), ExprNode::Wildcard)
}

fn compile_checks(info: &TableInfo, arena: &mut ExprArena) -> Result<CompiledChecks> {
    info.checks
        .iter()
        .map(|sql| Ok((parser::Parser::parse_expr_into(arena, sql)?, sql.clone())))
        .collect()
}

/// Pairs VALUES tuples with column names, producing one object
/// constructor per row. Named columns win; otherwise the table's declared
/// columns apply in order.
fn pair_tuples(
    stmt: &InsertStmt,
    tuples: &[Vec<ExprId>],
    info: &TableInfo,
    arena: &mut ExprArena,
) -> Result<Vec<ExprId>> {
    let columns: Vec<String> = if stmt.columns.is_empty() {
        info.fields
            .iter()
            .filter_map(|f| f.path.root_field().map(str::to_string))
            .collect()
    } else {
        stmt.columns.clone()
    };
    if columns.is_empty() {
        return Err(Error::Parse(format!(
            "table {} has no declared columns; INSERT requires a column list",
            stmt.table
        )));
    }

    tuples
        .iter()
        .map(|tuple| {
            if tuple.len() != columns.len() {
                return Err(Error::Parse(format!(
                    "{} values for {} columns",
                    tuple.len(),
                    columns.len()
                )));
            }
            let fields = columns
                .iter()
                .cloned()
                .zip(tuple.iter().copied())
                .collect();
            Ok(arena.push(ExprNode::ObjectExpr(fields)))
        })
        .collect()
}

/// Recognizes a WHERE clause of the form `path op literal` (either side)
/// whose path leads exactly one index of the table; such filters compile
/// to an index scan over the equivalent range.
fn select_index_source(
    stmt: &SelectStmt,
    table: &str,
    arena: &ExprArena,
    tx: &Tx,
) -> Result<Option<(String, Range)>> {
    let Some(filter) = stmt.filter else {
        return Ok(None);
    };
    let ExprNode::Binary { op, left, right } = arena.node(filter) else {
        return Ok(None);
    };
    if !op.is_range_comparison() {
        return Ok(None);
    }

    // Normalize to path-on-the-left.
    let (path, value, op) = match (arena.node(*left), arena.node(*right)) {
        (ExprNode::Path(p), ExprNode::Literal(v)) => (p, v.clone(), *op),
        (ExprNode::Literal(v), ExprNode::Path(p)) => (p, v.clone(), flip(*op)),
        _ => return Ok(None),
    };

    for name in tx.catalog().list_indexes(table) {
        let info = tx.catalog().index(&name)?;
        if info.paths.first() == Some(path) {
            let range = range_for(op, value, info.paths.clone());
            return Ok(Some((name, range)));
        }
    }
    Ok(None)
}

fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::LtEq => BinaryOp::GtEq,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::GtEq => BinaryOp::LtEq,
        other => other,
    }
}

fn range_for(op: BinaryOp, value: Value, paths: Vec<crate::object::Path>) -> Range {
    match op {
        BinaryOp::Eq => Range::exact(vec![value], paths),
        BinaryOp::Gt => Range {
            min: Some(vec![value]),
            exclusive: true,
            paths,
            ..Default::default()
        },
        BinaryOp::GtEq => Range {
            min: Some(vec![value]),
            paths,
            ..Default::default()
        },
        BinaryOp::Lt => Range {
            max: Some(vec![value]),
            exclusive: true,
            paths,
            ..Default::default()
        },
        BinaryOp::LtEq => Range {
            max: Some(vec![value]),
            paths,
            ..Default::default()
        },
        _ => unreachable!("checked by is_range_comparison"),
    }
}

#[cfg(test)]
mod tests {
    use crate::session::Db;

    fn plan_of(db: &Db, sql: &str) -> String {
        let tx = db.begin(false).unwrap();
        let statements = tx.prepare(sql).unwrap();
        let plan = statements[0].plan().unwrap();
        tx.rollback();
        plan
    }

    fn db_with(setup: &str) -> Db {
        let db = Db::open_in_memory().unwrap();
        db.exec(setup).unwrap();
        db
    }

    #[test]
    fn test_delete_plan_shape() {
        let db = db_with("CREATE TABLE test (age INT)");
        assert_eq!(
            plan_of(
                &db,
                "DELETE FROM test WHERE age = 10 ORDER BY age LIMIT 10 OFFSET 20"
            ),
            "seq_scan(test) | filter(age = 10) | temp_tree_sort(age) | \
             skip(20) | take(10) | table.delete(test)"
        );
    }

    #[test]
    fn test_delete_plan_minimal() {
        let db = db_with("CREATE TABLE test (age INT)");
        assert_eq!(
            plan_of(&db, "DELETE FROM test"),
            "seq_scan(test) | table.delete(test)"
        );
    }

    #[test]
    fn test_insert_on_conflict_replace_plan() {
        let db = db_with("CREATE TABLE test (a TEXT, b TEXT)");
        assert_eq!(
            plan_of(
                &db,
                "INSERT INTO test (a, b) VALUES ('c', 'd') ON CONFLICT DO REPLACE RETURNING *"
            ),
            "emit({a: \"c\", b: \"d\"}) | table.validate(test) | \
             on_conflict(table.replace(test)) | table.insert(test) | project(*)"
        );
    }

    #[test]
    fn test_insert_plan_ends_in_discard_without_returning() {
        let db = db_with("CREATE TABLE test (a TEXT, b TEXT)");
        assert_eq!(
            plan_of(&db, "INSERT INTO test (a, b) VALUES ('c', 'd')"),
            "emit({a: \"c\", b: \"d\"}) | table.validate(test) | table.insert(test) | discard()"
        );
    }

    #[test]
    fn test_insert_on_conflict_nothing_plan() {
        let db = db_with("CREATE TABLE test (a TEXT)");
        assert_eq!(
            plan_of(&db, "INSERT INTO test (a) VALUES ('c') ON CONFLICT DO NOTHING"),
            "emit({a: \"c\"}) | table.validate(test) | on_conflict(do_nothing) | \
             table.insert(test) | discard()"
        );
    }

    #[test]
    fn test_insert_plan_maintains_indexes() {
        let db = db_with(
            "CREATE TABLE test (a INT PRIMARY KEY, b INT); \
             CREATE UNIQUE INDEX idx_b ON test (b); \
             CREATE INDEX idx_a ON test (a)",
        );
        assert_eq!(
            plan_of(&db, "INSERT INTO test (a, b) VALUES (1, 2)"),
            "emit({a: 1, b: 2}) | table.validate(test) | table.insert(test) | \
             index.insert(idx_a) | index.validate(idx_b) | index.insert(idx_b) | discard()"
        );
    }

    #[test]
    fn test_insert_select_with_columns_renames() {
        let db = db_with("CREATE TABLE test (a INT, b INT); CREATE TABLE foo (c INT, d INT)");
        assert_eq!(
            plan_of(&db, "INSERT INTO test (a, b) SELECT c, d FROM foo"),
            "seq_scan(foo) | project(c, d) | paths.rename(a, b) | \
             table.validate(test) | table.insert(test) | discard()"
        );
        assert_eq!(
            plan_of(&db, "INSERT INTO test SELECT * FROM foo"),
            "seq_scan(foo) | table.validate(test) | table.insert(test) | discard()"
        );
    }

    #[test]
    fn test_update_plan_prunes_and_reinserts_indexes() {
        let db = db_with(
            "CREATE TABLE test (a INT PRIMARY KEY, b INT); \
             CREATE UNIQUE INDEX idx_b ON test (b)",
        );
        assert_eq!(
            plan_of(&db, "UPDATE test SET b = 2 WHERE a = 1"),
            "seq_scan(test) | filter(a = 1) | paths.set(b, 2) | table.validate(test) | \
             index.delete(idx_b) | table.replace(test) | \
             index.validate(idx_b) | index.insert(idx_b) | discard()"
        );
    }

    #[test]
    fn test_update_primary_key_compiles_to_delete_insert() {
        let db = db_with("CREATE TABLE test (a INT PRIMARY KEY, b INT)");
        assert_eq!(
            plan_of(&db, "UPDATE test SET a = 2, b = 20 WHERE a = 1"),
            "seq_scan(test) | filter(a = 1) | paths.set(a, 2) | paths.set(b, 20) | \
             table.validate(test) | table.delete(test) | table.insert(test) | discard()"
        );
        // A non-key update keeps the row in place.
        assert_eq!(
            plan_of(&db, "UPDATE test SET b = 20 WHERE a = 1"),
            "seq_scan(test) | filter(a = 1) | paths.set(b, 20) | \
             table.validate(test) | table.replace(test) | discard()"
        );
    }

    #[test]
    fn test_update_unset_primary_key_is_a_compile_error() {
        let db = db_with("CREATE TABLE test (a INT PRIMARY KEY, b INT)");
        let tx = db.begin(false).unwrap();
        let err = tx.prepare("UPDATE test UNSET a").unwrap_err();
        assert_eq!(err.to_string(), "parse error: cannot unset primary key path");
        tx.rollback();
    }

    #[test]
    fn test_select_plan_shape() {
        let db = db_with("CREATE TABLE test (a INT, b INT)");
        assert_eq!(
            plan_of(
                &db,
                "SELECT a, b FROM test WHERE a > 1 ORDER BY b DESC OFFSET 5 LIMIT 2"
            ),
            "seq_scan(test) | filter(a > 1) | temp_tree_sort_reverse(b) | \
             skip(5) | take(2) | project(a, b)"
        );
    }

    #[test]
    fn test_select_single_comparison_uses_index() {
        let db = db_with(
            "CREATE TABLE test (a INT, b INT); CREATE INDEX idx_a ON test (a)",
        );
        assert_eq!(
            plan_of(&db, "SELECT * FROM test WHERE a = 1"),
            "index_scan(\"idx_a\", [{\"min\": [1], \"max\": [1]}]) | project(*)"
        );
        assert_eq!(
            plan_of(&db, "SELECT * FROM test WHERE a > 1"),
            "index_scan(\"idx_a\", [{\"min\": [1], \"exclusive\": true}]) | project(*)"
        );
        // The unindexed column still seq-scans.
        assert_eq!(
            plan_of(&db, "SELECT * FROM test WHERE b = 1"),
            "seq_scan(test) | filter(b = 1) | project(*)"
        );
        // Compound predicates keep the filter.
        assert_eq!(
            plan_of(&db, "SELECT * FROM test WHERE a = 1 AND b = 2"),
            "seq_scan(test) | filter(a = 1 AND b = 2) | project(*)"
        );
    }

    #[test]
    fn test_select_without_from() {
        let db = Db::open_in_memory().unwrap();
        assert_eq!(plan_of(&db, "SELECT 1 + 1"), "emit({}) | project(1 + 1)");
    }

    #[test]
    fn test_missing_table_is_a_prepare_error() {
        let db = Db::open_in_memory().unwrap();
        let tx = db.begin(false).unwrap();
        let err = tx.prepare("SELECT * FROM missing").unwrap_err();
        assert!(err.is_not_found());
        tx.rollback();
    }
}
