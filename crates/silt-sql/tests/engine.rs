//! End-to-end tests of the embedded API surface.

use silt_sql::{Db, Param, Value};

fn json_rows(db: &Db, sql: &str) -> Vec<serde_json::Value> {
    db.query(sql).unwrap().to_json()
}

#[test]
fn test_open_close_reopen_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.silt");
    let path = path.to_str().unwrap();

    {
        let db = Db::open(path).unwrap();
        db.exec("CREATE TABLE t (a INT PRIMARY KEY, b TEXT)").unwrap();
        db.exec("INSERT INTO t VALUES (1, 'one'), (2, 'two')").unwrap();
        db.exec("DELETE FROM t WHERE a = 2").unwrap();
    }

    let db = Db::open(path).unwrap();
    assert_eq!(
        json_rows(&db, "SELECT * FROM t"),
        vec![serde_json::json!({"a": 1, "b": "one"})]
    );

    // The catalog survived too: constraints still apply.
    let err = db.exec("INSERT INTO t VALUES (1, 'again')").unwrap_err();
    assert_eq!(err.to_string(), "PRIMARY KEY constraint error: [a]");
}

#[test]
fn test_positional_params() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT PRIMARY KEY, b TEXT)").unwrap();
    db.exec_with_params(
        "INSERT INTO t VALUES (?, ?)",
        &[
            Param::positional(Value::Integer(1)),
            Param::positional(Value::Text("one".into())),
        ],
    )
    .unwrap();

    let rows = db
        .query_with_params(
            "SELECT b FROM t WHERE a = ?",
            &[Param::positional(Value::Integer(1))],
        )
        .unwrap();
    assert_eq!(rows.to_json(), vec![serde_json::json!({"b": "one"})]);
}

#[test]
fn test_named_params() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT PRIMARY KEY, b TEXT)").unwrap();
    db.exec_with_params(
        "INSERT INTO t VALUES ($id, $name)",
        &[
            Param::named("id", Value::Integer(7)),
            Param::named("name", Value::Text("seven".into())),
        ],
    )
    .unwrap();

    let rows = db
        .query_with_params(
            "SELECT a FROM t WHERE b = $name",
            &[Param::named("name", Value::Text("seven".into()))],
        )
        .unwrap();
    assert_eq!(rows.to_json(), vec![serde_json::json!({"a": 7})]);
}

#[test]
fn test_missing_param_is_an_error() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT)").unwrap();
    assert!(db.exec("INSERT INTO t (a) VALUES (?)").is_err());
}

#[test]
fn test_api_transaction_commit_and_rollback() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT PRIMARY KEY)").unwrap();

    // Rolled-back writes vanish.
    let tx = db.begin(false).unwrap();
    let statements = tx.prepare("INSERT INTO t (a) VALUES (1)").unwrap();
    statements[0].run(&tx, &[]).unwrap();
    tx.rollback();
    assert!(json_rows(&db, "SELECT * FROM t").is_empty());

    // Committed writes stay.
    let tx = db.begin(false).unwrap();
    let statements = tx.prepare("INSERT INTO t (a) VALUES (2)").unwrap();
    statements[0].run(&tx, &[]).unwrap();
    tx.commit().unwrap();
    assert_eq!(
        json_rows(&db, "SELECT * FROM t"),
        vec![serde_json::json!({"a": 2})]
    );
}

#[test]
fn test_sql_level_transactions() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT PRIMARY KEY)").unwrap();

    db.exec("BEGIN; INSERT INTO t (a) VALUES (1); ROLLBACK").unwrap();
    assert!(json_rows(&db, "SELECT * FROM t").is_empty());

    db.exec("BEGIN; INSERT INTO t (a) VALUES (1); INSERT INTO t (a) VALUES (2); COMMIT")
        .unwrap();
    assert_eq!(json_rows(&db, "SELECT * FROM t").len(), 2);

    assert!(db.exec("COMMIT").is_err());
    assert!(db.exec("BEGIN; BEGIN").is_err());
}

#[test]
fn test_failed_statement_rolls_back_its_transaction() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT PRIMARY KEY, b INT)").unwrap();
    db.exec("INSERT INTO t VALUES (1, 10), (2, 20)").unwrap();

    // The second row's key collision aborts the whole update.
    let err = db.exec("UPDATE t SET a = 2 WHERE a = 1").unwrap_err();
    assert_eq!(err.to_string(), "PRIMARY KEY constraint error: [a]");

    assert_eq!(
        json_rows(&db, "SELECT pk(), * FROM t"),
        vec![
            serde_json::json!({"pk()": [1], "a": 1, "b": 10}),
            serde_json::json!({"pk()": [2], "a": 2, "b": 20}),
        ]
    );
}

#[test]
fn test_read_only_transaction_rejects_writes() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT PRIMARY KEY)").unwrap();

    let tx = db.begin(true).unwrap();
    let statements = tx.prepare("INSERT INTO t (a) VALUES (1)").unwrap();
    assert!(statements[0].run(&tx, &[]).is_err());

    let statements = tx.prepare("SELECT * FROM t").unwrap();
    assert!(statements[0].is_read_only());
    statements[0].run(&tx, &[]).unwrap();
    tx.rollback();
}

#[test]
fn test_prepared_statement_reruns_with_different_params() {
    let db = Db::open(":memory:").unwrap();
    db.exec("CREATE TABLE t (a INT PRIMARY KEY)").unwrap();

    let tx = db.begin(false).unwrap();
    let statements = tx.prepare("INSERT INTO t (a) VALUES (?)").unwrap();
    for i in 1..=3 {
        statements[0]
            .run(&tx, &[Param::positional(Value::Integer(i))])
            .unwrap();
    }
    tx.commit().unwrap();

    assert_eq!(json_rows(&db, "SELECT * FROM t").len(), 3);
}

#[test]
fn test_multi_statement_query_returns_last_result() {
    let db = Db::open(":memory:").unwrap();
    let rows = db
        .query(
            "CREATE TABLE t (a INT PRIMARY KEY); \
             INSERT INTO t (a) VALUES (1), (2); \
             SELECT * FROM t WHERE a = 2",
        )
        .unwrap();
    assert_eq!(rows.to_json(), vec![serde_json::json!({"a": 2})]);
}
