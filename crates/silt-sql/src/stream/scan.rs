//! Source operators: table and index scans.

use std::fmt;

use crate::environment::{Environment, Row};
use crate::error::Result;
use crate::stream::{EmitFn, Operator, Upstream};
use crate::table::{Index, Table};
use crate::tree::Range;

/// Scans a table in key order, emitting one row environment per row.
pub struct SeqScan {
    table: String,
    reverse: bool,
}

impl SeqScan {
    /// A forward scan of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            reverse: false,
        }
    }

    /// A reverse scan of `table`.
    pub fn reverse(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            reverse: true,
        }
    }
}

impl Operator for SeqScan {
    fn iterate(
        &self,
        env: &Environment<'_>,
        _upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let table = Table::open(env.tx()?, &self.table)?;
        table.iterate(&Range::default(), self.reverse, |key, body| {
            let child = env.with_row(Row::new(key, body));
            emit(&child)
        })
    }
}

impl fmt::Display for SeqScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reverse {
            write!(f, "seq_scan_reverse({})", self.table)
        } else {
            write!(f, "seq_scan({})", self.table)
        }
    }
}

/// Scans one or more ranges of an index, resolving every hit to the
/// owning table row. Iteration stops as soon as a range's byte interval
/// is exhausted.
pub struct IndexScan {
    index: String,
    ranges: Vec<Range>,
    pub reverse: bool,
}

impl IndexScan {
    /// A scan of `index` over `ranges`; no ranges means the whole index.
    pub fn new(index: impl Into<String>, ranges: Vec<Range>) -> Self {
        Self {
            index: index.into(),
            ranges,
            reverse: false,
        }
    }
}

impl Operator for IndexScan {
    fn iterate(
        &self,
        env: &Environment<'_>,
        _upstream: Upstream<'_>,
        emit: EmitFn<'_>,
    ) -> Result<()> {
        let tx = env.tx()?;
        let index = Index::open(tx, &self.index)?;
        let table = Table::open(tx, &index.info.table)?;

        let whole = [Range::default()];
        let ranges: &[Range] = if self.ranges.is_empty() {
            &whole
        } else {
            &self.ranges
        };

        for range in ranges {
            index.iterate(range, self.reverse, |pk| {
                let body = table.get(&pk)?;
                let child = env.with_row(Row::new(pk, body));
                emit(&child)
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for IndexScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.reverse {
            "index_scan_reverse"
        } else {
            "index_scan"
        };
        write!(f, "{name}(\"{}\"", self.index)?;
        if !self.ranges.is_empty() {
            write!(f, ", [")?;
            for (i, range) in self.ranges.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{range}")?;
            }
            write!(f, "]")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::session::Db;
    use crate::stream::Upstream;
    use crate::value::Value;

    fn seeded_db() -> Db {
        let db = Db::open_in_memory().unwrap();
        db.exec(
            "CREATE TABLE test (a INT, b INT); \
             CREATE INDEX idx_test_ab ON test (a, b); \
             INSERT INTO test (a, b) VALUES (1, 1), (2, 2), (1, 9223372036854775807)",
        )
        .unwrap();
        db
    }

    fn collect(db: &Db, op: &dyn Operator) -> Vec<(i64, i64)> {
        let tx = db.begin(true).unwrap();
        let env = Environment::new(&tx, &[]);
        let mut out = Vec::new();
        op.iterate(&env, Upstream(None), &mut |e| {
            let obj = e.row().unwrap().object()?;
            let get = |f: &str| match obj.get(f) {
                Some(Value::Integer(i)) => *i,
                other => panic!("unexpected {other:?}"),
            };
            out.push((get("a"), get("b")));
            Ok(())
        })
        .unwrap();
        out
    }

    fn int_range(min: Option<Vec<i64>>, max: Option<Vec<i64>>, exclusive: bool) -> Range {
        let to_vals = |v: Vec<i64>| v.into_iter().map(Value::Integer).collect();
        Range {
            min: min.map(to_vals),
            max: max.map(to_vals),
            exclusive,
            ..Default::default()
        }
    }

    #[test]
    fn test_index_scan_partial_range_widens_both_ends() {
        let db = seeded_db();
        let mut range = int_range(Some(vec![1]), Some(vec![1]), false);
        range.exact = true;
        let op = IndexScan::new("idx_test_ab", vec![range]);
        assert_eq!(collect(&db, &op), vec![(1, 1), (1, 9223372036854775807)]);
    }

    #[test]
    fn test_index_scan_exclusive_partial_min() {
        let db = seeded_db();
        let op = IndexScan::new("idx_test_ab", vec![int_range(Some(vec![1]), None, true)]);
        assert_eq!(collect(&db, &op), vec![(2, 2)]);
    }

    #[test]
    fn test_index_scan_partial_max_keeps_group() {
        let db = seeded_db();
        let op = IndexScan::new("idx_test_ab", vec![int_range(None, Some(vec![1]), false)]);
        assert_eq!(collect(&db, &op), vec![(1, 1), (1, 9223372036854775807)]);
    }

    #[test]
    fn test_index_scan_no_range_scans_everything() {
        let db = seeded_db();
        let op = IndexScan::new("idx_test_ab", Vec::new());
        assert_eq!(
            collect(&db, &op),
            vec![(1, 1), (1, 9223372036854775807), (2, 2)]
        );
    }

    #[test]
    fn test_index_scan_reverse() {
        let db = seeded_db();
        let mut op = IndexScan::new("idx_test_ab", vec![int_range(Some(vec![1]), None, false)]);
        op.reverse = true;
        assert_eq!(
            collect(&db, &op),
            vec![(2, 2), (1, 9223372036854775807), (1, 1)]
        );
    }

    #[test]
    fn test_seq_scan_directions() {
        let db = Db::open_in_memory().unwrap();
        db.exec(
            "CREATE TABLE test (a INT PRIMARY KEY, b INT); \
             INSERT INTO test (a, b) VALUES (2, 20), (1, 10)",
        )
        .unwrap();

        assert_eq!(collect(&db, &SeqScan::new("test")), vec![(1, 10), (2, 20)]);
        assert_eq!(
            collect(&db, &SeqScan::reverse("test")),
            vec![(2, 20), (1, 10)]
        );
    }

    #[test]
    fn test_scan_display_forms() {
        assert_eq!(SeqScan::new("t").to_string(), "seq_scan(t)");
        assert_eq!(SeqScan::reverse("t").to_string(), "seq_scan_reverse(t)");

        let range = int_range(Some(vec![1]), Some(vec![2]), false);
        let op = IndexScan::new("idx", vec![range.clone()]);
        assert_eq!(
            op.to_string(),
            "index_scan(\"idx\", [{\"min\": [1], \"max\": [2]}])"
        );

        let mut op = IndexScan::new("idx", vec![range]);
        op.reverse = true;
        assert_eq!(
            op.to_string(),
            "index_scan_reverse(\"idx\", [{\"min\": [1], \"max\": [2]}])"
        );
    }
}
