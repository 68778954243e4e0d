use std::collections::HashMap;
use std::fmt::Display;

use crate::error::{DbError, Result};
use crate::executors::Executor;
use crate::tuple::schema::{TdItem, TupleDesc, Type};
use crate::tuple::value::Field;
use crate::tuple::Tuple;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl Display for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", name)
    }
}

/// Grouped (or ungrouped) aggregation over a single column. The child is
/// drained completely during `open`; afterwards the executor iterates the
/// per-group results, one row per group, in no particular order.
///
/// `count` accepts any column type, the other operators demand an integer
/// aggregate column. `avg` is the truncating integer average. Without
/// grouping an empty input still produces a single 0 row for `sum` and
/// `count`, while `min`, `max` and `avg` have no meaningful value and
/// produce nothing.
pub struct AggregateExecutor<'a> {
    child: Box<dyn Executor + 'a>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    desc: TupleDesc,
    results: Vec<Tuple>,
    cursor: usize,
}

impl<'a> AggregateExecutor<'a> {
    pub fn new(
        child: Box<dyn Executor + 'a>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let child_desc = child.desc();
        let agg_type = child_desc.field_type(agg_field)?;
        if op != AggregateOp::Count && agg_type != Type::Int {
            return Err(DbError::SchemaMismatch(format!(
                "{} requires an integer column, got {}",
                op, agg_type
            )));
        }

        let agg_name = format!(
            "{} {}",
            op,
            child_desc.field_name(agg_field)?.unwrap_or_default()
        );
        let desc = match group_field {
            Some(group_field) => {
                let group_type = child_desc.field_type(group_field)?;
                let group_item = match child_desc.field_name(group_field)? {
                    Some(name) => TdItem::named(group_type, name),
                    None => TdItem::new(group_type),
                };
                TupleDesc::new(vec![group_item, TdItem::named(Type::Int, agg_name)])
            }
            None => TupleDesc::new(vec![TdItem::named(Type::Int, agg_name)]),
        };

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            desc,
            results: Vec::new(),
            cursor: 0,
        })
    }

    fn drain_child(&mut self) -> Result<()> {
        let mut groups: HashMap<Option<Field>, (i64, i64)> = HashMap::new();

        while let Some(tuple) = self.child.next().transpose()? {
            let key = self.group_field.map(|field| tuple.field(field).clone());
            let entry = groups.entry(key).or_insert(match self.op {
                AggregateOp::Min => (i64::MAX, 0),
                AggregateOp::Max => (i64::MIN, 0),
                _ => (0, 0),
            });
            match self.op {
                AggregateOp::Count => (),
                op => {
                    let value = tuple.field(self.agg_field).as_i32() as i64;
                    match op {
                        AggregateOp::Min => entry.0 = entry.0.min(value),
                        AggregateOp::Max => entry.0 = entry.0.max(value),
                        AggregateOp::Sum | AggregateOp::Avg => entry.0 += value,
                        AggregateOp::Count => unreachable!(),
                    }
                }
            }
            entry.1 += 1;
        }

        // an ungrouped sum or count over no rows is still defined
        if self.group_field.is_none()
            && groups.is_empty()
            && matches!(self.op, AggregateOp::Sum | AggregateOp::Count)
        {
            groups.insert(None, (0, 0));
        }

        self.results = groups
            .into_iter()
            .map(|(key, (accumulated, count))| {
                let value = match self.op {
                    AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => accumulated as i32,
                    AggregateOp::Count => count as i32,
                    AggregateOp::Avg => (accumulated / count) as i32,
                };
                let fields = match key {
                    Some(group) => vec![group, Field::Int(value)],
                    None => vec![Field::Int(value)],
                };
                Tuple::new(self.desc.clone(), fields)
            })
            .collect();
        Ok(())
    }
}

impl<'a> Executor for AggregateExecutor<'a> {
    fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.cursor = 0;
        self.drain_child()
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        let tuple = self.results.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(Ok(tuple))
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{AggregateExecutor, AggregateOp};
    use crate::concurrency::TransactionId;
    use crate::executors::seq_scan_executor::SeqScanExecutor;
    use crate::executors::tests::{int_desc, int_tuple, TestDb, VecExecutor};
    use crate::executors::Executor;
    use crate::tuple::schema::{TdItem, TupleDesc, Type};
    use crate::tuple::value::Field;
    use crate::tuple::Tuple;

    fn scan<'a>(test_db: &'a TestDb, table_id: u32, alias: &str) -> SeqScanExecutor<'a> {
        SeqScanExecutor::new(
            test_db.db.buffer_pool(),
            TransactionId::new(),
            table_id,
            alias,
        )
        .unwrap()
    }

    #[test]
    fn grouped_sum() -> Result<()> {
        let test_db = TestDb::new();
        let desc = int_desc(&["g", "v"]);
        let table_id = test_db.create_table("u", desc.clone());
        test_db.insert_committed(
            table_id,
            vec![
                int_tuple(&desc, &[1, 10]),
                int_tuple(&desc, &[1, 20]),
                int_tuple(&desc, &[2, 5]),
            ],
        )?;

        let mut aggregate = AggregateExecutor::new(
            Box::new(scan(&test_db, table_id, "u")),
            1,
            Some(0),
            AggregateOp::Sum,
        )?;
        assert_eq!(aggregate.desc().field_name(1)?, Some("sum u.v"));

        let mut rows = test_db
            .collect(&mut aggregate)?
            .iter()
            .map(|tuple| (tuple.as_i32(0), tuple.as_i32(1)))
            .collect::<Vec<_>>();
        rows.sort();
        assert_eq!(rows, vec![(1, 30), (2, 5)]);
        Ok(())
    }

    #[test]
    fn ungrouped_aggregates() -> Result<()> {
        let test_db = TestDb::new();
        let desc = int_desc(&["v"]);
        let table_id = test_db.create_table("numbers", desc.clone());
        test_db.insert_committed(
            table_id,
            [3, 9, 6].iter().map(|v| int_tuple(&desc, &[*v])).collect(),
        )?;

        for (op, expected) in [
            (AggregateOp::Min, 3),
            (AggregateOp::Max, 9),
            (AggregateOp::Sum, 18),
            (AggregateOp::Avg, 6),
            (AggregateOp::Count, 3),
        ] {
            let mut aggregate =
                AggregateExecutor::new(Box::new(scan(&test_db, table_id, "n")), 0, None, op)?;
            let rows = test_db.collect(&mut aggregate)?;
            assert_eq!(rows.len(), 1, "{op} must produce exactly one row");
            assert_eq!(rows[0].as_i32(0), expected, "unexpected {op} result");
        }
        Ok(())
    }

    #[test]
    fn average_truncates() -> Result<()> {
        let test_db = TestDb::new();
        let desc = int_desc(&["v"]);
        let table_id = test_db.create_table("numbers", desc.clone());
        test_db.insert_committed(
            table_id,
            [1, 2].iter().map(|v| int_tuple(&desc, &[*v])).collect(),
        )?;

        let mut aggregate = AggregateExecutor::new(
            Box::new(scan(&test_db, table_id, "n")),
            0,
            None,
            AggregateOp::Avg,
        )?;
        let rows = test_db.collect(&mut aggregate)?;
        assert_eq!(rows[0].as_i32(0), 1);
        Ok(())
    }

    #[test]
    fn empty_input_without_grouping() -> Result<()> {
        let test_db = TestDb::new();
        let table_id = test_db.create_table("numbers", int_desc(&["v"]));

        for (op, expected_rows) in [
            (AggregateOp::Sum, vec![0]),
            (AggregateOp::Count, vec![0]),
            (AggregateOp::Min, vec![]),
            (AggregateOp::Max, vec![]),
            (AggregateOp::Avg, vec![]),
        ] {
            let mut aggregate =
                AggregateExecutor::new(Box::new(scan(&test_db, table_id, "n")), 0, None, op)?;
            let rows = test_db
                .collect(&mut aggregate)?
                .iter()
                .map(|tuple| tuple.as_i32(0))
                .collect::<Vec<_>>();
            assert_eq!(rows, expected_rows, "unexpected {op} result");
        }
        Ok(())
    }

    #[test]
    fn count_works_on_text_columns() -> Result<()> {
        let test_db = TestDb::new();
        let desc = TupleDesc::new(vec![TdItem::named(Type::Text, "name")]);
        let child = VecExecutor::new(
            desc.clone(),
            vec![
                Tuple::new(desc.clone(), vec![Field::text("foo")]),
                Tuple::new(desc.clone(), vec![Field::text("bar")]),
            ],
        );

        let mut aggregate =
            AggregateExecutor::new(Box::new(child), 0, None, AggregateOp::Count)?;
        let rows = test_db.collect(&mut aggregate)?;
        assert_eq!(rows[0].as_i32(0), 2);

        // every other operator rejects a text column up front
        let child = VecExecutor::new(desc.clone(), vec![]);
        assert!(AggregateExecutor::new(Box::new(child), 0, None, AggregateOp::Sum).is_err());
        Ok(())
    }
}
