use crate::error::Result;
use crate::executors::{Executor, JoinPredicate};
use crate::tuple::schema::TupleDesc;
use crate::tuple::Tuple;

/// Nested-loop inner join. For every tuple of the left child the right child
/// is rewound and scanned from the start, so the right side must be
/// rewindable; the memory footprint stays at one left tuple.
pub struct NestedLoopJoinExecutor<'a> {
    left: Box<dyn Executor + 'a>,
    right: Box<dyn Executor + 'a>,
    predicate: JoinPredicate,
    desc: TupleDesc,
    left_tuple: Option<Tuple>,
}

impl<'a> NestedLoopJoinExecutor<'a> {
    pub fn new(
        left: Box<dyn Executor + 'a>,
        right: Box<dyn Executor + 'a>,
        predicate: JoinPredicate,
    ) -> Self {
        let desc = TupleDesc::merge(left.desc(), right.desc());
        Self {
            left,
            right,
            predicate,
            desc,
            left_tuple: None,
        }
    }

    fn joined(&self, left: &Tuple, right: Tuple) -> Tuple {
        let mut fields = left.fields().to_vec();
        fields.extend(right.fields().iter().cloned());
        Tuple::new(self.desc.clone(), fields)
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            let left_tuple = match &self.left_tuple {
                Some(tuple) => tuple.clone(),
                None => match self.left.next().transpose()? {
                    Some(tuple) => {
                        self.right.rewind()?;
                        self.left_tuple = Some(tuple.clone());
                        tuple
                    }
                    None => return Ok(None),
                },
            };
            while let Some(right_tuple) = self.right.next().transpose()? {
                if self.predicate.eval(&left_tuple, &right_tuple) {
                    return Ok(Some(self.joined(&left_tuple, right_tuple)));
                }
            }
            self.left_tuple = None;
        }
    }
}

impl<'a> Executor for NestedLoopJoinExecutor<'a> {
    fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn open(&mut self) -> Result<()> {
        self.left.open()?;
        self.right.open()?;
        self.left_tuple = None;
        Ok(())
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.fetch_next().transpose()
    }

    fn rewind(&mut self) -> Result<()> {
        self.left.rewind()?;
        self.right.rewind()?;
        self.left_tuple = None;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.left_tuple = None;
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::NestedLoopJoinExecutor;
    use crate::concurrency::TransactionId;
    use crate::executors::seq_scan_executor::SeqScanExecutor;
    use crate::executors::tests::{int_desc, int_tuple, TestDb};
    use crate::executors::{Executor, JoinPredicate};
    use crate::tuple::value::CompareOp;

    #[test]
    fn equality_join_matches_pairwise() -> Result<()> {
        let test_db = TestDb::new();
        let desc = int_desc(&["x"]);
        let left_table = test_db.create_table("r", desc.clone());
        let right_table = test_db.create_table("s", int_desc(&["y"]));

        test_db.insert_committed(
            left_table,
            [1, 2, 3].iter().map(|v| int_tuple(&desc, &[*v])).collect(),
        )?;
        test_db.insert_committed(
            right_table,
            [2, 3, 4].iter().map(|v| int_tuple(&desc, &[*v])).collect(),
        )?;

        let tid = TransactionId::new();
        let pool = test_db.db.buffer_pool();
        let left = SeqScanExecutor::new(pool, tid, left_table, "r")?;
        let right = SeqScanExecutor::new(pool, tid, right_table, "s")?;
        let mut join = NestedLoopJoinExecutor::new(
            Box::new(left),
            Box::new(right),
            JoinPredicate::new(0, CompareOp::Eq, 0),
        );

        assert_eq!(join.desc().num_fields(), 2);
        assert_eq!(join.desc().field_name(0)?, Some("r.x"));
        assert_eq!(join.desc().field_name(1)?, Some("s.y"));

        let rows = test_db
            .collect(&mut join)?
            .iter()
            .map(|tuple| (tuple.as_i32(0), tuple.as_i32(1)))
            .collect::<Vec<_>>();
        // the right side is rescanned per left tuple, so matches come in
        // left order
        assert_eq!(rows, vec![(2, 2), (3, 3)]);
        Ok(())
    }

    #[test]
    fn inequality_join() -> Result<()> {
        let test_db = TestDb::new();
        let desc = int_desc(&["v"]);
        let left_table = test_db.create_table("small", desc.clone());
        let right_table = test_db.create_table("big", desc.clone());

        test_db.insert_committed(
            left_table,
            [1, 5].iter().map(|v| int_tuple(&desc, &[*v])).collect(),
        )?;
        test_db.insert_committed(
            right_table,
            [3, 6].iter().map(|v| int_tuple(&desc, &[*v])).collect(),
        )?;

        let tid = TransactionId::new();
        let pool = test_db.db.buffer_pool();
        let left = SeqScanExecutor::new(pool, tid, left_table, "l")?;
        let right = SeqScanExecutor::new(pool, tid, right_table, "r")?;
        let mut join = NestedLoopJoinExecutor::new(
            Box::new(left),
            Box::new(right),
            JoinPredicate::new(0, CompareOp::Less, 0),
        );

        let rows = test_db
            .collect(&mut join)?
            .iter()
            .map(|tuple| (tuple.as_i32(0), tuple.as_i32(1)))
            .collect::<Vec<_>>();
        assert_eq!(rows, vec![(1, 3), (1, 6), (5, 6)]);
        Ok(())
    }

    #[test]
    fn join_with_an_empty_side_is_empty() -> Result<()> {
        let test_db = TestDb::new();
        let desc = int_desc(&["v"]);
        let left_table = test_db.create_table("data", desc.clone());
        let right_table = test_db.create_table("empty", desc.clone());
        test_db.insert_committed(
            left_table,
            (0..3).map(|v| int_tuple(&desc, &[v])).collect(),
        )?;

        let tid = TransactionId::new();
        let pool = test_db.db.buffer_pool();
        let left = SeqScanExecutor::new(pool, tid, left_table, "d")?;
        let right = SeqScanExecutor::new(pool, tid, right_table, "e")?;
        let mut join = NestedLoopJoinExecutor::new(
            Box::new(left),
            Box::new(right),
            JoinPredicate::new(0, CompareOp::Eq, 0),
        );

        assert!(test_db.collect(&mut join)?.is_empty());
        Ok(())
    }
}
