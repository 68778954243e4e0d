use lazy_static::lazy_static;

use crate::buffer::buffer_pool::BufferPool;
use crate::concurrency::TransactionId;
use crate::error::Result;
use crate::executors::Executor;
use crate::tuple::schema::{TdItem, TupleDesc, Type};
use crate::tuple::value::Field;
use crate::tuple::Tuple;

lazy_static! {
    static ref DELETE_EXECUTOR_DESC: TupleDesc =
        TupleDesc::new(vec![TdItem::named(Type::Int, "deleted")]);
}

/// Deletes every tuple its child produces (the child must yield tuples that
/// were read from a table, i.e. that carry a record id) and produces a single
/// row holding the number of deleted tuples.
pub struct DeleteExecutor<'a> {
    pool: &'a BufferPool,
    tid: TransactionId,
    child: Box<dyn Executor + 'a>,
    deleted: i32,
    done: bool,
}

impl<'a> DeleteExecutor<'a> {
    pub fn new(pool: &'a BufferPool, tid: TransactionId, child: Box<dyn Executor + 'a>) -> Self {
        Self {
            pool,
            tid,
            child,
            deleted: 0,
            done: false,
        }
    }
}

impl<'a> Executor for DeleteExecutor<'a> {
    fn desc(&self) -> &TupleDesc {
        &DELETE_EXECUTOR_DESC
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.deleted = 0;
        self.done = false;

        while let Some(tuple) = self.child.next().transpose()? {
            self.pool.delete_tuple(self.tid, &tuple)?;
            self.deleted += 1;
        }
        Ok(())
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(Ok(Tuple::new(
            DELETE_EXECUTOR_DESC.clone(),
            vec![Field::Int(self.deleted)],
        )))
    }

    fn rewind(&mut self) -> Result<()> {
        // the deletions already happened; rewinding only re-emits the count
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.done = true;
    }
}
