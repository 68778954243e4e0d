use lazy_static::lazy_static;

use crate::buffer::buffer_pool::BufferPool;
use crate::common::TableId;
use crate::concurrency::TransactionId;
use crate::error::{DbError, Result};
use crate::executors::Executor;
use crate::tuple::schema::{TdItem, TupleDesc, Type};
use crate::tuple::value::Field;
use crate::tuple::Tuple;

lazy_static! {
    static ref INSERT_EXECUTOR_DESC: TupleDesc =
        TupleDesc::new(vec![TdItem::named(Type::Int, "inserted")]);
}

/// Drains its child into the target table during `open` and produces a single
/// row holding the number of inserted tuples. The child's schema must match
/// the table's.
pub struct InsertExecutor<'a> {
    pool: &'a BufferPool,
    tid: TransactionId,
    table_id: TableId,
    child: Box<dyn Executor + 'a>,
    inserted: i32,
    done: bool,
}

impl<'a> InsertExecutor<'a> {
    pub fn new(
        pool: &'a BufferPool,
        tid: TransactionId,
        table_id: TableId,
        child: Box<dyn Executor + 'a>,
    ) -> Self {
        Self {
            pool,
            tid,
            table_id,
            child,
            inserted: 0,
            done: false,
        }
    }
}

impl<'a> Executor for InsertExecutor<'a> {
    fn desc(&self) -> &TupleDesc {
        &INSERT_EXECUTOR_DESC
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.inserted = 0;
        self.done = false;

        let table_desc = self.pool.catalog().desc_for(self.table_id)?;
        if self.child.desc() != &table_desc {
            return Err(DbError::SchemaMismatch(format!(
                "cannot insert tuples with schema ({}) into a table with schema ({})",
                self.child.desc(),
                table_desc
            )));
        }

        while let Some(tuple) = self.child.next().transpose()? {
            self.pool.insert_tuple(self.tid, self.table_id, tuple)?;
            self.inserted += 1;
        }
        Ok(())
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(Ok(Tuple::new(
            INSERT_EXECUTOR_DESC.clone(),
            vec![Field::Int(self.inserted)],
        )))
    }

    fn rewind(&mut self) -> Result<()> {
        // the insertions already happened; rewinding only re-emits the count
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.done = true;
    }
}
