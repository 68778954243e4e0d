use crate::buffer::buffer_pool::BufferPool;
use crate::common::TableId;
use crate::concurrency::TransactionId;
use crate::error::{DbError, Result};
use crate::executors::Executor;
use crate::storage::heap_file::HeapFileIterator;
use crate::tuple::schema::{TdItem, TupleDesc};
use crate::tuple::Tuple;

/// Scans a whole table in page-then-slot order. Every produced tuple carries
/// the table's schema with each field name prefixed by `alias.`.
pub struct SeqScanExecutor<'a> {
    pool: &'a BufferPool,
    tid: TransactionId,
    table_id: TableId,
    desc: TupleDesc,
    iter: Option<HeapFileIterator<'a>>,
}

impl<'a> SeqScanExecutor<'a> {
    pub fn new(
        pool: &'a BufferPool,
        tid: TransactionId,
        table_id: TableId,
        alias: &str,
    ) -> Result<Self> {
        let table_desc = pool.catalog().desc_for(table_id)?;
        let items = table_desc
            .items()
            .iter()
            .map(|item| match item.name() {
                Some(name) => TdItem::named(item.field_type(), format!("{}.{}", alias, name)),
                None => TdItem::new(item.field_type()),
            })
            .collect();

        Ok(Self {
            pool,
            tid,
            table_id,
            desc: TupleDesc::new(items),
            iter: None,
        })
    }
}

impl<'a> Executor for SeqScanExecutor<'a> {
    fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    fn open(&mut self) -> Result<()> {
        let file = self.pool.catalog().file_for(self.table_id)?;
        self.iter = Some(HeapFileIterator::new(file, self.tid, self.pool));
        Ok(())
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        let iter = self.iter.as_mut()?;
        match iter.next() {
            Some(Ok(tuple)) => Some(Ok(tuple.with_desc(self.desc.clone()))),
            other => other,
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match self.iter.as_mut() {
            Some(iter) => {
                iter.rewind();
                Ok(())
            }
            None => Err(DbError::Invalid(
                "cannot rewind an executor that is not open".to_owned(),
            )),
        }
    }

    fn close(&mut self) {
        self.iter = None;
    }
}
