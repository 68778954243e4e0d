use crate::error::Result;
use crate::executors::{Executor, Predicate};
use crate::tuple::schema::TupleDesc;
use crate::tuple::Tuple;

/// Passes through the tuples of its child for which the predicate holds.
pub struct FilterExecutor<'a> {
    child: Box<dyn Executor + 'a>,
    predicate: Predicate,
}

impl<'a> FilterExecutor<'a> {
    pub fn new(child: Box<dyn Executor + 'a>, predicate: Predicate) -> Self {
        Self { child, predicate }
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        while let Some(tuple) = self.child.next().transpose()? {
            if self.predicate.eval(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl<'a> Executor for FilterExecutor<'a> {
    fn desc(&self) -> &TupleDesc {
        self.child.desc()
    }

    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.fetch_next().transpose()
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }
}
