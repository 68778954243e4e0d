//! Pull-based query executors. A query plan is a tree of executors; the
//! consumer repeatedly calls `next` on the root and every executor pulls from
//! its children. Children are wired in at construction, opened by their
//! parent's `open` and closed by its `close`.

use crate::error::Result;
use crate::tuple::schema::TupleDesc;
use crate::tuple::value::{CompareOp, Field};
use crate::tuple::Tuple;

pub mod aggregate_executor;
pub mod delete_executor;
pub mod filter_executor;
pub mod insert_executor;
pub mod nested_loop_join_executor;
pub mod seq_scan_executor;

pub trait Executor {
    /// The schema of the tuples this executor produces. Available before
    /// `open`.
    fn desc(&self) -> &TupleDesc;

    /// Prepares the executor (and its children) for iteration. Must be called
    /// before `next`.
    fn open(&mut self) -> Result<()>;

    /// The next tuple, or `None` once the stream is exhausted. A closed or
    /// never-opened executor yields `None`.
    fn next(&mut self) -> Option<Result<Tuple>>;

    /// Restarts iteration from the beginning, equivalent to `close` followed
    /// by `open`.
    fn rewind(&mut self) -> Result<()>;

    /// Shuts the executor (and its children) down; afterwards `next` yields
    /// `None`.
    fn close(&mut self);
}

/// Compares one field of a tuple against a constant.
#[derive(Clone, Debug)]
pub struct Predicate {
    field: usize,
    op: CompareOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: CompareOp, operand: Field) -> Self {
        Self { field, op, operand }
    }

    pub fn eval(&self, tuple: &Tuple) -> bool {
        tuple.field(self.field).compare(self.op, &self.operand)
    }
}

/// Compares a field of a left tuple against a field of a right tuple.
#[derive(Clone, Debug)]
pub struct JoinPredicate {
    left_field: usize,
    op: CompareOp,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: CompareOp, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }

    pub fn eval(&self, left: &Tuple, right: &Tuple) -> bool {
        left.field(self.left_field)
            .compare(self.op, right.field(self.right_field))
    }
}
