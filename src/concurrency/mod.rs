use std::sync::atomic::{AtomicU64, Ordering};

pub mod lock_manager;

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

/// Identifies one transaction. Transactions begin implicitly with their first
/// lock acquisition and end when the buffer pool completes them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> Self {
        Self(NEXT_TID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    pub(crate) fn from_id(id: u64) -> Self {
        Self(id)
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The access level a caller requests on a page. Read-only access maps to a
/// shared lock, read-write access to an exclusive lock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}
