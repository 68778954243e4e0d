//! The bounded page cache every page access goes through. `get_page` first
//! acquires the logical page lock, so by the time a caller sees a page it is
//! protected by strict two-phase locking; the pool's own mutex only guards
//! the cache map itself.
//!
//! Buffering policy is no-steal/no-force: a dirty page is never evicted to
//! make room, and commit only forces log records while the data-file write is
//! deferred to a later flush. Abort therefore rolls back purely in memory by
//! reloading the clean on-disk copies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use super::lru_replacer::LruReplacer;
use crate::catalog::Catalog;
use crate::common::{PageId, TableId};
use crate::concurrency::lock_manager::{LockManager, LockMode};
use crate::concurrency::{Permissions, TransactionId};
use crate::error::{DbError, Result};
use crate::storage::heap_page::HeapPage;
use crate::storage::log::LogFile;
use crate::tuple::Tuple;

/// A cached page. The logical page lock arbitrates which transactions may
/// touch it; the `RwLock` only serializes the physical reads and writes.
pub type PageRef = Arc<RwLock<HeapPage>>;

struct PoolInner {
    pages: HashMap<PageId, PageRef>,
    replacer: LruReplacer,
}

pub struct BufferPool {
    capacity: usize,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
    log_file: Arc<LogFile>,
    inner: Mutex<PoolInner>,
}

impl BufferPool {
    pub fn new(capacity: usize, catalog: Arc<Catalog>, log_file: Arc<LogFile>) -> Self {
        Self {
            capacity,
            lock_manager: LockManager::new(),
            catalog,
            log_file,
            inner: Mutex::new(PoolInner {
                pages: HashMap::new(),
                replacer: LruReplacer::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Fetches a page on behalf of a transaction, acquiring the shared or
    /// exclusive page lock first. May block on that lock and fails with
    /// `TransactionAborted` if the transaction becomes a deadlock victim.
    /// On a miss the page is loaded from its table's file, evicting the least
    /// recently used clean page if the pool is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<PageRef> {
        let mode = match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        };
        self.lock_manager.acquire(tid, pid, mode)?;

        let mut inner = self.inner.lock().unwrap();
        if let Some(page) = inner.pages.get(&pid).cloned() {
            inner.replacer.touch(pid);
            return Ok(page);
        }

        if inner.pages.len() >= self.capacity {
            Self::evict(&mut inner)?;
        }

        let file = self.catalog.file_for(pid.0)?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        inner.pages.insert(pid, page.clone());
        inner.replacer.touch(pid);
        Ok(page)
    }

    /// Drops the least recently used clean page. Dirty pages are never
    /// evicted; if nothing is clean the pool is stuck and the caller has to
    /// flush or complete a transaction first.
    fn evict(inner: &mut PoolInner) -> Result<()> {
        let PoolInner { pages, replacer } = inner;
        let victim = replacer
            .victims()
            .find(|pid| {
                pages
                    .get(pid)
                    .map_or(false, |page| page.read().unwrap().dirtier().is_none())
            })
            .ok_or(DbError::BufferFull)?;

        debug!("evicting page {:?}", victim);
        pages.remove(&victim);
        replacer.forget(victim);
        Ok(())
    }

    /// Adds a tuple to the given table, locking and dirtying every page the
    /// heap file touches.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: Tuple) -> Result<()> {
        let file = self.catalog.file_for(table_id)?;
        let pages = file.insert_tuple(tid, tuple, self)?;
        for page in pages {
            page.write().unwrap().mark_dirty(Some(tid));
        }
        Ok(())
    }

    /// Removes a tuple from the page its record id points at.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let (pid, _) = tuple
            .record_id()
            .ok_or_else(|| DbError::Invalid("cannot delete a tuple without a record id".to_owned()))?;
        let file = self.catalog.file_for(pid.0)?;
        let page = file.delete_tuple(tid, tuple, self)?;
        page.write().unwrap().mark_dirty(Some(tid));
        Ok(())
    }

    /// Releases a single page lock before the transaction ends. Breaking
    /// two-phase locking this way forfeits serializability for the page, so
    /// only callers that know the page cannot be touched again should use it.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    fn cached_page(&self, pid: PageId) -> Option<PageRef> {
        self.inner.lock().unwrap().pages.get(&pid).cloned()
    }

    /// Writes a cached page back to its file if it is dirty, logging the
    /// change first (write-ahead: the log is forced before the data write).
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let page = match self.cached_page(pid) {
            Some(page) => page,
            None => return Ok(()),
        };
        let mut locked = page.write().unwrap();
        if let Some(dirtier) = locked.dirtier() {
            debug!("flushing page {:?} dirtied by {}", pid, dirtier.id());
            let current = locked.serialize();
            self.log_file
                .log_write(dirtier, pid, locked.before_image(), &current)?;
            self.log_file.force()?;
            self.catalog.file_for(pid.0)?.write_page(&locked)?;
            locked.mark_dirty(None);
        }
        Ok(())
    }

    /// Writes back every cached page the transaction dirtied.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for pid in self.dirtied_by(tid) {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Writes back every dirty page in the pool.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pids = {
            let inner = self.inner.lock().unwrap();
            inner.pages.keys().copied().collect::<Vec<_>>()
        };
        for pid in pids {
            self.flush_page(pid)?;
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it anywhere.
    pub fn discard_page(&self, pid: PageId) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.remove(&pid);
        inner.replacer.forget(pid);
    }

    fn dirtied_by(&self, tid: TransactionId) -> Vec<PageId> {
        let inner = self.inner.lock().unwrap();
        inner
            .pages
            .iter()
            .filter(|(_, page)| page.read().unwrap().dirtier() == Some(tid))
            .map(|(pid, _)| *pid)
            .collect()
    }

    /// Ends a transaction. On commit the change of every still-cached page
    /// the transaction dirtied is logged and forced, and the page's
    /// before-image is reset to its current bytes; the data-file write itself
    /// stays deferred. On abort the clean copy of every still-cached page the
    /// transaction holds a lock on is reloaded from disk, clearing its dirty
    /// flag. Both paths release all of the transaction's locks.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            for pid in self.lock_manager.pages_held_by(tid) {
                if let Some(page) = self.cached_page(pid) {
                    let mut locked = page.write().unwrap();
                    if locked.dirtier() == Some(tid) {
                        let current = locked.serialize();
                        self.log_file
                            .log_write(tid, pid, locked.before_image(), &current)?;
                        self.log_file.force()?;
                        locked.set_before_image();
                    }
                }
            }
            debug!("transaction {} committed", tid.id());
        } else {
            for pid in self.lock_manager.pages_held_by(tid) {
                if let Some(page) = self.cached_page(pid) {
                    let fresh = self.catalog.file_for(pid.0)?.read_page(pid)?;
                    *page.write().unwrap() = fresh;
                }
            }
            debug!("transaction {} aborted", tid.id());
        }
        self.lock_manager.release_all(tid);
        Ok(())
    }
}
