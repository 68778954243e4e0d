//! Page-granular two-phase locking. Each page carries either one exclusive
//! holder or any number of shared holders; a transaction holding the only
//! shared lock on a page may upgrade it in place. Contended requests block on
//! a condition variable and re-evaluate after every release. Every time a
//! request has to wait, the waits-for graph is checked for a cycle through
//! the requester; if one exists the requester is aborted on the spot.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Condvar, Mutex};

use log::{debug, warn};

use crate::common::PageId;
use crate::concurrency::TransactionId;
use crate::error::{DbError, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

struct LockEntry {
    mode: LockMode,
    holders: HashSet<TransactionId>,
}

#[derive(Default)]
struct LockState {
    locks: HashMap<PageId, LockEntry>,
    held: HashMap<TransactionId, HashSet<PageId>>,
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl LockState {
    /// Tries to grant the request. Returns `None` on success, otherwise the
    /// set of transactions the requester has to wait for.
    fn try_acquire(
        &mut self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> Option<HashSet<TransactionId>> {
        match self.locks.entry(pid) {
            Entry::Vacant(vacant) => {
                vacant.insert(LockEntry {
                    mode,
                    holders: HashSet::from([tid]),
                });
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.holders.contains(&tid) {
                    match (entry.mode, mode) {
                        // an exclusive holder already has the strongest lock,
                        // and a repeated shared request is a no-op
                        (LockMode::Exclusive, _) | (LockMode::Shared, LockMode::Shared) => (),
                        (LockMode::Shared, LockMode::Exclusive) => {
                            if entry.holders.len() == 1 {
                                // sole shared holder, upgrade in place
                                entry.mode = LockMode::Exclusive;
                            } else {
                                let mut others = entry.holders.clone();
                                others.remove(&tid);
                                return Some(others);
                            }
                        }
                    }
                } else {
                    match (entry.mode, mode) {
                        (LockMode::Shared, LockMode::Shared) => {
                            entry.holders.insert(tid);
                        }
                        _ => return Some(entry.holders.clone()),
                    }
                }
            }
        }

        self.held.entry(tid).or_default().insert(pid);
        None
    }

    /// True iff `tid` can reach itself through the waits-for graph.
    fn deadlocks(&self, tid: TransactionId) -> bool {
        let mut queue: VecDeque<TransactionId> = match self.waits_for.get(&tid) {
            Some(blockers) => blockers.iter().copied().collect(),
            None => return false,
        };
        let mut visited = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if current == tid {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(blockers) = self.waits_for.get(&current) {
                queue.extend(blockers.iter().copied());
            }
        }
        false
    }

    fn release(&mut self, tid: TransactionId, pid: PageId) {
        let now_unheld = match self.locks.get_mut(&pid) {
            Some(entry) => {
                entry.holders.remove(&tid);
                entry.holders.is_empty()
            }
            None => false,
        };
        if now_unheld {
            self.locks.remove(&pid);
        }
        if let Some(pages) = self.held.get_mut(&tid) {
            pages.remove(&pid);
        }
    }
}

pub struct LockManager {
    state: Mutex<LockState>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
        }
    }

    /// Acquires (or upgrades to) the requested lock, blocking while it is
    /// held incompatibly by other transactions. Fails with
    /// `DbError::TransactionAborted` if waiting would close a cycle in the
    /// waits-for graph; the requester is always the victim.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        loop {
            match state.try_acquire(tid, pid, mode) {
                None => {
                    state.waits_for.remove(&tid);
                    return Ok(());
                }
                Some(blockers) => {
                    debug!(
                        "transaction {} waits for {:?} lock on page {:?}",
                        tid.id(),
                        mode,
                        pid
                    );
                    state.waits_for.insert(tid, blockers);
                    if state.deadlocks(tid) {
                        state.waits_for.remove(&tid);
                        warn!(
                            "aborting transaction {}: deadlock on page {:?}",
                            tid.id(),
                            pid
                        );
                        return Err(DbError::TransactionAborted);
                    }
                    state = self.released.wait(state).unwrap();
                }
            }
        }
    }

    /// Releases a single lock and lets all waiters re-contend.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut state = self.state.lock().unwrap();
        state.release(tid, pid);
        self.released.notify_all();
    }

    /// Releases every lock the transaction holds and purges it from the
    /// waits-for graph. Idempotent.
    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        let pages = state.held.remove(&tid).unwrap_or_default();
        for pid in pages {
            state.release(tid, pid);
        }
        state.waits_for.remove(&tid);
        for blockers in state.waits_for.values_mut() {
            blockers.remove(&tid);
        }
        self.released.notify_all();
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        let state = self.state.lock().unwrap();
        state
            .locks
            .get(&pid)
            .map_or(false, |entry| entry.holders.contains(&tid))
    }

    /// The mode the page is currently held in, if any.
    pub fn lock_mode(&self, pid: PageId) -> Option<LockMode> {
        let state = self.state.lock().unwrap();
        state.locks.get(&pid).map(|entry| entry.mode)
    }

    pub fn pages_held_by(&self, tid: TransactionId) -> Vec<PageId> {
        let state = self.state.lock().unwrap();
        state
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier, Condvar, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::{LockManager, LockMode};
    use crate::concurrency::TransactionId;
    use crate::error::DbError;

    const PAGE: (u32, u32) = (1, 0);

    #[test]
    fn shared_lock_can_be_granted_multiple_times() {
        let lock_manager = Arc::new(LockManager::new());

        let shared_request_count = 5;
        let mut handles = Vec::with_capacity(shared_request_count);
        let barrier = Arc::new(Barrier::new(shared_request_count));

        for _ in 0..shared_request_count {
            let c = Arc::clone(&barrier);
            let lock_manager = Arc::clone(&lock_manager);
            handles.push(thread::spawn(move || {
                let tid = TransactionId::new();
                lock_manager.acquire(tid, PAGE, LockMode::Shared).unwrap();
                c.wait();
                lock_manager.release_all(tid);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn exclusive_lock_excludes_shared_requests() {
        let lock_manager = LockManager::new();

        let (exclusive_taken, condvar) = (Mutex::new(false), Condvar::new());
        let shared_granted = AtomicBool::new(false);

        thread::scope(|scope| {
            let exclusive_taken = &exclusive_taken;
            let condvar = &condvar;
            let lock_manager = &lock_manager;
            let shared_granted = &shared_granted;

            scope.spawn(move || {
                let mut taken = exclusive_taken.lock().unwrap();
                while !*taken {
                    taken = condvar.wait(taken).unwrap();
                }
                drop(taken);
                // page is exclusively locked now, try to get a shared lock
                let tid = TransactionId::new();
                lock_manager.acquire(tid, PAGE, LockMode::Shared).unwrap();
                shared_granted.store(true, Ordering::Relaxed);
                lock_manager.release_all(tid);
            });

            scope.spawn(move || {
                let tid = TransactionId::new();
                lock_manager
                    .acquire(tid, PAGE, LockMode::Exclusive)
                    .unwrap();

                let mut taken = exclusive_taken.lock().unwrap();
                *taken = true;
                condvar.notify_all();
                drop(taken);

                // give the shared request a moment to block
                thread::sleep(Duration::from_millis(200));
                assert!(!shared_granted.load(Ordering::Relaxed));
                lock_manager.release_all(tid);
            });
        });
        assert!(shared_granted.load(Ordering::Relaxed));
    }

    #[test]
    fn sole_shared_holder_can_upgrade() {
        let lock_manager = LockManager::new();
        let tid = TransactionId::new();

        lock_manager.acquire(tid, PAGE, LockMode::Shared).unwrap();
        lock_manager
            .acquire(tid, PAGE, LockMode::Exclusive)
            .unwrap();
        assert_eq!(lock_manager.lock_mode(PAGE), Some(LockMode::Exclusive));

        // re-acquiring in either mode is a no-op for an exclusive holder
        lock_manager.acquire(tid, PAGE, LockMode::Shared).unwrap();
        assert_eq!(lock_manager.lock_mode(PAGE), Some(LockMode::Exclusive));
    }

    #[test]
    fn exclusive_holder_is_alone() {
        let lock_manager = LockManager::new();
        let holder = TransactionId::new();
        lock_manager
            .acquire(holder, PAGE, LockMode::Exclusive)
            .unwrap();

        assert!(lock_manager.holds_lock(holder, PAGE));
        assert_eq!(lock_manager.pages_held_by(holder), vec![PAGE]);

        lock_manager.release(holder, PAGE);
        assert!(!lock_manager.holds_lock(holder, PAGE));
        assert_eq!(lock_manager.lock_mode(PAGE), None);
    }

    #[test]
    fn release_all_is_idempotent() {
        let lock_manager = LockManager::new();
        let tid = TransactionId::new();
        lock_manager.acquire(tid, PAGE, LockMode::Shared).unwrap();
        lock_manager.acquire(tid, (1, 1), LockMode::Exclusive).unwrap();

        lock_manager.release_all(tid);
        assert!(lock_manager.pages_held_by(tid).is_empty());
        // a second call must not panic or change anything
        lock_manager.release_all(tid);
        assert!(lock_manager.pages_held_by(tid).is_empty());
    }

    #[test]
    fn crossing_upgrades_deadlock_and_abort_the_requester() {
        let _ = env_logger::builder().is_test(true).try_init();
        let lock_manager = LockManager::new();
        let page_one = (1, 0);
        let page_two = (1, 1);

        let tid_a = TransactionId::new();
        let tid_b = TransactionId::new();
        lock_manager
            .acquire(tid_a, page_one, LockMode::Shared)
            .unwrap();
        lock_manager
            .acquire(tid_b, page_two, LockMode::Shared)
            .unwrap();

        let barrier = Barrier::new(2);
        let aborted = Mutex::new(Vec::new());
        thread::scope(|scope| {
            let lock_manager = &lock_manager;
            let barrier = &barrier;
            let aborted = &aborted;

            scope.spawn(move || {
                barrier.wait();
                match lock_manager.acquire(tid_a, page_two, LockMode::Exclusive) {
                    Ok(()) => lock_manager.release_all(tid_a),
                    Err(DbError::TransactionAborted) => {
                        aborted.lock().unwrap().push(tid_a);
                        lock_manager.release_all(tid_a);
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            });

            scope.spawn(move || {
                barrier.wait();
                match lock_manager.acquire(tid_b, page_one, LockMode::Exclusive) {
                    Ok(()) => lock_manager.release_all(tid_b),
                    Err(DbError::TransactionAborted) => {
                        aborted.lock().unwrap().push(tid_b);
                        lock_manager.release_all(tid_b);
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            });
        });

        assert_eq!(
            aborted.lock().unwrap().len(),
            1,
            "exactly one of the two crossing transactions must be the victim"
        );
    }
}
