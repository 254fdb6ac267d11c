//! In-memory reference locking mechanism
//!
//! Each lock id maps to a cell holding reader/writer counts behind a mutex,
//! with a condvar for wakeups. Waits are deadline-bounded: a request that
//! cannot be granted before its deadline fails with the read- or write-
//! flavored timeout error, which is also how a cross-id deadlock resolves —
//! both sides block, at least one deadline expires, and the loser's scope
//! chain remains disposable.
//!
//! Release is handle-drop: the mechanism returns a guard that decrements
//! the cell and notifies waiters when dropped.

use ambit_core::{HeldLock, LockId, LockKind, LockingMechanism, Result, ScopeError};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct CellState {
    readers: usize,
    writer: bool,
}

struct LockCell {
    state: Mutex<CellState>,
    released: Condvar,
}

impl LockCell {
    fn new() -> Self {
        LockCell {
            state: Mutex::new(CellState::default()),
            released: Condvar::new(),
        }
    }
}

/// In-memory `LockingMechanism` implementation
///
/// Suitable for embedding and tests; a production deployment substitutes a
/// database-backed mechanism behind the same contract.
#[derive(Default)]
pub struct InMemoryLocks {
    cells: DashMap<LockId, Arc<LockCell>>,
}

impl InMemoryLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        InMemoryLocks {
            cells: DashMap::new(),
        }
    }

    fn cell(&self, id: LockId) -> Arc<LockCell> {
        self.cells
            .entry(id)
            .or_insert_with(|| Arc::new(LockCell::new()))
            .clone()
    }

    /// Number of readers currently holding `id` (diagnostic)
    pub fn reader_count(&self, id: LockId) -> usize {
        self.cells
            .get(&id)
            .map(|cell| cell.state.lock().readers)
            .unwrap_or(0)
    }

    /// Whether a writer currently holds `id` (diagnostic)
    pub fn writer_held(&self, id: LockId) -> bool {
        self.cells
            .get(&id)
            .map(|cell| cell.state.lock().writer)
            .unwrap_or(false)
    }
}

impl LockingMechanism for InMemoryLocks {
    fn acquire_read(&self, id: LockId, timeout: Duration) -> Result<Box<dyn HeldLock>> {
        let cell = self.cell(id);
        let deadline = Instant::now() + timeout;
        {
            let mut state = cell.state.lock();
            while state.writer {
                if cell.released.wait_until(&mut state, deadline).timed_out() && state.writer {
                    tracing::debug!(lock_id = %id, ?timeout, "read lock timed out");
                    return Err(ScopeError::ReadLockTimeout {
                        lock_id: id,
                        timeout,
                    });
                }
            }
            state.readers += 1;
        }
        Ok(Box::new(MemoryLockGuard {
            cell,
            id,
            kind: LockKind::Read,
        }))
    }

    fn acquire_write(&self, id: LockId, timeout: Duration) -> Result<Box<dyn HeldLock>> {
        let cell = self.cell(id);
        let deadline = Instant::now() + timeout;
        {
            let mut state = cell.state.lock();
            while state.writer || state.readers > 0 {
                if cell.released.wait_until(&mut state, deadline).timed_out()
                    && (state.writer || state.readers > 0)
                {
                    tracing::debug!(lock_id = %id, ?timeout, "write lock timed out");
                    return Err(ScopeError::WriteLockTimeout {
                        lock_id: id,
                        timeout,
                    });
                }
            }
            state.writer = true;
        }
        Ok(Box::new(MemoryLockGuard {
            cell,
            id,
            kind: LockKind::Write,
        }))
    }
}

struct MemoryLockGuard {
    cell: Arc<LockCell>,
    id: LockId,
    kind: LockKind,
}

impl HeldLock for MemoryLockGuard {
    fn lock_id(&self) -> LockId {
        self.id
    }

    fn kind(&self) -> LockKind {
        self.kind
    }
}

impl Drop for MemoryLockGuard {
    fn drop(&mut self) {
        let mut state = self.cell.state.lock();
        match self.kind {
            LockKind::Read => {
                state.readers = state.readers.saturating_sub(1);
            }
            LockKind::Write => {
                state.writer = false;
            }
        }
        drop(state);
        self.cell.released.notify_all();
    }
}
