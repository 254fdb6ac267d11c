//! Lock ownership ledger for a scope chain
//!
//! Every lock request made anywhere in a scope chain is recorded here, on
//! the root scope, keyed by the root's instance id. A repeated request for
//! an (id, kind) the chain already holds only bumps a refcount — the
//! mechanism is called once per (id, kind), and released once, when the
//! root scope disposes.
//!
//! Release order is deterministic: ascending lock id, write handle before
//! read handle within an id.

use ambit_core::{HeldLock, LockId, LockKind, LockingMechanism, Result, ScopeInstanceId};
use std::collections::BTreeMap;
use std::time::Duration;

struct Held {
    count: u32,
    handle: Box<dyn HeldLock>,
}

#[derive(Default)]
struct IdEntry {
    read: Option<Held>,
    write: Option<Held>,
}

/// Refcounted lock ownership for one root scope
pub struct LockLedger {
    owner: ScopeInstanceId,
    entries: BTreeMap<LockId, IdEntry>,
}

impl LockLedger {
    /// Create an empty ledger owned by the given root scope
    pub fn new(owner: ScopeInstanceId) -> Self {
        LockLedger {
            owner,
            entries: BTreeMap::new(),
        }
    }

    /// Instance id of the owning root scope
    pub fn owner(&self) -> ScopeInstanceId {
        self.owner
    }

    /// Acquire (or re-enter) a lock on behalf of the owning chain
    ///
    /// Calls the mechanism only when the chain does not already hold
    /// (id, kind); otherwise the existing acquisition is reference-counted.
    ///
    /// # Errors
    /// Propagates the mechanism's timeout error unchanged. A failed
    /// acquisition records nothing, leaving the chain disposable.
    pub fn acquire(
        &mut self,
        mechanism: &dyn LockingMechanism,
        id: LockId,
        kind: LockKind,
        timeout: Duration,
    ) -> Result<()> {
        let entry = self.entries.entry(id).or_default();

        // A chain-held write lock subsumes read intent on the same id;
        // re-enter it instead of asking the mechanism to grant a read
        // against our own exclusive hold.
        if kind == LockKind::Read {
            if let Some(held) = &mut entry.write {
                held.count += 1;
                return Ok(());
            }
        }

        let slot = match kind {
            LockKind::Read => &mut entry.read,
            LockKind::Write => &mut entry.write,
        };
        if let Some(held) = slot {
            held.count += 1;
            return Ok(());
        }

        let handle = match kind {
            LockKind::Read => mechanism.acquire_read(id, timeout)?,
            LockKind::Write => mechanism.acquire_write(id, timeout)?,
        };
        tracing::debug!(owner = %self.owner, lock_id = %id, %kind, "lock acquired");
        *slot = Some(Held { count: 1, handle });
        Ok(())
    }

    /// Number of outstanding requests for (id, kind)
    pub fn held_count(&self, id: LockId, kind: LockKind) -> u32 {
        self.entries
            .get(&id)
            .and_then(|entry| match kind {
                LockKind::Read => entry.read.as_ref(),
                LockKind::Write => entry.write.as_ref(),
            })
            .map(|held| held.count)
            .unwrap_or(0)
    }

    /// Whether the ledger holds no locks
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every held lock, exactly once each
    ///
    /// Called by root scope disposal. Handles are dropped in ascending lock
    /// id order, write before read within an id.
    pub fn release_all(&mut self) {
        for (id, entry) in std::mem::take(&mut self.entries) {
            if let Some(held) = entry.write {
                debug_assert_eq!(held.handle.kind(), LockKind::Write);
                tracing::debug!(owner = %self.owner, lock_id = %id, "write lock released");
                drop(held.handle);
            }
            if let Some(held) = entry.read {
                tracing::debug!(owner = %self.owner, lock_id = %id, "read lock released");
                drop(held.handle);
            }
        }
    }
}
