//! Resource adapters
//!
//! The engine is one generic unit-of-work core over the opaque
//! `TransactionalResource` capability; what used to be parallel raw-SQL
//! and ORM scope implementations become adapters behind that contract.
//! Two ship here:
//!
//! - [`InMemoryResource`]: a buffered key-value unit of work applied on
//!   commit and discarded on rollback, with begin/commit/rollback
//!   counters. The reference adapter for embedding and tests.
//! - [`LayeredResource`]: composes an outer and an inner resource into a
//!   single transactional unit, for chains that must keep two persistence
//!   stacks consistent: commit commits outer then inner, any failure
//!   leaves the inner rolled back.

use ambit_core::{ActiveTransaction, Result, TransactionalResource};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

/// In-memory transactional resource
///
/// Writes are buffered in the transaction and applied to the shared map
/// atomically at commit; rollback (and dropping an un-consumed
/// transaction) discards them. Clones share the same store, so a test can
/// keep a handle for assertions while the provider owns another.
#[derive(Clone, Default)]
pub struct InMemoryResource {
    store: Arc<MemoryStore>,
}

impl InMemoryResource {
    /// Create an empty in-memory resource
    pub fn new() -> Self {
        InMemoryResource::default()
    }

    /// Read a committed value
    pub fn get(&self, key: &str) -> Option<String> {
        self.store.map.lock().get(key).cloned()
    }

    /// Number of committed keys
    pub fn len(&self) -> usize {
        self.store.map.lock().len()
    }

    /// Whether no key has been committed
    pub fn is_empty(&self) -> bool {
        self.store.map.lock().is_empty()
    }

    /// Transactions begun so far
    pub fn begun_count(&self) -> u64 {
        self.store.begun.load(Ordering::SeqCst)
    }

    /// Transactions committed so far
    pub fn committed_count(&self) -> u64 {
        self.store.committed.load(Ordering::SeqCst)
    }

    /// Transactions rolled back so far (explicitly or by drop)
    pub fn rolled_back_count(&self) -> u64 {
        self.store.rolled_back.load(Ordering::SeqCst)
    }
}

impl TransactionalResource for InMemoryResource {
    fn begin_transaction(&self) -> Result<Box<dyn ActiveTransaction>> {
        self.store.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryTransaction {
            store: Arc::clone(&self.store),
            writes: BTreeMap::new(),
            deletes: BTreeSet::new(),
            finished: false,
        }))
    }
}

/// Buffered unit of work against an [`InMemoryResource`]
pub struct InMemoryTransaction {
    store: Arc<MemoryStore>,
    writes: BTreeMap<String, String>,
    deletes: BTreeSet<String>,
    finished: bool,
}

impl InMemoryTransaction {
    /// Buffer a write; visible to this transaction only until commit
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.deletes.remove(&key);
        self.writes.insert(key, value.into());
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.writes.remove(&key);
        self.deletes.insert(key);
    }

    /// Read with read-your-writes semantics
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.writes.get(key) {
            return Some(value.clone());
        }
        if self.deletes.contains(key) {
            return None;
        }
        self.store.map.lock().get(key).cloned()
    }

    /// Number of buffered operations
    pub fn pending(&self) -> usize {
        self.writes.len() + self.deletes.len()
    }
}

impl ActiveTransaction for InMemoryTransaction {
    fn commit(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        let mut map = self.store.map.lock();
        for (key, value) in std::mem::take(&mut self.writes) {
            map.insert(key, value);
        }
        for key in std::mem::take(&mut self.deletes) {
            map.remove(&key);
        }
        drop(map);
        self.store.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        self.store.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        // Dropping an un-consumed transaction is a rollback.
        if !self.finished {
            self.store.rolled_back.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Composite resource keeping two persistence stacks consistent
///
/// One root scope, one logical transaction, two backing transactions: the
/// root's outcome is propagated into both layers at disposal. Commit
/// order is outer first; an outer commit failure rolls the inner back so
/// the layers never diverge silently.
pub struct LayeredResource {
    outer: Arc<dyn TransactionalResource>,
    inner: Arc<dyn TransactionalResource>,
}

impl LayeredResource {
    /// Compose an outer and an inner resource
    pub fn new(
        outer: Arc<dyn TransactionalResource>,
        inner: Arc<dyn TransactionalResource>,
    ) -> Self {
        LayeredResource { outer, inner }
    }
}

impl TransactionalResource for LayeredResource {
    fn begin_transaction(&self) -> Result<Box<dyn ActiveTransaction>> {
        let outer = self.outer.begin_transaction()?;
        let inner = match self.inner.begin_transaction() {
            Ok(inner) => inner,
            Err(err) => {
                if let Err(rollback_err) = outer.rollback() {
                    tracing::warn!(error = %rollback_err, "outer rollback failed after inner begin failure");
                }
                return Err(err);
            }
        };
        Ok(Box::new(LayeredTransaction { outer, inner }))
    }
}

/// Paired transactions produced by a [`LayeredResource`]
pub struct LayeredTransaction {
    outer: Box<dyn ActiveTransaction>,
    inner: Box<dyn ActiveTransaction>,
}

impl LayeredTransaction {
    /// The outer layer's transaction
    pub fn outer_mut(&mut self) -> &mut dyn ActiveTransaction {
        self.outer.as_mut()
    }

    /// The inner layer's transaction
    pub fn inner_mut(&mut self) -> &mut dyn ActiveTransaction {
        self.inner.as_mut()
    }
}

impl ActiveTransaction for LayeredTransaction {
    fn commit(self: Box<Self>) -> Result<()> {
        let LayeredTransaction { outer, inner } = *self;
        match outer.commit() {
            Ok(()) => inner.commit(),
            Err(err) => {
                if let Err(rollback_err) = inner.rollback() {
                    tracing::warn!(error = %rollback_err, "inner rollback failed after outer commit failure");
                }
                Err(err)
            }
        }
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        let LayeredTransaction { outer, inner } = *self;
        let outer_result = outer.rollback();
        let inner_result = inner.rollback();
        outer_result.and(inner_result)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Resource whose commits always fail (test double)
#[cfg(test)]
pub(crate) struct FailingCommitResource {
    delegate: InMemoryResource,
}

#[cfg(test)]
impl FailingCommitResource {
    pub(crate) fn new(delegate: InMemoryResource) -> Self {
        FailingCommitResource { delegate }
    }
}

#[cfg(test)]
impl TransactionalResource for FailingCommitResource {
    fn begin_transaction(&self) -> Result<Box<dyn ActiveTransaction>> {
        let delegate = self.delegate.begin_transaction()?;
        Ok(Box::new(FailingCommitTransaction { delegate }))
    }
}

#[cfg(test)]
struct FailingCommitTransaction {
    delegate: Box<dyn ActiveTransaction>,
}

#[cfg(test)]
impl ActiveTransaction for FailingCommitTransaction {
    fn commit(self: Box<Self>) -> Result<()> {
        let _ = self.delegate.rollback();
        Err(ambit_core::ScopeError::resource("commit refused"))
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.delegate.rollback()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self.delegate.as_any_mut()
    }
}
