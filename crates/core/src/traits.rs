//! Collaborator contracts consumed by the scope engine
//!
//! The engine coordinates two external capabilities it does not implement:
//!
//! - **Transactional resource**: an opaque handle to the underlying storage
//!   connection and its active transaction. The engine begins exactly one
//!   transaction per root scope (lazily, on first use) and commits or rolls
//!   it back exactly once, at root disposal.
//! - **Distributed locking mechanism**: named read/write locks with a
//!   timeout. Deadlock detection is the mechanism's business; the engine
//!   only surfaces the resulting timeout faithfully.
//!
//! Both contracts are object-safe so the engine can hold them as trait
//! objects and stay independent of the concrete persistence stack.

use crate::error::Result;
use crate::types::{LockId, LockKind};
use std::any::Any;
use std::time::Duration;

/// Provider of transactional units against some backing store
///
/// Implementations open whatever connection they need and hand back an
/// [`ActiveTransaction`]. Opening may block; the engine calls this lazily,
/// on the first operation that actually touches the resource, so scopes
/// that never do database work never open a connection.
pub trait TransactionalResource: Send + Sync {
    /// Open the underlying connection (if needed) and begin a transaction
    ///
    /// # Errors
    /// Returns a `Resource` error if the connection cannot be opened or the
    /// transaction cannot be started.
    fn begin_transaction(&self) -> Result<Box<dyn ActiveTransaction>>;
}

/// An open transaction owned by a root scope
///
/// Exactly one of [`commit`](ActiveTransaction::commit) or
/// [`rollback`](ActiveTransaction::rollback) is called, by the root scope's
/// disposal, after which the handle is consumed. Dropping an un-consumed
/// handle must be equivalent to rollback.
pub trait ActiveTransaction: Send {
    /// Commit the transaction and release the underlying connection
    ///
    /// # Errors
    /// Returns a `Resource` error if the commit fails; the engine treats the
    /// unit of work as not having landed.
    fn commit(self: Box<Self>) -> Result<()>;

    /// Roll the transaction back and release the underlying connection
    ///
    /// # Errors
    /// Returns a `Resource` error if the rollback itself fails.
    fn rollback(self: Box<Self>) -> Result<()>;

    /// Typed access for resource-specific adapters
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A held distributed lock, released when dropped
///
/// Handles are collected in the root scope's lock ledger and dropped, in
/// deterministic lock-id order, during root disposal.
pub trait HeldLock: Send {
    /// Identifier this lock was acquired on
    fn lock_id(&self) -> LockId;

    /// Read or write intent of the acquisition
    fn kind(&self) -> LockKind;
}

/// Distributed pessimistic locking mechanism
///
/// Read locks are shared and reentrant across concurrent holders; write
/// locks are exclusive. Acquisition blocks up to `timeout`, then fails with
/// `ReadLockTimeout` / `WriteLockTimeout`. Deadlocks across different ids
/// acquired in opposing order are detected by the mechanism (or starved out
/// by the timeout) and reported as a timeout to the losing side.
pub trait LockingMechanism: Send + Sync {
    /// Acquire a shared lock on `id`, waiting at most `timeout`
    ///
    /// # Errors
    /// `ReadLockTimeout` if the lock is not granted within `timeout`.
    fn acquire_read(&self, id: LockId, timeout: Duration) -> Result<Box<dyn HeldLock>>;

    /// Acquire an exclusive lock on `id`, waiting at most `timeout`
    ///
    /// # Errors
    /// `WriteLockTimeout` if the lock is not granted within `timeout`.
    fn acquire_write(&self, id: LockId, timeout: Duration) -> Result<Box<dyn HeldLock>>;
}
