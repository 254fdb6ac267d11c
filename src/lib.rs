//! Ambit - Ambient scope stack and unit-of-work engine
//!
//! Ambit coordinates a single logical transaction per call tree: nested
//! scope requests join the chain opened by the outermost (root) scope, and
//! only the root commits or rolls back, decided by an explicit completion
//! intent that defaults to rollback. On top of that it provides exit
//! notifications that fire exactly once per chain, detachable scopes that
//! migrate a unit of work between threads, and pessimistic lock
//! coordination owned by the chain's root.
//!
//! # Quick Start
//!
//! ```
//! use ambit::{InMemoryLocks, InMemoryResource, InMemoryTransaction, ScopeOptions, ScopeProvider};
//! use std::sync::Arc;
//!
//! # fn main() -> ambit::Result<()> {
//! let resource = InMemoryResource::new();
//! let provider = ScopeProvider::new(
//!     Arc::new(resource.clone()),
//!     Arc::new(InMemoryLocks::new()),
//! );
//!
//! let mut scope = provider.create_scope(ScopeOptions::default())?;
//! scope.with_typed_transaction::<InMemoryTransaction, _>(|txn| {
//!     txn.put("greeting", "hello");
//!     Ok(())
//! })?;
//! scope.complete()?;
//! scope.dispose()?;
//!
//! assert_eq!(resource.get("greeting").as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The engine lives in three member crates, re-exported here:
//! - `ambit-core`: error taxonomy, identity types, and the collaborator
//!   contracts (transactional resource, locking mechanism)
//! - `ambit-locking`: lock-ownership ledger and the in-memory reference
//!   locking mechanism
//! - `ambit-engine`: ambient stacks, scope context, scope, detachable
//!   scope support, provider, and resource adapters

pub use ambit_core::{
    ActiveTransaction, HeldLock, LockId, LockKind, LockingMechanism, RepositoryCacheMode, Result,
    ScopeError, ScopeInstanceId, ScopeOptions, TransactionalResource,
};
pub use ambit_engine::{
    InMemoryResource, InMemoryTransaction, LayeredResource, LayeredTransaction, Scope,
    ScopeContext, ScopeProvider,
};
pub use ambit_locking::{InMemoryLocks, LockLedger};
