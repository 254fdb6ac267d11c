//! Distributed lock coordination for the ambit scope engine
//!
//! Two pieces live here:
//!
//! - **`InMemoryLocks`**: a reference implementation of the
//!   `LockingMechanism` contract using per-lock-id cells (shared readers,
//!   exclusive writer, deadline-bounded waits). It exhibits the full
//!   semantics the engine relies on — concurrent readers interleave, a
//!   writer excludes everyone, opposing-order acquisition across two ids
//!   deadlocks into a timeout on at least one side — without any external
//!   coordination service.
//! - **`LockLedger`**: the engine-side ownership bookkeeping. All lock
//!   requests from a scope chain land in the root scope's ledger, repeated
//!   requests for a held (id, kind) only bump a refcount, and release
//!   happens exactly once, at root disposal, in deterministic id order.
//!
//! The mechanism contract itself is defined in `ambit-core`; production
//! deployments substitute a database-backed implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ledger;
pub mod memory;

pub use ledger::LockLedger;
pub use memory::InMemoryLocks;
