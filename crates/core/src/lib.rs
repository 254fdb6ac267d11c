//! Core layer for the ambit scope engine
//!
//! This crate defines everything the engine crates share but do not own:
//! - Error taxonomy (`ScopeError`) and the crate-wide `Result` alias
//! - Identity types (`ScopeInstanceId`, `LockId`) and scope settings
//! - Collaborator contracts consumed by the engine but implemented
//!   elsewhere: the transactional resource (`TransactionalResource` /
//!   `ActiveTransaction`) and the distributed locking mechanism
//!   (`LockingMechanism` / `HeldLock`)
//!
//! Nothing in this crate holds state. The engine lives in `ambit-engine`,
//! lock bookkeeping in `ambit-locking`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, ScopeError};
pub use traits::{ActiveTransaction, HeldLock, LockingMechanism, TransactionalResource};
pub use types::{LockId, LockKind, RepositoryCacheMode, ScopeInstanceId, ScopeOptions};
