//! Ambient scope stack and unit-of-work engine
//!
//! This crate implements the scope engine:
//! - **Ambient stacks**: LIFO scope/context stacks isolated per logical
//!   call context (the OS thread), hidden behind a push/pop/peek contract
//! - **ScopeContext**: exit callbacks that fire exactly once when the
//!   outermost scope of a chain exits
//! - **Scope**: the unit-of-work object — one transaction per chain,
//!   begun lazily, committed or rolled back only by the root, with
//!   tri-state completion intent defaulting to rollback
//! - **Detachable scopes**: root scopes moved between call contexts via
//!   explicit attach/detach, with restoration-point validation
//! - **ScopeProvider**: the factory deciding root vs child and mediating
//!   attach/detach
//! - **Resource adapters**: `InMemoryResource` for embedding and tests,
//!   `LayeredResource` for chains spanning two persistence stacks
//!
//! ## Failure semantics
//!
//! Nothing is retried or recovered silently. Consistency violations
//! (disposing a non-ambient scope, popping an empty stack, double attach,
//! out-of-order detach) are programmer errors and surface immediately.
//! Lock timeouts are the one caller-retryable condition. Resource
//! failures propagate after best-effort cleanup: the scope is still
//! disposed and its locks released.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod ambient;
pub mod context;
mod detached;
pub mod provider;
pub mod resource;
pub mod scope;

pub use context::{ScopeContext, DEFAULT_PRIORITY};
pub use provider::ScopeProvider;
pub use resource::{InMemoryResource, InMemoryTransaction, LayeredResource, LayeredTransaction};
pub use scope::Scope;
