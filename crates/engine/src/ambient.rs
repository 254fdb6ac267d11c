//! Ambient stacks scoped to the logical call context
//!
//! The engine tracks which scope chain is "current" through two LIFO
//! stacks: one for scopes, one for scope contexts. Storage is scoped to
//! the logical call context — in this engine, the OS thread. Two unrelated
//! flows never observe each other's stacks; continuing a unit of work on
//! another thread is what detach/attach is for.
//!
//! The storage primitive is never exposed: callers only see the
//! push/pop/peek contract. Pop fails loudly on an empty stack — that is a
//! fatal usage error, not a recoverable condition. Two threads mutating
//! one flow's stack at once is a caller bug; the `RefCell` borrow check is
//! allowed to surface it rather than serializing it away.

use crate::context::ScopeContext;
use crate::scope::ScopeInner;
use ambit_core::{Result, ScopeError};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static SCOPES: RefCell<SmallVec<[Arc<ScopeInner>; 4]>> = RefCell::new(SmallVec::new());
    static CONTEXTS: RefCell<SmallVec<[Arc<ScopeContext>; 2]>> = RefCell::new(SmallVec::new());
}

/// Push a scope onto the calling context's stack
pub(crate) fn push_scope(scope: Arc<ScopeInner>) {
    SCOPES.with(|stack| stack.borrow_mut().push(scope));
}

/// Remove and return the top scope
///
/// # Errors
/// `NoAmbientScope` if the stack is empty.
pub(crate) fn pop_scope() -> Result<Arc<ScopeInner>> {
    SCOPES.with(|stack| stack.borrow_mut().pop().ok_or(ScopeError::NoAmbientScope))
}

/// The current ambient scope, if any
pub(crate) fn peek_scope() -> Option<Arc<ScopeInner>> {
    SCOPES.with(|stack| stack.borrow().last().cloned())
}

/// Depth of the calling context's scope stack
pub(crate) fn scope_depth() -> usize {
    SCOPES.with(|stack| stack.borrow().len())
}

/// Push a scope context onto the calling context's stack
pub(crate) fn push_context(context: Arc<ScopeContext>) {
    CONTEXTS.with(|stack| stack.borrow_mut().push(context));
}

/// Remove and return the top scope context
///
/// # Errors
/// `NoAmbientContext` if the stack is empty.
pub(crate) fn pop_context() -> Result<Arc<ScopeContext>> {
    CONTEXTS.with(|stack| {
        stack
            .borrow_mut()
            .pop()
            .ok_or(ScopeError::NoAmbientContext)
    })
}

/// The current ambient scope context, if any
pub(crate) fn peek_context() -> Option<Arc<ScopeContext>> {
    CONTEXTS.with(|stack| stack.borrow().last().cloned())
}
