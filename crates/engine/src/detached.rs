//! Detachable-scope bookkeeping
//!
//! A detachable scope is a root scope designed to move between logical
//! call contexts: it is never pushed implicitly at creation, but attached
//! to and detached from a context's ambient stacks as explicit operations
//! (see [`ScopeProvider::attach_scope`](crate::ScopeProvider::attach_scope)
//! and [`ScopeProvider::detach_scope`](crate::ScopeProvider::detach_scope)).
//! Detachability is a capability recorded at creation, not a separate
//! scope type.
//!
//! At attach time the scope records the destination's current ambient
//! scope/context as its restoration point. Detach validates that popping
//! the scope uncovers exactly that state — anything else means attach and
//! detach were used out of LIFO order somewhere, which is a fatal
//! consistency error. Disposal of a still-attached detachable scope runs
//! this module's cleanup instead: stray entries left above the
//! restoration point are popped (with a warning) so the destination's
//! stacks are not left corrupted.

use crate::ambient;
use crate::scope::{RestorePoint, ScopeInner};
use std::sync::Arc;

/// Clean up the ambient stacks after an attached detachable scope disposed
///
/// The disposing scope has already popped itself and its own context. In
/// the orderly case the restoration point is now exactly the ambient top
/// and nothing happens here. Entries left above it are strays — attach or
/// dispose happened out of order — and are popped so the stacks balance,
/// loudly in the log.
pub(crate) fn restore_ambient(inner: &Arc<ScopeInner>, restore: Option<RestorePoint>) {
    let Some(restore) = restore else {
        return;
    };

    loop {
        let top = ambient::peek_scope();
        match (&top, &restore.scope) {
            (None, None) => break,
            (Some(found), Some(expected)) if Arc::ptr_eq(found, expected) => break,
            (None, Some(_)) => {
                tracing::warn!(
                    scope = %inner.id,
                    "restoration-point scope is gone; the destination stack was popped out of order"
                );
                break;
            }
            (Some(found), _) => {
                tracing::warn!(
                    scope = %inner.id,
                    stray = %found.id,
                    "popping stray ambient scope left above the restoration point"
                );
                let _ = ambient::pop_scope();
            }
        }
    }

    loop {
        let top = ambient::peek_context();
        match (&top, &restore.context) {
            (None, None) => break,
            (Some(found), Some(expected)) if Arc::ptr_eq(found, expected) => break,
            (None, Some(_)) => {
                tracing::warn!(
                    scope = %inner.id,
                    "restoration-point context is gone; the destination stack was popped out of order"
                );
                break;
            }
            (Some(_), _) => {
                tracing::warn!(
                    scope = %inner.id,
                    "popping stray ambient context left above the restoration point"
                );
                let _ = ambient::pop_context();
            }
        }
    }
}
