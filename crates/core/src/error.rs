//! Error types for the ambit scope engine
//!
//! This module defines all error kinds used throughout the engine.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! The taxonomy follows three families with very different handling:
//!
//! - **Usage/consistency errors** (`NotAmbient`, `NoAmbientScope`,
//!   `AlreadyAttached`, ...) indicate a bug in the calling code. They are
//!   returned immediately, never retried, and never recovered internally.
//! - **Lock timeouts** (`ReadLockTimeout`, `WriteLockTimeout`) are the only
//!   caller-retryable condition. The engine itself never retries; the caller
//!   decides whether to re-run the whole unit of work.
//! - **Resource errors** (`Resource`) wrap failures from the underlying
//!   connection/transaction and propagate unchanged after best-effort
//!   cleanup.

use crate::types::{LockId, ScopeInstanceId};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for scope engine operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Error types for the ambit scope engine
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A scope was disposed while it was not the current ambient scope.
    ///
    /// This is the single most important defensive invariant in the engine:
    /// silently tolerating it would commit or roll back against the wrong
    /// transaction. The usual causes are a leaked child scope or a scope
    /// moved to another thread without going through detach/attach.
    #[error(
        "scope {scope} is not the current ambient scope (ambient: {ambient:?}); \
         a child scope was likely leaked, or the scope was used from another \
         thread without detach/attach"
    )]
    NotAmbient {
        /// Scope that attempted the operation
        scope: ScopeInstanceId,
        /// Scope currently on top of the ambient stack, if any
        ambient: Option<ScopeInstanceId>,
    },

    /// Popping the ambient scope stack while it is empty
    #[error("no ambient scope")]
    NoAmbientScope,

    /// Popping the ambient context stack while it is empty
    #[error("no ambient scope context")]
    NoAmbientContext,

    /// Operation on a scope that has already been disposed
    #[error("scope {0} has already been disposed")]
    AlreadyDisposed(ScopeInstanceId),

    /// Attach/detach was requested on a scope that is not detachable
    #[error("scope {0} is not detachable")]
    NotDetachable(ScopeInstanceId),

    /// Attaching a detachable scope that is already attached
    #[error("scope {0} is already attached")]
    AlreadyAttached(ScopeInstanceId),

    /// Detaching a detachable scope that is not currently attached
    #[error("scope {0} is not attached")]
    NotAttached(ScopeInstanceId),

    /// The ambient state uncovered by a detach did not match the
    /// detachable scope's recorded restoration point.
    ///
    /// Some other code attached or detached out of order. This corrupts the
    /// destination call context's stack and is never tolerated.
    #[error(
        "detaching scope {scope} uncovered ambient state that does not match \
         its restoration point; attach/detach were used out of LIFO order"
    )]
    DetachMismatch {
        /// The detachable scope being detached
        scope: ScopeInstanceId,
    },

    /// A detachable scope was constructed with an externally supplied
    /// scope context. Detachable scopes always own a fresh context.
    #[error("a detached scope cannot be given an ambient scope context")]
    DetachedScopeWithContext,

    /// A child scope requested settings that conflict with its chain
    #[error("nested scope requested {setting} = {requested}, but the scope chain uses {actual}")]
    ConflictingScopeSettings {
        /// Name of the conflicting setting
        setting: &'static str,
        /// Value requested by the nested scope
        requested: bool,
        /// Value already in force for the chain
        actual: bool,
    },

    /// A child scope was requested while the ambient scope belongs to a
    /// different provider
    #[error("the ambient scope belongs to a different scope provider")]
    ProviderMismatch,

    /// Typed transaction access found a transaction of a different kind
    #[error("the ambient transaction is not a {expected}")]
    TransactionTypeMismatch {
        /// Type name the caller asked for
        expected: &'static str,
    },

    /// A read lock could not be acquired within its timeout
    #[error("timed out acquiring read lock {lock_id} after {timeout:?}")]
    ReadLockTimeout {
        /// Lock identifier
        lock_id: LockId,
        /// Configured timeout that elapsed
        timeout: Duration,
    },

    /// A write lock could not be acquired within its timeout
    ///
    /// Deadlocks across lock ids acquired in opposing order are detected by
    /// the locking mechanism and surface as this kind on the losing side.
    #[error("timed out acquiring write lock {lock_id} after {timeout:?}")]
    WriteLockTimeout {
        /// Lock identifier
        lock_id: LockId,
        /// Configured timeout that elapsed
        timeout: Duration,
    },

    /// One or more scope-exit callbacks panicked.
    ///
    /// Every registered callback still ran; this reports how many failed.
    #[error("{failed} scope-exit callback(s) panicked")]
    ExitCallbacksFailed {
        /// Number of callbacks that panicked
        failed: usize,
    },

    /// Failure in the underlying transactional resource
    #[error("resource error: {message}")]
    Resource {
        /// Human-readable description
        message: String,
        /// Underlying cause, when available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ScopeError {
    /// Build a resource error from a message
    pub fn resource(message: impl Into<String>) -> Self {
        ScopeError::Resource {
            message: message.into(),
            source: None,
        }
    }

    /// Build a resource error wrapping an underlying cause
    pub fn resource_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ScopeError::Resource {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error is a lock timeout (the only caller-retryable kind)
    pub fn is_lock_timeout(&self) -> bool {
        matches!(
            self,
            ScopeError::ReadLockTimeout { .. } | ScopeError::WriteLockTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_ambient() {
        let scope = ScopeInstanceId::new();
        let ambient = ScopeInstanceId::new();
        let err = ScopeError::NotAmbient {
            scope,
            ambient: Some(ambient),
        };
        let msg = err.to_string();
        assert!(msg.contains("not the current ambient scope"));
        assert!(msg.contains(&scope.to_string()));
    }

    #[test]
    fn test_error_display_empty_stacks() {
        assert_eq!(ScopeError::NoAmbientScope.to_string(), "no ambient scope");
        assert_eq!(
            ScopeError::NoAmbientContext.to_string(),
            "no ambient scope context"
        );
    }

    #[test]
    fn test_error_display_lock_timeouts() {
        let err = ScopeError::ReadLockTimeout {
            lock_id: LockId(42),
            timeout: Duration::from_millis(100),
        };
        let msg = err.to_string();
        assert!(msg.contains("read lock"));
        assert!(msg.contains("42"));

        let err = ScopeError::WriteLockTimeout {
            lock_id: LockId(7),
            timeout: Duration::from_secs(1),
        };
        assert!(err.to_string().contains("write lock"));
    }

    #[test]
    fn test_is_lock_timeout() {
        let read = ScopeError::ReadLockTimeout {
            lock_id: LockId(1),
            timeout: Duration::from_millis(1),
        };
        let write = ScopeError::WriteLockTimeout {
            lock_id: LockId(1),
            timeout: Duration::from_millis(1),
        };
        assert!(read.is_lock_timeout());
        assert!(write.is_lock_timeout());
        assert!(!ScopeError::NoAmbientScope.is_lock_timeout());
        assert!(!ScopeError::resource("boom").is_lock_timeout());
    }

    #[test]
    fn test_resource_error_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ScopeError::resource_with_source("failed to open connection", io);
        assert!(err.to_string().contains("failed to open connection"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_display_conflicting_settings() {
        let err = ScopeError::ConflictingScopeSettings {
            setting: "scoped file systems",
            requested: true,
            actual: false,
        };
        let msg = err.to_string();
        assert!(msg.contains("scoped file systems"));
        assert!(msg.contains("true"));
    }
}
