//! Scope context: the per-chain exit-notification side channel
//!
//! A `ScopeContext` collects callbacks to run exactly once when the
//! outermost scope of a logical unit of work exits, committed or not. It is
//! created once per root chain (nested scopes inherit it) and drained by
//! the scope that pushed it onto the ambient context stack — never at
//! intermediate nested dispose points.
//!
//! Callbacks run in priority order (lower first, default 100), FIFO within
//! a priority. A panicking callback does not prevent the rest from
//! running; failures are logged and surfaced as an aggregate error after
//! every callback has run.

use ambit_core::{Result, ScopeError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Default priority for exit callbacks
pub const DEFAULT_PRIORITY: i32 = 100;

type ExitCallback = Box<dyn FnOnce(bool) + Send>;

struct Registration {
    key: Option<String>,
    priority: i32,
    callback: ExitCallback,
}

/// Exit-notification side channel for one scope chain
///
/// Identity is reference equality (`Arc::ptr_eq`); the context carries no
/// other state than its registered callbacks.
#[derive(Default)]
pub struct ScopeContext {
    registrations: Mutex<Vec<Registration>>,
}

impl ScopeContext {
    /// Create an empty context
    pub fn new() -> Self {
        ScopeContext::default()
    }

    /// Register an exit callback at the default priority
    ///
    /// The callback receives the chain's final completed flag: `true` only
    /// when the root scope committed successfully.
    pub fn register(&self, callback: impl FnOnce(bool) + Send + 'static) {
        self.register_with_priority(DEFAULT_PRIORITY, callback);
    }

    /// Register an exit callback with an explicit priority
    ///
    /// Lower priorities run first; registration order is preserved within
    /// a priority.
    pub fn register_with_priority(&self, priority: i32, callback: impl FnOnce(bool) + Send + 'static) {
        self.registrations.lock().push(Registration {
            key: None,
            priority,
            callback: Box::new(callback),
        });
    }

    /// Register a keyed exit callback; the first registration for a key wins
    ///
    /// Later registrations under the same key are ignored, which lets
    /// consumers enlist "run once per unit of work" work (cache refresh,
    /// event flush) from many call sites without coordination.
    pub fn register_keyed(
        &self,
        key: impl Into<String>,
        priority: i32,
        callback: impl FnOnce(bool) + Send + 'static,
    ) {
        let key = key.into();
        let mut registrations = self.registrations.lock();
        if registrations
            .iter()
            .any(|r| r.key.as_deref() == Some(key.as_str()))
        {
            return;
        }
        registrations.push(Registration {
            key: Some(key),
            priority,
            callback: Box::new(callback),
        });
    }

    /// Number of pending registrations (diagnostic)
    pub fn pending(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Run every registered callback with the chain's final outcome
    ///
    /// Invoked exactly once, by the scope that owns this context, during
    /// its disposal. Callbacks are drained: a second invocation finds
    /// nothing to run.
    ///
    /// # Errors
    /// `ExitCallbacksFailed` if any callback panicked; every callback has
    /// still run by the time this returns.
    pub fn scope_exit(&self, completed: bool) -> Result<()> {
        let mut registrations = std::mem::take(&mut *self.registrations.lock());
        // Stable sort keeps FIFO order within a priority.
        registrations.sort_by_key(|r| r.priority);

        let mut failed = 0usize;
        for registration in registrations {
            let callback = registration.callback;
            if let Err(panic) = catch_unwind(AssertUnwindSafe(move || callback(completed))) {
                failed += 1;
                let message = panic_message(&panic);
                tracing::error!(key = ?registration.key, %message, "scope-exit callback panicked");
            }
        }

        if failed > 0 {
            Err(ScopeError::ExitCallbacksFailed { failed })
        } else {
            Ok(())
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
