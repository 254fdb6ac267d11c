//! Scope: the unit-of-work object
//!
//! A scope either owns the underlying transaction (root scope, no parent)
//! or defers to its root (nested child). All scopes in one chain share one
//! transaction, begun lazily on first use, and exactly one commit-or-
//! rollback happens — at root disposal, decided by the root's completion
//! intent.
//!
//! ## State machine
//!
//! `Created` → `Active` (implicit) → `CompletionPending` (after
//! `complete()`) → `Disposed`. A scope disposed straight from `Active`
//! rolls back: the intent is tri-state (`None` = undecided, `Some(true)` =
//! commit, `Some(false)` = rollback) and defaults closed. Intent is
//! monotonic — the first `Some(false)` is sticky, so a nested scope that
//! disposed without completing can never be overridden back to commit.
//!
//! ## Disposal
//!
//! Disposal asserts the scope is the current ambient top. This is the most
//! important defensive invariant in the engine: tolerating a non-ambient
//! dispose would commit or roll back the wrong transaction. Scopes are
//! disposed explicitly (`dispose()`); the drop guard runs the same
//! teardown for scopes that go out of scope without it, and escalates a
//! teardown error to a panic so misuse is never silent.

use crate::ambient;
use crate::context::ScopeContext;
use crate::detached;
use ambit_core::{
    ActiveTransaction, LockId, LockKind, LockingMechanism, RepositoryCacheMode, Result,
    ScopeError, ScopeInstanceId, TransactionalResource,
};
use ambit_locking::LockLedger;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Ambient state to restore when a detachable scope leaves a call context
pub(crate) struct RestorePoint {
    pub(crate) scope: Option<Arc<ScopeInner>>,
    pub(crate) context: Option<Arc<ScopeContext>>,
}

pub(crate) struct ScopeState {
    pub(crate) completed: Option<bool>,
    pub(crate) disposed: bool,
    pub(crate) transaction: Option<Box<dyn ActiveTransaction>>,
    pub(crate) ledger: LockLedger,
    pub(crate) attached: bool,
    pub(crate) restore: Option<RestorePoint>,
}

pub(crate) struct ScopeInner {
    pub(crate) id: ScopeInstanceId,
    pub(crate) provider_id: Uuid,
    pub(crate) parent: Option<Arc<ScopeInner>>,
    pub(crate) context: Arc<ScopeContext>,
    pub(crate) owns_context: bool,
    pub(crate) detachable: bool,
    pub(crate) cache_mode: RepositoryCacheMode,
    pub(crate) scope_file_systems: bool,
    pub(crate) resource: Arc<dyn TransactionalResource>,
    pub(crate) locks: Arc<dyn LockingMechanism>,
    pub(crate) state: Mutex<ScopeState>,
}

impl ScopeInner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        provider_id: Uuid,
        parent: Option<Arc<ScopeInner>>,
        context: Arc<ScopeContext>,
        owns_context: bool,
        detachable: bool,
        cache_mode: RepositoryCacheMode,
        scope_file_systems: bool,
        resource: Arc<dyn TransactionalResource>,
        locks: Arc<dyn LockingMechanism>,
    ) -> Arc<Self> {
        let id = ScopeInstanceId::new();
        Arc::new(ScopeInner {
            id,
            provider_id,
            parent,
            context,
            owns_context,
            detachable,
            cache_mode,
            scope_file_systems,
            resource,
            locks,
            state: Mutex::new(ScopeState {
                completed: None,
                disposed: false,
                transaction: None,
                ledger: LockLedger::new(id),
                attached: false,
                restore: None,
            }),
        })
    }

    /// Walk to the root of the chain
    pub(crate) fn root(self: &Arc<Self>) -> Arc<ScopeInner> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent.clone() {
            current = parent;
        }
        current
    }

    /// Force the chain's intent to rollback
    ///
    /// Called when a child disposed without completing. Sticky: once
    /// `Some(false)`, `complete()` will not flip it back.
    pub(crate) fn force_rollback(&self) {
        let mut state = self.state.lock();
        if !state.disposed {
            state.completed = Some(false);
        }
    }
}

/// Handle to a unit-of-work scope
///
/// Obtained from [`ScopeProvider::create_scope`](crate::ScopeProvider::create_scope)
/// (pushed ambient immediately) or
/// [`ScopeProvider::create_detached_scope`](crate::ScopeProvider::create_detached_scope)
/// (made ambient explicitly via attach). Work flows through the handle;
/// the unit of work ends when the handle is disposed, in LIFO order with
/// any nested scopes.
pub struct Scope {
    inner: Arc<ScopeInner>,
    defused: bool,
}

impl Scope {
    pub(crate) fn from_inner(inner: Arc<ScopeInner>) -> Self {
        Scope {
            inner,
            defused: false,
        }
    }

    pub(crate) fn inner(&self) -> &Arc<ScopeInner> {
        &self.inner
    }

    /// Unique identity of this scope instance
    pub fn instance_id(&self) -> ScopeInstanceId {
        self.inner.id
    }

    /// Whether this scope owns the underlying transaction
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Whether this scope can be moved between call contexts
    pub fn is_detachable(&self) -> bool {
        self.inner.detachable
    }

    /// Whether this detachable scope is currently attached
    pub fn is_attached(&self) -> bool {
        self.inner.state.lock().attached
    }

    /// Effective repository cache mode for this chain
    pub fn repository_cache_mode(&self) -> RepositoryCacheMode {
        self.inner.cache_mode
    }

    /// Effective scoped-file-systems flag for this chain
    pub fn scope_file_systems(&self) -> bool {
        self.inner.scope_file_systems
    }

    /// The chain's exit-notification context
    pub fn context(&self) -> Arc<ScopeContext> {
        Arc::clone(&self.inner.context)
    }

    /// Current completion intent (diagnostic)
    pub fn completed(&self) -> Option<bool> {
        self.inner.state.lock().completed
    }

    /// Record commit intent
    ///
    /// Idempotent; the first decision wins, so a chain already forced to
    /// rollback by a non-completed child stays rolled back. No database
    /// side effect happens here — the transaction is touched only at root
    /// disposal.
    ///
    /// # Errors
    /// `AlreadyDisposed` if called after disposal.
    pub fn complete(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return Err(ScopeError::AlreadyDisposed(self.inner.id));
        }
        if state.completed.is_none() {
            state.completed = Some(true);
        }
        Ok(())
    }

    /// Run work against the chain's transaction
    ///
    /// The transaction lives on the root and is begun lazily, on the first
    /// invocation anywhere in the chain — scopes that never touch the
    /// resource never open a connection. The closure must not re-enter the
    /// scope.
    ///
    /// # Errors
    /// `AlreadyDisposed` after disposal; `Resource` if the transaction
    /// cannot be begun.
    pub fn with_transaction<T>(
        &self,
        work: impl FnOnce(&mut dyn ActiveTransaction) -> Result<T>,
    ) -> Result<T> {
        {
            let state = self.inner.state.lock();
            if state.disposed {
                return Err(ScopeError::AlreadyDisposed(self.inner.id));
            }
        }
        let root = self.inner.root();
        let mut state = root.state.lock();
        if state.disposed {
            return Err(ScopeError::AlreadyDisposed(root.id));
        }
        if let Some(transaction) = state.transaction.as_mut() {
            return work(transaction.as_mut());
        }
        let mut transaction = root.resource.begin_transaction()?;
        tracing::debug!(scope = %self.inner.id, root = %root.id, "transaction begun");
        let result = work(transaction.as_mut());
        // The transaction is kept even when `work` fails: it has begun and
        // must be rolled back at root disposal.
        state.transaction = Some(transaction);
        result
    }

    /// Run work against the chain's transaction, downcast to its concrete type
    ///
    /// # Errors
    /// `TransactionTypeMismatch` if the chain's resource produced a
    /// transaction of a different type; otherwise as
    /// [`with_transaction`](Scope::with_transaction).
    pub fn with_typed_transaction<Tx: ActiveTransaction + 'static, T>(
        &self,
        work: impl FnOnce(&mut Tx) -> Result<T>,
    ) -> Result<T> {
        self.with_transaction(|transaction| {
            let typed = transaction
                .as_any_mut()
                .downcast_mut::<Tx>()
                .ok_or(ScopeError::TransactionTypeMismatch {
                    expected: std::any::type_name::<Tx>(),
                })?;
            work(typed)
        })
    }

    /// Acquire a shared lock for this chain
    ///
    /// Ownership lands in the root's ledger regardless of which scope in
    /// the chain asks; release happens exactly once, at root disposal.
    ///
    /// # Errors
    /// `ReadLockTimeout` when the lock is not granted in time;
    /// `AlreadyDisposed` after disposal.
    pub fn read_lock(&self, id: LockId, timeout: Duration) -> Result<()> {
        self.acquire_lock(LockKind::Read, id, timeout)
    }

    /// Acquire an exclusive lock for this chain
    ///
    /// # Errors
    /// `WriteLockTimeout` when the lock is not granted in time (including
    /// deadlock-induced timeouts); `AlreadyDisposed` after disposal.
    pub fn write_lock(&self, id: LockId, timeout: Duration) -> Result<()> {
        self.acquire_lock(LockKind::Write, id, timeout)
    }

    fn acquire_lock(&self, kind: LockKind, id: LockId, timeout: Duration) -> Result<()> {
        {
            let state = self.inner.state.lock();
            if state.disposed {
                return Err(ScopeError::AlreadyDisposed(self.inner.id));
            }
        }
        let root = self.inner.root();
        let mut state = root.state.lock();
        state
            .ledger
            .acquire(self.inner.locks.as_ref(), id, kind, timeout)
    }

    /// Dispose this scope
    ///
    /// Must be called while the scope is the current ambient top — LIFO
    /// with respect to creation. For a root, releases held locks, commits
    /// (only if the whole chain completed) or rolls back, then fires the
    /// chain's exit callbacks. Returns the chain's final outcome.
    ///
    /// On failure the handle stays usable so the caller can repair the
    /// nesting (dispose the leaked child) and dispose again.
    ///
    /// # Errors
    /// `NotAmbient` when this scope is not the current top;
    /// `AlreadyDisposed` on a second call; resource and callback errors
    /// propagate after cleanup.
    pub fn dispose(&mut self) -> Result<bool> {
        let result = dispose_scope(&self.inner);
        if result.is_ok() {
            self.defused = true;
        }
        result
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.defused || self.inner.state.lock().disposed {
            return;
        }
        match dispose_scope(&self.inner) {
            Ok(_) => {}
            Err(err) if std::thread::panicking() => {
                tracing::error!(scope = %self.inner.id, error = %err, "scope teardown failed during unwind");
            }
            Err(err) => panic!("scope {} dropped without valid disposal: {err}", self.inner.id),
        }
    }
}

/// The disposal protocol
///
/// 1. assert the scope is the current ambient top;
/// 2. root only: release locks, then commit or roll back the transaction;
/// 3. pop the scope stack and propagate a non-completed child's intent
///    into its parent;
/// 4. the scope that pushed the context fires its exit callbacks with the
///    final outcome and pops the context stack;
/// 5. a detachable scope restores the destination's ambient state.
///
/// Resource or callback failures still leave the scope disposed and the
/// stacks popped; the first error propagates after cleanup.
pub(crate) fn dispose_scope(inner: &Arc<ScopeInner>) -> Result<bool> {
    let ambient = ambient::peek_scope();
    let is_top = ambient
        .as_ref()
        .map_or(false, |top| Arc::ptr_eq(top, inner));
    if !is_top {
        return Err(ScopeError::NotAmbient {
            scope: inner.id,
            ambient: ambient.map(|scope| scope.id),
        });
    }

    let (completed, transaction, restore, was_attached) = {
        let mut state = inner.state.lock();
        if state.disposed {
            return Err(ScopeError::AlreadyDisposed(inner.id));
        }
        state.disposed = true;
        let was_attached = state.attached;
        state.attached = false;
        let completed = state.completed == Some(true);
        // Locks release before the transaction ends, exactly once per
        // chain, whatever happens next.
        state.ledger.release_all();
        (
            completed,
            state.transaction.take(),
            state.restore.take(),
            was_attached,
        )
    };

    // Only a root ever holds a transaction; descendants delegate to it.
    let mut outcome = completed;
    let mut resource_err = None;
    if let Some(transaction) = transaction {
        let result = if completed {
            transaction.commit()
        } else {
            transaction.rollback()
        };
        if let Err(err) = result {
            tracing::warn!(scope = %inner.id, error = %err, "transaction teardown failed");
            outcome = false;
            resource_err = Some(err);
        }
    }

    ambient::pop_scope()?;

    // A chain member that did not complete forces the rest of the chain
    // to roll back.
    if let Some(parent) = &inner.parent {
        if !completed {
            parent.force_rollback();
        }
    }

    let mut callback_err = None;
    if inner.owns_context {
        if let Err(err) = inner.context.scope_exit(outcome) {
            callback_err = Some(err);
        }
        ambient::pop_context()?;
    }

    if inner.detachable && was_attached {
        detached::restore_ambient(inner, restore);
    }

    tracing::debug!(
        scope = %inner.id,
        root = inner.parent.is_none(),
        outcome,
        "scope disposed"
    );

    match (resource_err, callback_err) {
        (Some(err), _) | (None, Some(err)) => Err(err),
        (None, None) => Ok(outcome),
    }
}

#[cfg(test)]
mod tests {
    use crate::provider::ScopeProvider;
    use crate::resource::{FailingCommitResource, InMemoryResource, InMemoryTransaction, LayeredTransaction};
    use ambit_core::{ActiveTransaction, LockId, LockingMechanism, ScopeError, ScopeOptions};
    use ambit_locking::InMemoryLocks;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn setup() -> (ScopeProvider, InMemoryResource, Arc<InMemoryLocks>) {
        let resource = InMemoryResource::new();
        let locks = Arc::new(InMemoryLocks::new());
        let provider = ScopeProvider::new(Arc::new(resource.clone()), locks.clone());
        (provider, resource, locks)
    }

    fn put(scope: &super::Scope, key: &str, value: &str) {
        scope
            .with_typed_transaction::<InMemoryTransaction, _>(|txn| {
                txn.put(key, value);
                Ok(())
            })
            .unwrap();
    }

    // ========================================================================
    // Commit / rollback decision
    // ========================================================================

    #[test]
    fn test_completed_root_commits() {
        let (provider, resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        put(&scope, "key", "value");
        scope.complete().unwrap();
        assert!(scope.dispose().unwrap());

        assert_eq!(resource.get("key").as_deref(), Some("value"));
        assert_eq!(resource.committed_count(), 1);
        assert_eq!(resource.rolled_back_count(), 0);
    }

    #[test]
    fn test_dispose_without_complete_rolls_back() {
        let (provider, resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        put(&scope, "key", "value");
        assert!(!scope.dispose().unwrap());

        assert!(resource.is_empty());
        assert_eq!(resource.rolled_back_count(), 1);
        assert_eq!(resource.committed_count(), 0);
    }

    #[test]
    fn test_transaction_is_lazy() {
        let (provider, resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        scope.complete().unwrap();
        scope.dispose().unwrap();

        // The scope never touched the resource: no connection was opened,
        // nothing was committed or rolled back.
        assert_eq!(resource.begun_count(), 0);
        assert_eq!(resource.committed_count(), 0);
        assert_eq!(resource.rolled_back_count(), 0);
    }

    #[test]
    fn test_only_root_disposal_touches_the_transaction() {
        let (provider, resource, _locks) = setup();

        let mut root = provider.create_scope(ScopeOptions::default()).unwrap();
        let mut child = provider.create_scope(ScopeOptions::default()).unwrap();
        assert!(!child.is_root());

        // The child reaches the root's transaction.
        put(&child, "key", "value");
        assert_eq!(resource.begun_count(), 1);

        child.complete().unwrap();
        child.dispose().unwrap();
        assert_eq!(resource.committed_count(), 0);
        assert_eq!(resource.rolled_back_count(), 0);

        root.complete().unwrap();
        root.dispose().unwrap();
        assert_eq!(resource.committed_count(), 1);
        assert_eq!(resource.get("key").as_deref(), Some("value"));
    }

    #[test]
    fn test_non_completed_child_forces_chain_rollback() {
        let (provider, resource, _locks) = setup();

        let mut root = provider.create_scope(ScopeOptions::default()).unwrap();
        let mut child = provider.create_scope(ScopeOptions::default()).unwrap();
        put(&child, "key", "value");

        // Child disposed without complete(): the chain's fate is sealed.
        child.dispose().unwrap();
        root.complete().unwrap();
        assert!(!root.dispose().unwrap());

        assert!(resource.is_empty());
        assert_eq!(resource.rolled_back_count(), 1);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let (provider, resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        put(&scope, "key", "value");
        scope.complete().unwrap();
        scope.complete().unwrap();
        assert!(scope.dispose().unwrap());
        assert_eq!(resource.committed_count(), 1);
    }

    // ========================================================================
    // Usage errors
    // ========================================================================

    #[test]
    fn test_disposing_non_ambient_scope_fails_and_is_recoverable() {
        let (provider, resource, _locks) = setup();

        let mut root = provider.create_scope(ScopeOptions::default()).unwrap();
        let mut child = provider.create_scope(ScopeOptions::default()).unwrap();
        put(&root, "key", "value");

        let err = root.dispose().unwrap_err();
        assert!(matches!(err, ScopeError::NotAmbient { .. }));

        // Repair the nesting and finish the unit of work normally.
        child.complete().unwrap();
        child.dispose().unwrap();
        root.complete().unwrap();
        assert!(root.dispose().unwrap());
        assert_eq!(resource.committed_count(), 1);
    }

    #[test]
    fn test_complete_after_dispose_is_an_error() {
        let (provider, _resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        scope.dispose().unwrap();
        let err = scope.complete().unwrap_err();
        assert!(matches!(err, ScopeError::AlreadyDisposed(_)));
    }

    #[test]
    fn test_with_transaction_after_dispose_is_an_error() {
        let (provider, _resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        scope.dispose().unwrap();
        let err = scope.with_transaction(|_| Ok(())).unwrap_err();
        assert!(matches!(err, ScopeError::AlreadyDisposed(_)));
    }

    #[test]
    fn test_double_dispose_is_an_error() {
        let (provider, _resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        scope.dispose().unwrap();
        let err = scope.dispose().unwrap_err();
        assert!(matches!(err, ScopeError::AlreadyDisposed(_)));
    }

    #[test]
    fn test_typed_transaction_mismatch() {
        let (provider, _resource, _locks) = setup();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        let err = scope
            .with_typed_transaction::<LayeredTransaction, _>(|_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, ScopeError::TransactionTypeMismatch { .. }));
        scope.dispose().unwrap();
    }

    // ========================================================================
    // Exit callbacks
    // ========================================================================

    #[test]
    fn test_context_exit_fires_once_at_root_disposal() {
        let (provider, _resource, _locks) = setup();
        let fired = Arc::new(AtomicUsize::new(0));
        let outcomes = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut root = provider.create_scope(ScopeOptions::default()).unwrap();
        {
            let fired = Arc::clone(&fired);
            let outcomes = Arc::clone(&outcomes);
            root.context().register(move |completed| {
                fired.fetch_add(1, Ordering::SeqCst);
                outcomes.lock().push(completed);
            });
        }

        let mut child = provider.create_scope(ScopeOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&child.context(), &root.context()));
        child.complete().unwrap();
        child.dispose().unwrap();
        // Not fired at an intermediate dispose point.
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        root.complete().unwrap();
        root.dispose().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(*outcomes.lock(), vec![true]);
    }

    #[test]
    fn test_context_exit_reports_rollback() {
        let (provider, _resource, _locks) = setup();
        let outcomes = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        let sink = Arc::clone(&outcomes);
        scope.context().register(move |completed| sink.lock().push(completed));
        scope.dispose().unwrap();

        assert_eq!(*outcomes.lock(), vec![false]);
    }

    #[test]
    fn test_failed_commit_reports_false_to_callbacks() {
        let resource = InMemoryResource::new();
        let locks = Arc::new(InMemoryLocks::new());
        let provider = ScopeProvider::new(
            Arc::new(FailingCommitResource::new(resource.clone())),
            locks,
        );
        let outcomes = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        let sink = Arc::clone(&outcomes);
        scope.context().register(move |completed| sink.lock().push(completed));
        scope
            .with_transaction(|txn| {
                txn.as_any_mut()
                    .downcast_mut::<InMemoryTransaction>()
                    .unwrap()
                    .put("key", "value");
                Ok(())
            })
            .unwrap();
        scope.complete().unwrap();

        let err = scope.dispose().unwrap_err();
        assert!(matches!(err, ScopeError::Resource { .. }));
        // The scope is disposed, the stacks are balanced, and the
        // callbacks observed the outcome, not the intent.
        assert_eq!(provider.ambient_depth(), 0);
        assert_eq!(*outcomes.lock(), vec![false]);
        assert!(resource.is_empty());
    }

    // ========================================================================
    // Locks
    // ========================================================================

    #[test]
    fn test_nested_lock_requests_are_owned_by_the_root() {
        let (provider, _resource, locks) = setup();

        let mut root = provider.create_scope(ScopeOptions::default()).unwrap();
        let mut child = provider.create_scope(ScopeOptions::default()).unwrap();

        child.write_lock(LockId(10), TIMEOUT).unwrap();
        child.write_lock(LockId(10), TIMEOUT).unwrap();
        root.read_lock(LockId(11), TIMEOUT).unwrap();
        assert!(locks.writer_held(LockId(10)));
        assert_eq!(locks.reader_count(LockId(11)), 1);

        // Child disposal does not release chain locks.
        child.complete().unwrap();
        child.dispose().unwrap();
        assert!(locks.writer_held(LockId(10)));

        root.complete().unwrap();
        root.dispose().unwrap();
        assert!(!locks.writer_held(LockId(10)));
        assert_eq!(locks.reader_count(LockId(11)), 0);
    }

    #[test]
    fn test_lock_timeout_leaves_scope_disposable() {
        let (provider, resource, locks) = setup();
        let _held = locks.acquire_write(LockId(20), TIMEOUT).unwrap();

        let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
        put(&scope, "key", "value");
        let err = scope
            .write_lock(LockId(20), Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(err, ScopeError::WriteLockTimeout { .. }));

        // The losing chain still rolls back in an orderly fashion.
        assert!(!scope.dispose().unwrap());
        assert_eq!(resource.rolled_back_count(), 1);
    }

    // ========================================================================
    // Drop guard
    // ========================================================================

    #[test]
    fn test_drop_guard_runs_disposal() {
        let (provider, resource, _locks) = setup();

        {
            let scope = provider.create_scope(ScopeOptions::default()).unwrap();
            put(&scope, "key", "value");
            scope.complete().unwrap();
        }
        assert_eq!(resource.committed_count(), 1);
        assert_eq!(resource.get("key").as_deref(), Some("value"));
    }

    #[test]
    fn test_drop_guard_rolls_back_by_default() {
        let (provider, resource, _locks) = setup();

        {
            let scope = provider.create_scope(ScopeOptions::default()).unwrap();
            put(&scope, "key", "value");
        }
        assert!(resource.is_empty());
        assert_eq!(resource.rolled_back_count(), 1);
    }

    #[test]
    #[should_panic(expected = "dropped without valid disposal")]
    fn test_dropping_a_non_ambient_scope_panics() {
        let (provider, _resource, _locks) = setup();

        let root = provider.create_scope(ScopeOptions::default()).unwrap();
        let _child = provider.create_scope(ScopeOptions::default()).unwrap();
        drop(root);
    }
}
