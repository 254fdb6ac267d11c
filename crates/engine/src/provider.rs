//! Scope provider: factory and orchestrator for scope chains
//!
//! The provider decides whether a scope request opens a new chain (root)
//! or joins the current one (child), mediates attach/detach of detachable
//! scopes, and exposes the raw ambient-stack pops used by cross-cutting
//! cleanup paths.
//!
//! Construction is explicit dependency injection: the provider is handed
//! its transactional resource and locking mechanism and reaches for no
//! global state beyond the calling context's ambient stacks.

use crate::ambient;
use crate::context::ScopeContext;
use crate::scope::{RestorePoint, Scope, ScopeInner};
use ambit_core::{
    LockingMechanism, RepositoryCacheMode, Result, ScopeError, ScopeInstanceId, ScopeOptions,
    TransactionalResource,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Factory and orchestrator for unit-of-work scopes
///
/// One provider per persistence stack. Scopes created by different
/// providers never join each other's chains; a child request under a
/// foreign ambient scope is a `ProviderMismatch` usage error.
pub struct ScopeProvider {
    provider_id: Uuid,
    resource: Arc<dyn TransactionalResource>,
    locks: Arc<dyn LockingMechanism>,
    // Observational counter; Relaxed is enough, it synchronizes nothing.
    scopes_created: AtomicU64,
}

impl ScopeProvider {
    /// Create a provider over a transactional resource and a locking
    /// mechanism
    pub fn new(
        resource: Arc<dyn TransactionalResource>,
        locks: Arc<dyn LockingMechanism>,
    ) -> Self {
        ScopeProvider {
            provider_id: Uuid::new_v4(),
            resource,
            locks,
            scopes_created: AtomicU64::new(0),
        }
    }

    /// Number of scopes this provider has created (diagnostic)
    pub fn scopes_created(&self) -> u64 {
        self.scopes_created.load(Ordering::Relaxed)
    }

    /// Create a scope in the calling context
    ///
    /// With no ambient scope, opens a new chain: a root scope and its
    /// context (reusing an already-ambient context when one exists) are
    /// pushed, context first. Under an ambient scope, creates a child that
    /// defers to the chain's root; only the scope is pushed — the context
    /// is inherited, not re-pushed.
    ///
    /// The returned handle must be disposed in LIFO order with any nested
    /// scopes, on every exit path.
    ///
    /// # Errors
    /// `ProviderMismatch` when the ambient scope belongs to another
    /// provider; `ConflictingScopeSettings` when a child requests a
    /// scoped-file-systems flag that conflicts with its chain.
    pub fn create_scope(&self, options: ScopeOptions) -> Result<Scope> {
        let inner = match ambient::peek_scope() {
            Some(parent) => {
                if parent.provider_id != self.provider_id {
                    return Err(ScopeError::ProviderMismatch);
                }
                let cache_mode = options.repository_cache_mode.resolve(parent.cache_mode);
                let scope_file_systems = match options.scope_file_systems {
                    None => parent.scope_file_systems,
                    Some(requested) if requested == parent.scope_file_systems => requested,
                    Some(requested) => {
                        return Err(ScopeError::ConflictingScopeSettings {
                            setting: "scoped file systems",
                            requested,
                            actual: parent.scope_file_systems,
                        })
                    }
                };
                let context = Arc::clone(&parent.context);
                let inner = ScopeInner::new(
                    self.provider_id,
                    Some(Arc::clone(&parent)),
                    context,
                    false,
                    false,
                    cache_mode,
                    scope_file_systems,
                    Arc::clone(&self.resource),
                    Arc::clone(&self.locks),
                );
                ambient::push_scope(Arc::clone(&inner));
                tracing::debug!(scope = %inner.id, parent = %parent.id, "child scope created");
                inner
            }
            None => {
                let (context, owns_context) = match ambient::peek_context() {
                    Some(context) => (context, false),
                    None => (Arc::new(ScopeContext::new()), true),
                };
                let inner = ScopeInner::new(
                    self.provider_id,
                    None,
                    Arc::clone(&context),
                    owns_context,
                    false,
                    options
                        .repository_cache_mode
                        .resolve(RepositoryCacheMode::Default),
                    options.scope_file_systems.unwrap_or(false),
                    Arc::clone(&self.resource),
                    Arc::clone(&self.locks),
                );
                if owns_context {
                    ambient::push_context(context);
                }
                ambient::push_scope(Arc::clone(&inner));
                tracing::debug!(scope = %inner.id, "root scope created");
                inner
            }
        };
        self.scopes_created.fetch_add(1, Ordering::Relaxed);
        Ok(Scope::from_inner(inner))
    }

    /// Create a detachable scope
    ///
    /// The scope is a root with its own fresh context and is *not* made
    /// ambient here; it becomes part of a call context only through
    /// [`attach_scope`](ScopeProvider::attach_scope).
    pub fn create_detached_scope(&self, options: ScopeOptions) -> Result<Scope> {
        self.create_detached_scope_with(options, None)
    }

    /// Detachable-scope construction with the context argument contract
    ///
    /// A detachable scope always owns a fresh context; supplying one is an
    /// argument error.
    pub(crate) fn create_detached_scope_with(
        &self,
        options: ScopeOptions,
        context: Option<Arc<ScopeContext>>,
    ) -> Result<Scope> {
        if context.is_some() {
            return Err(ScopeError::DetachedScopeWithContext);
        }
        let inner = ScopeInner::new(
            self.provider_id,
            None,
            Arc::new(ScopeContext::new()),
            true,
            true,
            options
                .repository_cache_mode
                .resolve(RepositoryCacheMode::Default),
            options.scope_file_systems.unwrap_or(false),
            Arc::clone(&self.resource),
            Arc::clone(&self.locks),
        );
        self.scopes_created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(scope = %inner.id, "detached scope created");
        Ok(Scope::from_inner(inner))
    }

    /// Attach a detachable scope to the calling context
    ///
    /// Records the context's current ambient scope/context as the
    /// restoration point, then pushes the scope's context and the scope.
    /// The scope is now the calling context's ambient top.
    ///
    /// # Errors
    /// `NotDetachable` for a scope without the capability;
    /// `AlreadyAttached` when it is attached somewhere already;
    /// `AlreadyDisposed` after disposal; `ProviderMismatch` for a scope
    /// from another provider.
    pub fn attach_scope(&self, scope: &Scope) -> Result<()> {
        let inner = scope.inner();
        if inner.provider_id != self.provider_id {
            return Err(ScopeError::ProviderMismatch);
        }
        if !inner.detachable {
            return Err(ScopeError::NotDetachable(inner.id));
        }
        {
            let mut state = inner.state.lock();
            if state.disposed {
                return Err(ScopeError::AlreadyDisposed(inner.id));
            }
            if state.attached {
                return Err(ScopeError::AlreadyAttached(inner.id));
            }
            state.attached = true;
            state.restore = Some(RestorePoint {
                scope: ambient::peek_scope(),
                context: ambient::peek_context(),
            });
        }
        ambient::push_context(scope.context());
        ambient::push_scope(Arc::clone(inner));
        tracing::debug!(scope = %inner.id, "scope attached");
        Ok(())
    }

    /// Detach the calling context's ambient scope
    ///
    /// Pops the scope and its context, then validates that the uncovered
    /// ambient state is exactly the scope's recorded restoration point. A
    /// mismatch means some other code attached or detached out of order;
    /// it is fatal, never silently tolerated. On success the scope is
    /// free-floating again and can be attached on another context.
    ///
    /// # Errors
    /// `NoAmbientScope` with nothing ambient; `NotDetachable` when the top
    /// is an ordinary scope; `DetachMismatch` on a restoration-point
    /// mismatch.
    pub fn detach_scope(&self) -> Result<ScopeInstanceId> {
        let top = ambient::peek_scope().ok_or(ScopeError::NoAmbientScope)?;
        if !top.detachable {
            return Err(ScopeError::NotDetachable(top.id));
        }
        {
            let state = top.state.lock();
            if !state.attached {
                return Err(ScopeError::NotAttached(top.id));
            }
        }

        ambient::pop_scope()?;
        ambient::pop_context()?;

        let mut state = top.state.lock();
        let restore = state.restore.take();
        let scope_matches = match (&ambient::peek_scope(), restore.as_ref().and_then(|r| r.scope.as_ref())) {
            (None, None) => true,
            (Some(found), Some(expected)) => Arc::ptr_eq(found, expected),
            _ => false,
        };
        let context_matches = match (
            &ambient::peek_context(),
            restore.as_ref().and_then(|r| r.context.as_ref()),
        ) {
            (None, None) => true,
            (Some(found), Some(expected)) => Arc::ptr_eq(found, expected),
            _ => false,
        };
        if !(scope_matches && context_matches) {
            return Err(ScopeError::DetachMismatch { scope: top.id });
        }
        state.attached = false;
        tracing::debug!(scope = %top.id, "scope detached");
        Ok(top.id)
    }

    /// Id of the calling context's ambient scope, if any
    pub fn ambient_scope_id(&self) -> Option<ScopeInstanceId> {
        ambient::peek_scope().map(|scope| scope.id)
    }

    /// The calling context's ambient scope context, if any
    pub fn ambient_context(&self) -> Option<Arc<ScopeContext>> {
        ambient::peek_context()
    }

    /// Depth of the calling context's scope stack (diagnostic)
    pub fn ambient_depth(&self) -> usize {
        ambient::scope_depth()
    }

    /// Pop the ambient scope without disposing it
    ///
    /// A raw cleanup tool for cross-cutting paths that must rebalance the
    /// stack; normal disposal never needs it.
    ///
    /// # Errors
    /// `NoAmbientScope` if the stack is empty.
    pub fn pop_ambient_scope(&self) -> Result<ScopeInstanceId> {
        ambient::pop_scope().map(|scope| scope.id)
    }

    /// Pop the ambient scope context without firing it
    ///
    /// # Errors
    /// `NoAmbientContext` if the stack is empty.
    pub fn pop_ambient_scope_context(&self) -> Result<()> {
        ambient::pop_context().map(|_| ())
    }
}
