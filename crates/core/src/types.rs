//! Identity types and scope settings
//!
//! Newtype identifiers follow the conventions used across the workspace:
//! `new()` generates a fresh id, `Display` renders the inner value, and the
//! types are cheap to copy and hash.

use std::fmt;
use uuid::Uuid;

/// Unique identity of one scope instance
///
/// Generated when the scope is created and stable for its lifetime. Lock
/// ownership is keyed by the *root* scope's instance id so that nested
/// scopes share ownership and release happens exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeInstanceId(Uuid);

impl ScopeInstanceId {
    /// Generate a fresh instance id
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        ScopeInstanceId(Uuid::new_v4())
    }

    /// Access the underlying uuid
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ScopeInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a distributed lock
///
/// Lock ids are small integers agreed on by all participants; the engine
/// attaches no meaning to the value beyond identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(pub i32);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read or write intent of a lock acquisition
///
/// Read locks are shared: any number of concurrent holders. Write locks are
/// exclusive: they block all concurrent reads and writes on the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// Shared lock; concurrent readers interleave freely
    Read,
    /// Exclusive lock; blocks until all readers and any writer release
    Write,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Read => write!(f, "read"),
            LockKind::Write => write!(f, "write"),
        }
    }
}

/// Repository cache behavior requested for a scope chain
///
/// The engine only carries this setting; repositories consuming scopes act
/// on it. `Unspecified` inherits from the parent scope (root default:
/// `Default`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepositoryCacheMode {
    /// Inherit from the parent scope
    #[default]
    Unspecified,
    /// Normal cache behavior
    Default,
    /// Repository caches are bypassed for this chain
    None,
}

impl RepositoryCacheMode {
    /// Resolve this mode against the parent chain's effective mode
    pub fn resolve(self, inherited: RepositoryCacheMode) -> RepositoryCacheMode {
        match self {
            RepositoryCacheMode::Unspecified => inherited,
            other => other,
        }
    }
}

/// Settings for scope creation
///
/// Passed to `ScopeProvider::create_scope`; all fields default to
/// "inherit".
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeOptions {
    /// Repository cache mode for this scope
    pub repository_cache_mode: RepositoryCacheMode,
    /// Whether file-system operations are scoped to this unit of work.
    /// `None` inherits; a nested scope passing a value that conflicts with
    /// the chain is a usage error.
    pub scope_file_systems: Option<bool>,
}

impl ScopeOptions {
    /// Options requesting cache bypass
    pub fn uncached() -> Self {
        ScopeOptions {
            repository_cache_mode: RepositoryCacheMode::None,
            ..Default::default()
        }
    }

    /// Options requesting scoped file systems
    pub fn with_scoped_file_systems() -> Self {
        ScopeOptions {
            scope_file_systems: Some(true),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_ids_are_unique() {
        let a = ScopeInstanceId::new();
        let b = ScopeInstanceId::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_instance_id_display_is_uuid() {
        let id = ScopeInstanceId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }

    #[test]
    fn test_lock_id_ordering() {
        let mut ids = vec![LockId(3), LockId(1), LockId(2)];
        ids.sort();
        assert_eq!(ids, vec![LockId(1), LockId(2), LockId(3)]);
    }

    #[test]
    fn test_cache_mode_resolution() {
        assert_eq!(
            RepositoryCacheMode::Unspecified.resolve(RepositoryCacheMode::None),
            RepositoryCacheMode::None
        );
        assert_eq!(
            RepositoryCacheMode::Default.resolve(RepositoryCacheMode::None),
            RepositoryCacheMode::Default
        );
    }

    #[test]
    fn test_default_options_inherit() {
        let opts = ScopeOptions::default();
        assert_eq!(opts.repository_cache_mode, RepositoryCacheMode::Unspecified);
        assert!(opts.scope_file_systems.is_none());
    }
}
