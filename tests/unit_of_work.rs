//! End-to-end smoke tests through the public facade

use ambit::{
    ActiveTransaction, InMemoryLocks, InMemoryResource, InMemoryTransaction, LayeredResource,
    LayeredTransaction, LockId, ScopeError, ScopeOptions, ScopeProvider,
};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn create_provider() -> (ScopeProvider, InMemoryResource, Arc<InMemoryLocks>) {
    let resource = InMemoryResource::new();
    let locks = Arc::new(InMemoryLocks::new());
    let provider = ScopeProvider::new(Arc::new(resource.clone()), locks.clone());
    (provider, resource, locks)
}

#[test]
fn test_nested_unit_of_work_commits_once() {
    let (provider, resource, locks) = create_provider();

    let mut outer = provider.create_scope(ScopeOptions::default()).unwrap();
    outer.write_lock(LockId(1), TIMEOUT).unwrap();

    {
        let mut inner = provider.create_scope(ScopeOptions::default()).unwrap();
        inner
            .with_typed_transaction::<InMemoryTransaction, _>(|txn| {
                txn.put("document:1", "published");
                Ok(())
            })
            .unwrap();
        // Nested lock request joins the chain's ownership.
        inner.write_lock(LockId(1), TIMEOUT).unwrap();
        inner.complete().unwrap();
        inner.dispose().unwrap();
    }
    assert!(locks.writer_held(LockId(1)));

    outer.complete().unwrap();
    assert!(outer.dispose().unwrap());

    assert_eq!(resource.get("document:1").as_deref(), Some("published"));
    assert_eq!(resource.committed_count(), 1);
    assert!(!locks.writer_held(LockId(1)));
}

#[test]
fn test_abandoned_unit_of_work_rolls_back() {
    let (provider, resource, _locks) = create_provider();

    let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
    scope
        .with_typed_transaction::<InMemoryTransaction, _>(|txn| {
            txn.put("document:1", "draft");
            Ok(())
        })
        .unwrap();
    // No complete(): the engine fails closed.
    assert!(!scope.dispose().unwrap());

    assert!(resource.is_empty());
    assert_eq!(resource.rolled_back_count(), 1);
}

#[test]
fn test_exit_notifications_fire_with_the_outcome() {
    let (provider, _resource, _locks) = create_provider();
    let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
    let sink = Arc::clone(&observed);
    scope.context().register(move |completed| sink.lock().push(completed));
    scope.complete().unwrap();
    scope.dispose().unwrap();

    assert_eq!(*observed.lock(), vec![true]);
}

#[test]
fn test_layered_resource_keeps_two_stacks_consistent() {
    let outer_store = InMemoryResource::new();
    let inner_store = InMemoryResource::new();
    let provider = ScopeProvider::new(
        Arc::new(LayeredResource::new(
            Arc::new(outer_store.clone()),
            Arc::new(inner_store.clone()),
        )),
        Arc::new(InMemoryLocks::new()),
    );

    let mut scope = provider.create_scope(ScopeOptions::default()).unwrap();
    scope
        .with_typed_transaction::<LayeredTransaction, _>(|txn| {
            let outer = txn
                .outer_mut()
                .as_any_mut()
                .downcast_mut::<InMemoryTransaction>()
                .ok_or(ScopeError::TransactionTypeMismatch {
                    expected: "InMemoryTransaction",
                })?;
            outer.put("outer:key", "a");
            let inner = txn
                .inner_mut()
                .as_any_mut()
                .downcast_mut::<InMemoryTransaction>()
                .ok_or(ScopeError::TransactionTypeMismatch {
                    expected: "InMemoryTransaction",
                })?;
            inner.put("inner:key", "b");
            Ok(())
        })
        .unwrap();
    scope.complete().unwrap();
    scope.dispose().unwrap();

    assert_eq!(outer_store.get("outer:key").as_deref(), Some("a"));
    assert_eq!(inner_store.get("inner:key").as_deref(), Some("b"));
    assert_eq!(outer_store.committed_count(), 1);
    assert_eq!(inner_store.committed_count(), 1);
}

#[test]
fn test_detached_scope_round_trip() {
    let (provider, resource, _locks) = create_provider();
    let provider = Arc::new(provider);

    let scope = provider
        .create_detached_scope(ScopeOptions::default())
        .unwrap();
    provider.attach_scope(&scope).unwrap();
    scope
        .with_typed_transaction::<InMemoryTransaction, _>(|txn| {
            txn.put("job:1", "queued");
            Ok(())
        })
        .unwrap();
    provider.detach_scope().unwrap();

    let worker = {
        let provider = Arc::clone(&provider);
        std::thread::spawn(move || {
            let mut scope = scope;
            provider.attach_scope(&scope).unwrap();
            scope
                .with_typed_transaction::<InMemoryTransaction, _>(|txn| {
                    txn.put("job:1", "done");
                    Ok(())
                })
                .unwrap();
            scope.complete().unwrap();
            scope.dispose().unwrap();
        })
    };
    worker.join().unwrap();

    assert_eq!(resource.get("job:1").as_deref(), Some("done"));
    assert_eq!(resource.committed_count(), 1);
}
