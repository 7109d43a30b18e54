use std::sync::Arc;
use vbatch_client::error::ClientError;
use vbatch_client::lock::Lock;
use vbatch_core::errors::DomainError;
use vbatch_test_utils::doubles::{no_sleep, MemoryStore};

fn memory_lock(path: &str) -> (Arc<MemoryStore>, Lock) {
    let store = Arc::new(MemoryStore::with_bucket("cbmc"));
    let lock = Lock::new(store.clone(), path).unwrap().with_sleeper(no_sleep);
    (store, lock)
}

#[test]
fn test_wait_for_lock_never_set_uses_full_budget() {
    let (store, lock) = memory_lock("cbmc/run/ws");

    let err = lock.wait_for_set("build.txt", 5, Some("30s")).unwrap_err();

    match err {
        ClientError::LockTimeout { lock, path, attempts } => {
            assert_eq!(lock, "build.txt");
            assert_eq!(path, "cbmc/run/ws/build.txt");
            assert_eq!(attempts, 7);
        }
        other => panic!("expected LockTimeout, got {:?}", other),
    }
    assert_eq!(store.exists_calls(), 7);
}

#[test]
fn test_wait_returns_on_first_satisfied_check() {
    let (store, lock) = memory_lock("cbmc/run/ws");
    lock.set("property.txt").unwrap();

    lock.wait_for_set("property.txt", 5, Some("1h")).unwrap();
    lock.wait_for_unset("report.txt", 5, None).unwrap();
    assert_eq!(store.exists_calls(), 2);
}

#[test]
fn test_set_then_is_set_and_unset_then_is_unset() {
    let (store, lock) = memory_lock("s3://cbmc/run/ws");
    for name in lock.lock_set() {
        assert!(lock.is_unset(name).unwrap());
        lock.set(name).unwrap();
        assert!(lock.is_set(name).unwrap());
        assert!(!lock.is_unset(name).unwrap());
    }
    assert_eq!(
        store.objects(),
        [
            "cbmc/run/ws/build.txt",
            "cbmc/run/ws/coverage.txt",
            "cbmc/run/ws/property.txt",
            "cbmc/run/ws/report.txt"
        ]
    );

    for name in lock.lock_set() {
        lock.unset(name).unwrap();
        assert!(lock.is_unset(name).unwrap());
    }
    assert!(store.objects().is_empty());
}

#[test]
fn test_lock_set_by_one_handle_is_seen_by_another() {
    let store = Arc::new(MemoryStore::with_bucket("cbmc"));
    let writer = Lock::new(store.clone(), "cbmc/run/ws").unwrap();
    let reader = Lock::new(store.clone(), "s3://cbmc/run/ws/").unwrap();
    writer.set("coverage.txt").unwrap();
    assert!(reader.is_set("coverage.txt").unwrap());
    assert!(store.contains("cbmc/run/ws/coverage.txt"));
}

#[test]
fn test_invalid_lock_names_are_rejected() {
    let (store, lock) = memory_lock("cbmc/run/ws");
    for bad in ["", "BUILD.txt", "Build.txt", "build", "build.TXT", "foo.txt", " build.txt"] {
        let checks = [
            lock.set(bad).err(),
            lock.unset(bad).err(),
            lock.is_set(bad).err(),
            lock.is_unset(bad).err(),
            lock.wait_for_set(bad, 1, Some("1s")).err(),
            lock.wait_for_unset(bad, 1, Some("1s")).err(),
        ];
        for err in checks {
            assert!(
                matches!(err, Some(ClientError::Domain(DomainError::InvalidLockName(ref n))) if n == bad),
                "'{}' should be rejected, got {:?}",
                bad,
                err
            );
        }
    }
    assert!(store.objects().is_empty());
    assert_eq!(store.exists_calls(), 0);
}

#[test]
fn test_lock_on_unknown_bucket() {
    let store = Arc::new(MemoryStore::with_bucket("cbmc"));
    assert!(matches!(
        Lock::new(store, "other/run/ws"),
        Err(ClientError::BucketNotFound(ref b)) if b == "other"
    ));
}
