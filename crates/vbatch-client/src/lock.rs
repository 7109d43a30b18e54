use crate::error::{ClientError, Result};
use crate::store::{wait_for_condition, Condition, ObjectPath, ObjectStore, Sleeper};
use std::sync::Arc;
use std::time::Duration;
use vbatch_core::constants::locks;
use vbatch_core::duration::{attempt_budget, parse_bound};
use vbatch_core::errors::DomainError;

/// Phase locks for one run: each lock is set exactly when a zero-byte
/// object named after it exists under the lock prefix.
#[derive(Clone)]
pub struct Lock {
    store: Arc<dyn ObjectStore>,
    base: ObjectPath,
    sleep: Sleeper,
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock").field("base", &self.base).finish()
    }
}

impl Lock {
    /// Binds locks to `path` (`[s3://]bucket[/prefix]`). Fails when the path
    /// is malformed or its bucket does not exist.
    pub fn new(store: Arc<dyn ObjectStore>, path: &str) -> Result<Self> {
        let base = ObjectPath::parse(path)?;
        if !store.bucket_exists(&base.bucket)? {
            return Err(ClientError::BucketNotFound(base.bucket));
        }
        Ok(Self {
            store,
            base,
            sleep: std::thread::sleep,
        })
    }

    pub fn with_sleeper(mut self, sleep: Sleeper) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn lock_set(&self) -> &'static [&'static str] {
        &locks::ALL
    }

    fn validate(&self, lock: &str) -> Result<()> {
        if locks::ALL.contains(&lock) {
            Ok(())
        } else {
            Err(DomainError::InvalidLockName(lock.to_string()).into())
        }
    }

    pub fn lock_path(&self, lock: &str) -> Result<ObjectPath> {
        self.validate(lock)?;
        Ok(self.base.join(lock))
    }

    pub fn set(&self, lock: &str) -> Result<()> {
        let path = self.lock_path(lock)?;
        tracing::info!("Setting lock {}", path);
        self.store.put(&path)
    }

    pub fn unset(&self, lock: &str) -> Result<()> {
        let path = self.lock_path(lock)?;
        tracing::info!("Unsetting lock {}", path);
        self.store.delete(&path)
    }

    pub fn is_set(&self, lock: &str) -> Result<bool> {
        let path = self.lock_path(lock)?;
        self.store.exists(&path)
    }

    pub fn is_unset(&self, lock: &str) -> Result<bool> {
        Ok(!self.is_set(lock)?)
    }

    pub fn wait_for_set(&self, lock: &str, interval_secs: u64, bound: Option<&str>) -> Result<()> {
        self.wait(lock, Condition::Exists, interval_secs, bound)
    }

    pub fn wait_for_unset(&self, lock: &str, interval_secs: u64, bound: Option<&str>) -> Result<()> {
        self.wait(lock, Condition::Absent, interval_secs, bound)
    }

    fn wait(
        &self,
        lock: &str,
        condition: Condition,
        interval_secs: u64,
        bound: Option<&str>,
    ) -> Result<()> {
        let path = self.lock_path(lock)?;
        let attempts = attempt_budget(parse_bound(bound)?, interval_secs)?;
        tracing::info!(
            "Waiting for {} to be {} (every {}s, at most {} checks)",
            path,
            condition,
            interval_secs,
            attempts
        );

        let met = wait_for_condition(
            self.store.as_ref(),
            &path,
            condition,
            Duration::from_secs(interval_secs),
            attempts,
            self.sleep,
        )?;
        if met {
            Ok(())
        } else {
            Err(ClientError::LockTimeout {
                lock: lock.to_string(),
                path: path.to_string(),
                attempts,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsStore;
    use tempfile::tempdir;

    fn no_sleep(_: Duration) {}

    fn fs_lock(root: &std::path::Path, path: &str) -> Lock {
        let store = FsStore::new(root);
        store.create_bucket("cbmc").unwrap();
        Lock::new(Arc::new(store), path)
            .unwrap()
            .with_sleeper(no_sleep)
    }

    #[test]
    fn test_lock_path_with_and_without_prefix() {
        let dir = tempdir().unwrap();
        let lock = fs_lock(dir.path(), "s3://cbmc/run-1/ws");
        assert_eq!(lock.lock_path("build.txt").unwrap().to_string(), "cbmc/run-1/ws/build.txt");

        let bare = fs_lock(dir.path(), "cbmc");
        assert_eq!(bare.lock_path("report.txt").unwrap().to_string(), "cbmc/report.txt");
    }

    #[test]
    fn test_set_and_unset_are_idempotent() {
        let dir = tempdir().unwrap();
        let lock = fs_lock(dir.path(), "cbmc/run");
        lock.set("coverage.txt").unwrap();
        lock.set("coverage.txt").unwrap();
        assert!(lock.is_set("coverage.txt").unwrap());
        lock.unset("coverage.txt").unwrap();
        lock.unset("coverage.txt").unwrap();
        assert!(lock.is_unset("coverage.txt").unwrap());
    }

    #[test]
    fn test_missing_bucket_is_rejected() {
        let dir = tempdir().unwrap();
        let err = Lock::new(Arc::new(FsStore::new(dir.path())), "absent/prefix").unwrap_err();
        assert!(matches!(err, ClientError::BucketNotFound(b) if b == "absent"));
    }

    #[test]
    fn test_malformed_path_is_rejected() {
        let dir = tempdir().unwrap();
        let err = Lock::new(Arc::new(FsStore::new(dir.path())), "not a path").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Config(vbatch_core::errors::ConfigError::InvalidStorePath(_))
        ));
    }

    #[test]
    fn test_wait_for_unset_times_out() {
        let dir = tempdir().unwrap();
        let lock = fs_lock(dir.path(), "cbmc/run");
        lock.set("build.txt").unwrap();
        match lock.wait_for_unset("build.txt", 5, Some("10s")) {
            Err(ClientError::LockTimeout { attempts, lock, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(lock, "build.txt");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_rejects_bad_bound_and_interval() {
        let dir = tempdir().unwrap();
        let lock = fs_lock(dir.path(), "cbmc/run");
        assert!(matches!(
            lock.wait_for_set("build.txt", 5, Some("soon")),
            Err(ClientError::Config(vbatch_core::errors::ConfigError::InvalidDuration(_)))
        ));
        assert!(matches!(
            lock.wait_for_set("build.txt", 0, Some("1m")),
            Err(ClientError::Config(vbatch_core::errors::ConfigError::ZeroPollInterval))
        ));
    }
}
