use super::{ObjectPath, ObjectStore};
use crate::error::{BackendError, ClientError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use vbatch_core::errors::ConfigError;

const SERVICE: &str = "fs";

/// A store kept on the local filesystem: each bucket is a directory under
/// `root` and each object a file.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_bucket(&self, bucket: &str) -> Result<()> {
        fs_err::create_dir_all(self.root.join(bucket)).map_err(ConfigError::Io)?;
        Ok(())
    }

    fn object_file(&self, path: &ObjectPath) -> Result<PathBuf> {
        let key = path.key.as_deref().ok_or_else(|| ClientError::InvalidPath {
            path: self.root.join(&path.bucket),
            reason: "a bucket is not an object".to_string(),
        })?;
        Ok(self.root.join(&path.bucket).join(key))
    }

    fn io_error(operation: &str, path: &ObjectPath, err: std::io::Error) -> ClientError {
        let code = match err.kind() {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "AccessDenied",
            _ => "IoError",
        };
        BackendError::new(SERVICE, operation, code, format!("{}: {}", path, err)).into()
    }
}

impl ObjectStore for FsStore {
    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.root.join(bucket).is_dir())
    }

    fn exists(&self, path: &ObjectPath) -> Result<bool> {
        if path.is_bucket() {
            return self.bucket_exists(&path.bucket);
        }
        Ok(self.object_file(path)?.is_file())
    }

    fn put(&self, path: &ObjectPath) -> Result<()> {
        if !self.bucket_exists(&path.bucket)? {
            return Err(BackendError::new(
                SERVICE,
                "put-object",
                "NoSuchBucket",
                format!("bucket '{}' does not exist under {}", path.bucket, self.root.display()),
            )
            .into());
        }
        let file = self.object_file(path)?;
        if let Some(parent) = file.parent() {
            fs_err::create_dir_all(parent).map_err(|e| Self::io_error("put-object", path, e))?;
        }
        fs_err::write(&file, b"").map_err(|e| Self::io_error("put-object", path, e))?;
        Ok(())
    }

    fn delete(&self, path: &ObjectPath) -> Result<()> {
        let file = self.object_file(path)?;
        match fs_err::remove_file(&file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error("delete-object", path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_exists_delete() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.create_bucket("cbmc").unwrap();

        let path = ObjectPath::parse("cbmc/run/ws/build.txt").unwrap();
        assert!(!store.exists(&path).unwrap());
        store.put(&path).unwrap();
        assert!(store.exists(&path).unwrap());
        assert_eq!(fs_err::metadata(dir.path().join("cbmc/run/ws/build.txt")).unwrap().len(), 0);

        store.delete(&path).unwrap();
        assert!(!store.exists(&path).unwrap());
        store.delete(&path).unwrap();
    }

    #[test]
    fn test_put_into_missing_bucket_fails() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let err = store.put(&ObjectPath::parse("nobucket/x.txt").unwrap()).unwrap_err();
        match err {
            ClientError::Backend(e) => assert_eq!(e.code, "NoSuchBucket"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_bucket_exists() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert!(!store.bucket_exists("cbmc").unwrap());
        store.create_bucket("cbmc").unwrap();
        assert!(store.bucket_exists("cbmc").unwrap());
        assert!(store.exists(&ObjectPath::bucket("cbmc")).unwrap());
    }
}
