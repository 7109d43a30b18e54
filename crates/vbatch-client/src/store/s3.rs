use super::{ObjectPath, ObjectStore};
use crate::aws::AwsCli;
use crate::error::{ClientError, Result};

const SERVICE: &str = "s3api";

/// S3 reached through `aws s3api`.
#[derive(Debug, Clone)]
pub struct AwsCliS3 {
    cli: AwsCli,
}

impl AwsCliS3 {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }

    fn object_args(path: &ObjectPath) -> Vec<String> {
        vec![
            "--bucket".to_string(),
            path.bucket.clone(),
            "--key".to_string(),
            path.key.clone().unwrap_or_default(),
        ]
    }

    /// Runs a head request; missing and forbidden both read as absent.
    fn head(&self, operation: &str, args: &[String]) -> Result<bool> {
        match self.cli.run(SERVICE, operation, args) {
            Ok(_) => Ok(true),
            Err(ClientError::Backend(err)) if err.is_not_found() || err.is_forbidden() => {
                tracing::trace!("{} reported absent: {}", operation, err.code);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

impl ObjectStore for AwsCliS3 {
    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.head("head-bucket", &["--bucket".to_string(), bucket.to_string()])
    }

    fn exists(&self, path: &ObjectPath) -> Result<bool> {
        if path.is_bucket() {
            return self.bucket_exists(&path.bucket);
        }
        self.head("head-object", &Self::object_args(path))
    }

    fn put(&self, path: &ObjectPath) -> Result<()> {
        self.cli.run(SERVICE, "put-object", &Self::object_args(path))?;
        Ok(())
    }

    fn delete(&self, path: &ObjectPath) -> Result<()> {
        self.cli.run(SERVICE, "delete-object", &Self::object_args(path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_args() {
        let path = ObjectPath::parse("cbmc/run/ws/build.txt").unwrap();
        assert_eq!(
            AwsCliS3::object_args(&path),
            vec!["--bucket", "cbmc", "--key", "run/ws/build.txt"]
        );
    }
}
