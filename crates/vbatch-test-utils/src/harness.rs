use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const TEST_BUCKET: &str = "cbmc";

pub struct TestContext {
    pub _temp_dir: tempfile::TempDir,
    pub test_root: PathBuf,
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub store_root: PathBuf,
}

impl TestContext {
    /// A scratch home with a `vbatch/config.toml` pointing the object store
    /// at a local directory that already holds the `cbmc` bucket.
    pub fn new() -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("vbatch-test-")
            .tempdir()
            .expect("Failed to create temp dir");
        let test_root = temp_dir.path().to_path_buf();

        let config_dir = test_root.join("config");
        let cache_dir = test_root.join("cache");
        let store_root = test_root.join("store");
        fs::create_dir_all(config_dir.join("vbatch")).expect("Failed to create vbatch config dir");
        fs::create_dir_all(&cache_dir).expect("Failed to create cache dir");
        fs::create_dir_all(store_root.join(TEST_BUCKET)).expect("Failed to create test bucket");

        let ctx = Self {
            _temp_dir: temp_dir,
            test_root,
            config_dir,
            cache_dir,
            store_root,
        };
        ctx.write_config("");
        ctx
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("vbatch").join("config.toml")
    }

    /// Rewrites the config file: the local store and one-second poll
    /// intervals, followed by `extra`.
    pub fn write_config(&self, extra: &str) {
        let content = format!(
            r#"
[store]
kind = "fs"
bucket = "{}"
root = "{}"

[poll]
lock_interval_secs = 1
monitor_interval_secs = 1
{}
"#,
            TEST_BUCKET,
            self.store_root.display(),
            extra
        );
        fs::write(self.config_path(), content).expect("Failed to write temp config");
    }

    /// Where the local store keeps the object `bucket/key`.
    pub fn object_file(&self, object: &str) -> PathBuf {
        self.store_root.join(object)
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.test_root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn read_json(path: &Path) -> Value {
        let content = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
        serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
