/// Common test utilities and helpers for forksync integration tests
use assert_fs::fixture::{FileWriteStr, PathChild};
use assert_fs::TempDir;

/// A temp directory with helpers for writing repository list files
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write a config file and return its path as a string
    pub fn write_config(&self, name: &str, content: &str) -> String {
        let file = self.temp_dir.child(name);
        file.write_str(content).expect("Failed to write test config");
        file.path().to_string_lossy().into_owned()
    }

    pub fn valid_config(&self) -> String {
        self.write_config(
            "repositories.ini",
            r#"
[sample-fork]
    url = https://github.com/user/sample
    upstream = https://github.com/original/sample
    branches = master->master
"#,
        )
    }

    pub fn malformed_config(&self) -> String {
        self.write_config(
            "broken.ini",
            r#"
[sample-fork]
    url = https://github.com/user/sample
    branches = master
"#,
        )
    }
}
