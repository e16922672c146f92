//! Common testing utilities for Vault Uploader integration tests.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub const TEST_TOKEN: &str = "s.test-token";

/// Test context that manages temporary files and directories.
pub struct TestContext {
    /// Path to temporary directory
    pub temp_path: PathBuf,
    /// The temporary directory (kept to prevent early deletion)
    _temp_dir: TempDir,
}

impl TestContext {
    /// Create a new test context with a temporary directory.
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let temp_path = temp_dir.path().to_path_buf();

        Ok(Self {
            temp_path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a test file with content.
    pub fn create_file(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let file_path = self.temp_path.join(name);
        let mut file = fs::File::create(&file_path)?;
        file.write_all(content.as_bytes())?;
        Ok(file_path)
    }

    /// Create an INI file from sections given as `(name, [(key, value)])`.
    ///
    /// A section named `DEFAULT` becomes the default section.
    #[allow(dead_code)]
    pub fn create_ini(
        &self,
        name: &str,
        sections: &[(&str, Vec<(&str, &str)>)],
    ) -> anyhow::Result<PathBuf> {
        let content = sections
            .iter()
            .map(|(section, entries)| {
                let body = entries
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("[{}]\n{}\n", section, body)
            })
            .collect::<Vec<_>>()
            .join("\n");

        self.create_file(name, &content)
    }

    /// Get the path to a file in the temp directory.
    #[allow(dead_code)]
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_path.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_context_create_file() {
        let ctx = TestContext::new().unwrap();
        let file_path = ctx.create_file("test.txt", "Hello, World!").unwrap();

        assert!(file_path.exists());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_test_context_create_ini() {
        let ctx = TestContext::new().unwrap();
        let file_path = ctx
            .create_ini(
                "app.ini",
                &[("DEFAULT", vec![("a", "1")]), ("db", vec![("user", "admin")])],
            )
            .unwrap();

        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "[DEFAULT]\na = 1\n\n[db]\nuser = admin\n"
        );
    }
}
