//! Configuration for an archive repository

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{DEFAULT_DIR_MODE, Result, StorageError};

/// Configuration for an archive repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Archive root holding `pool/` and `public/`
    pub root: PathBuf,

    /// Permission bits for directories created in the public tree.
    /// Only applied on Unix.
    pub dir_mode: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./archive"),
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

impl RepositoryConfig {
    /// Create a new configuration with the specified archive root
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| StorageError::filesystem(path, e))?;
        let config: Self = serde_json::from_slice(&data).map_err(|e| {
            StorageError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the archive root
    #[must_use]
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Set the permission bits for created directories
    #[must_use]
    pub const fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Check the configuration for values the repository cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(StorageError::Config("archive root is empty".to_string()));
        }
        if self.dir_mode & !0o7777 != 0 {
            return Err(StorageError::Config(format!(
                "directory mode {:o} has bits outside 0o7777",
                self.dir_mode
            )));
        }
        // The repository creates entries inside directories it creates.
        if self.dir_mode & 0o300 != 0o300 {
            return Err(StorageError::Config(format!(
                "directory mode {:o} must be owner writable and searchable",
                self.dir_mode
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert_eq!(config.dir_mode, 0o755);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RepositoryConfig::new("/srv/archive").with_dir_mode(0o775);
        assert_eq!(config.root, PathBuf::from("/srv/archive"));
        assert_eq!(config.dir_mode, 0o775);

        let config = config.with_root("/srv/other");
        assert_eq!(config.root, PathBuf::from("/srv/other"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RepositoryConfig::new("").validate().is_err());
        assert!(
            RepositoryConfig::new("/srv/archive")
                .with_dir_mode(0o10_755)
                .validate()
                .is_err()
        );
        assert!(
            RepositoryConfig::new("/srv/archive")
                .with_dir_mode(0o555)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("repository.json");
        std::fs::write(&path, r#"{ "root": "/srv/archive" }"#).expect("write");

        let config = RepositoryConfig::load(&path).expect("load");
        assert_eq!(config.root, PathBuf::from("/srv/archive"));
        assert_eq!(config.dir_mode, DEFAULT_DIR_MODE);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("repository.json");
        std::fs::write(&path, b"root = /srv/archive").expect("write");

        let err = RepositoryConfig::load(&path).expect_err("malformed");
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().expect("tempdir");
        let err = RepositoryConfig::load(dir.path().join("absent.json")).expect_err("missing");
        assert!(err.is_not_found());
    }
}
