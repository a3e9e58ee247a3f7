//! Configuration of the local backend.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

/// Settings the local backend is built from.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Host directory every local node path is relative to.
    /// Environment: VFS_NODES__BASE_DIR
    pub base_dir: PathBuf,
}

impl StorageConfig {
    /// Loads the configuration from a file (format taken from its extension) with environment
    /// overrides prefixed by `VFS_NODES__`.
    ///
    /// The base directory is only checked for emptiness here; its existence is checked when a
    /// backend is built from it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("VFS_NODES").separator("__"))
            .build()?;

        let config: StorageConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(config::ConfigError::Message(
                "base_dir cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    fn setup_test_env() -> TempDir {
        TempDir::new("config_test").unwrap()
    }

    #[test]
    fn test_load_toml() -> anyhow::Result<()> {
        let temp_dir = setup_test_env();
        let path = temp_dir.path().join("storage.toml");
        fs::write(&path, "base_dir = \"/srv/data\"\n")?;

        let config = StorageConfig::load(&path)?;
        assert_eq!(config.base_dir, PathBuf::from("/srv/data"));

        Ok(())
    }

    #[test]
    fn test_missing_base_dir() -> anyhow::Result<()> {
        let temp_dir = setup_test_env();
        let path = temp_dir.path().join("storage.toml");
        fs::write(&path, "other = 1\n")?;

        assert!(StorageConfig::load(&path).is_err());

        Ok(())
    }

    #[test]
    fn test_empty_base_dir() -> anyhow::Result<()> {
        let temp_dir = setup_test_env();
        let path = temp_dir.path().join("storage.toml");
        fs::write(&path, "base_dir = \"\"\n")?;

        assert!(matches!(
            StorageConfig::load(&path),
            Err(config::ConfigError::Message(_))
        ));

        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = setup_test_env();
        assert!(StorageConfig::load(temp_dir.path().join("absent.toml")).is_err());
    }
}
