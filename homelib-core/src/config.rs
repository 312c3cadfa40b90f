//! Application configuration
//!
//! Settings live in `config.json` inside the data directory. Paths in the
//! file may be relative; they are resolved against the data directory.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "HOMELIB_DATA_DIR";

/// Name of the settings file inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Where the catalog database and cover images live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding this file; not persisted
    #[serde(skip)]
    pub data_dir: PathBuf,

    pub database_file: PathBuf,

    pub covers_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            database_file: PathBuf::from("homelib.db"),
            covers_dir: PathBuf::from("covers"),
        }
    }
}

impl Config {
    /// Pick the data directory: explicit flag, then environment, then the
    /// platform data directory, then `./homelib_data`
    pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
        if let Some(dir) = explicit {
            return dir.to_path_buf();
        }
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        if let Some(proj_dirs) = directories::ProjectDirs::from("org", "homelib", "HomeLib") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from("homelib_data")
        }
    }

    /// Load the configuration in `data_dir`.
    ///
    /// A missing file yields the defaults, which are written out so the
    /// user has something to edit.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);

        let mut config = if path.is_file() {
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let config: Config = serde_json::from_str(&text).map_err(|source| {
                ConfigError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
            tracing::debug!("Configuration loaded from {}", path.display());
            config
        } else {
            tracing::info!("Configuration file not found, using defaults");
            let config = Config {
                data_dir: data_dir.to_path_buf(),
                ..Config::default()
            };
            config.save()?;
            config
        };

        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Write the configuration to `config.json` in its data directory
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.data_dir.join(CONFIG_FILE);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.data_dir).map_err(write_err)?;
        let text = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        fs::write(&path, text + "\n").map_err(write_err)?;

        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Absolute location of the catalog database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    /// Absolute location of the cover image directory
    pub fn covers_path(&self) -> PathBuf {
        self.data_dir.join(&self.covers_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");

        let config = Config::load(&data_dir).unwrap();
        assert_eq!(config.database_path(), data_dir.join("homelib.db"));
        assert_eq!(config.covers_path(), data_dir.join("covers"));
        assert!(data_dir.join(CONFIG_FILE).is_file());
    }

    #[test]
    fn test_load_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"database_file": "catalog.sqlite", "covers_dir": "/srv/covers"}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.database_path(), dir.path().join("catalog.sqlite"));
        assert_eq!(config.covers_path(), PathBuf::from("/srv/covers"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{"covers_dir": "images"}"#).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.database_file, PathBuf::from("homelib.db"));
        assert_eq!(config.covers_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "not json").unwrap();

        assert!(matches!(
            Config::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let dir = PathBuf::from("/tmp/explicit");
        assert_eq!(Config::resolve_data_dir(Some(dir.as_path())), dir);
    }
}
