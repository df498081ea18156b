//! Store configuration with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables (`PAGEPERM_DB_PATH`, `PAGEPERM_MAP_SIZE`,
//!    `PAGEPERM_MAX_TREE_DEPTH`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DB_COUNT, DEFAULT_MAP_SIZE, DEFAULT_MAX_TREE_DEPTH};
use crate::error::{PermError, Result};

/// LMDB environment and traversal settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_path")]
    pub path: PathBuf,
    #[serde(default = "default_map_size")]
    pub map_size: usize,
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,
    /// Bound on ancestor walks and subtree recursion
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: default_path(),
            map_size: default_map_size(),
            max_dbs: default_max_dbs(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("pageperm.db")
}

fn default_map_size() -> usize {
    DEFAULT_MAP_SIZE
}

fn default_max_dbs() -> u32 {
    DB_COUNT
}

fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_TREE_DEPTH
}

impl Config {
    /// Defaults with the database placed at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Load from a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| PermError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup("PAGEPERM_DB_PATH") {
            self.path = PathBuf::from(path);
        }
        if let Some(size) = lookup("PAGEPERM_MAP_SIZE") {
            self.map_size = size
                .parse()
                .map_err(|_| PermError::Config(format!("PAGEPERM_MAP_SIZE: {:?}", size)))?;
        }
        if let Some(depth) = lookup("PAGEPERM_MAX_TREE_DEPTH") {
            self.max_tree_depth = depth
                .parse()
                .map_err(|_| PermError::Config(format!("PAGEPERM_MAX_TREE_DEPTH: {:?}", depth)))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.max_dbs < DB_COUNT {
            return Err(PermError::Config(format!(
                "max_dbs must be at least {}, got {}",
                DB_COUNT, self.max_dbs
            )));
        }
        if self.max_tree_depth == 0 {
            return Err(PermError::Config("max_tree_depth must be positive".into()));
        }
        if self.map_size == 0 {
            return Err(PermError::Config("map_size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml("path = \"/tmp/perms\"\nmax_tree_depth = 32\n").unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/perms"));
        assert_eq!(config.max_tree_depth, 32);
        assert_eq!(config.map_size, DEFAULT_MAP_SIZE);
    }

    #[test]
    fn rejects_too_few_databases() {
        assert!(Config::from_toml("max_dbs = 2").is_err());
    }

    #[test]
    fn env_layer_overrides_file_layer() {
        let config = Config::at("from-file")
            .with_overrides(|name| match name {
                "PAGEPERM_DB_PATH" => Some("from-env".into()),
                "PAGEPERM_MAX_TREE_DEPTH" => Some("8".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.path, PathBuf::from("from-env"));
        assert_eq!(config.max_tree_depth, 8);
    }

    #[test]
    fn bad_env_value_is_a_config_error() {
        let err = Config::default()
            .with_overrides(|name| (name == "PAGEPERM_MAP_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, PermError::Config(_)));
    }
}
