//! Key store configuration.
//!
//! Loaded from TOML when the host has a config file; otherwise built from
//! defaults. The key directory is always explicit on the store itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KeycryptError, Result};

/// Environment variable that overrides `key_dir`.
pub const KEY_DIR_ENV: &str = "KEYCRYPT_KEY_DIR";

/// Directory name under the home directory used when nothing is configured.
pub const DEFAULT_KEY_DIR_NAME: &str = ".encryption";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreConfig {
    /// Directory holding one file per key, named by content digest.
    pub key_dir: PathBuf,
    /// Create `key_dir` (and parents) when opening the store.
    pub create_dir: bool,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            key_dir: default_key_dir(),
            create_dir: true,
        }
    }
}

/// `<home>/.encryption`, or `./.encryption` when no home directory is known.
pub fn default_key_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(DEFAULT_KEY_DIR_NAME)
}

impl KeyStoreConfig {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| KeycryptError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| KeycryptError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Apply `KEYCRYPT_KEY_DIR` if it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_key_dir_override(std::env::var_os(KEY_DIR_ENV).map(PathBuf::from))
    }

    fn with_key_dir_override(mut self, key_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = key_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.key_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KeyStoreConfig::default();
        assert!(config.key_dir.ends_with(DEFAULT_KEY_DIR_NAME));
        assert!(config.create_dir);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = KeyStoreConfig::from_toml_str("key_dir = \"/tmp/keys\"\n").unwrap();
        assert_eq!(config.key_dir, PathBuf::from("/tmp/keys"));
        assert!(config.create_dir);

        let config = KeyStoreConfig::from_toml_str("create_dir = false\n").unwrap();
        assert!(!config.create_dir);
        assert!(config.key_dir.ends_with(DEFAULT_KEY_DIR_NAME));
    }

    #[test]
    fn test_from_toml_invalid() {
        let result = KeyStoreConfig::from_toml_str("key_dir = 5\n");
        assert!(matches!(result, Err(KeycryptError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = KeyStoreConfig::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(KeycryptError::Config(_))));
    }

    #[test]
    fn test_key_dir_override() {
        let base = KeyStoreConfig::new("/a");
        assert_eq!(
            base.clone().with_key_dir_override(Some("/b".into())).key_dir,
            PathBuf::from("/b")
        );
        assert_eq!(
            base.clone().with_key_dir_override(Some(PathBuf::new())).key_dir,
            PathBuf::from("/a")
        );
        assert_eq!(base.with_key_dir_override(None).key_dir, PathBuf::from("/a"));
    }
}
