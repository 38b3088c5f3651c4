//! Configuration for the `ctlink` CLI.
//!
//! Mirrors the search order a small linker driver typically uses for
//! its own settings: current directory, then the user's home
//! directory, then the system configuration directory.

use dirs::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

pub const CONFIG_FILE_NAME: &str = "ctlink.toml";

const DEFAULT_COMPRESSION_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub verbose: bool,

    /// Output path used when a `link` invocation doesn't pass `--output`.
    #[serde(default = "default_output_path")]
    pub default_output: String,

    /// Per-member size, in bytes, above which a member is flagged as a
    /// compression candidate in the emitted archive's frame.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,

    /// Default `--share-mode` when neither the CLI flag nor the link
    /// request file specifies one.
    #[serde(default = "default_share_mode")]
    pub share_mode: String,
}

fn default_output_path() -> String {
    "a.ctf".to_string()
}

fn default_compression_threshold() -> usize {
    DEFAULT_COMPRESSION_THRESHOLD
}

fn default_share_mode() -> String {
    "unconflicted".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            default_output: default_output_path(),
            compression_threshold: default_compression_threshold(),
            share_mode: default_share_mode(),
        }
    }
}

impl Config {
    /// Load from the default search path, falling back to built-in
    /// defaults when nothing is found.
    pub fn load() -> Result<Self> {
        match Self::find_config_file()? {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::Config(format!("configuration file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::Config(format!("failed to parse configuration: {e}")))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CliError::Config(format!("failed to serialize configuration: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn check_current_dir_config() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    fn check_home_config() -> Option<PathBuf> {
        home_dir().map(|dir| dir.join(".config").join("ctlink").join(CONFIG_FILE_NAME)).filter(|path| path.exists())
    }

    fn check_system_config() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("ctlink").join(CONFIG_FILE_NAME)).filter(|path| path.exists())
    }

    fn find_config_file() -> Result<Option<PathBuf>> {
        Ok(Self::check_current_dir_config().or_else(Self::check_home_config).or_else(Self::check_system_config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_sane_values() {
        let config = Config::default();
        assert!(!config.verbose);
        assert_eq!(config.default_output, "a.ctf");
        assert_eq!(config.compression_threshold, DEFAULT_COMPRESSION_THRESHOLD);
        assert_eq!(config.share_mode, "unconflicted");
    }

    #[test]
    fn save_and_load_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let original = Config { verbose: true, default_output: "out.ctf".to_string(), compression_threshold: 8192, share_mode: "unconflicted".to_string() };
        original.save_to_path(&config_path).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn load_from_nonexistent_path_errors() {
        let result = Config::load_from_path(Path::new("/nonexistent/ctlink-test/config.toml"));
        assert!(result.is_err());
    }
}
