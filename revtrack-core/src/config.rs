//! revtrack configuration.
//!
//! # Layout
//!
//! ```text
//! ~/.revtrack/
//!   config.yaml     (optional; defaults apply when absent)
//!   revtrack.db     (default SQLite store location)
//! ```
//!
//! Like the store helpers, every loader has an `_at(home, …)` form used by
//! tests and a no-arg wrapper that resolves `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Environment;

/// Default length of the short commit id taken from `@@@` header lines.
pub const DEFAULT_COMMIT_ID_LENGTH: usize = 7;

/// Root of the on-disk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database path. `~/` is expanded against the home directory;
    /// `None` means `<home>/.revtrack/revtrack.db`.
    pub database: Option<PathBuf>,
    pub commit_id_length: usize,
    pub feed: FeedConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            commit_id_length: DEFAULT_COMMIT_ID_LENGTH,
            feed: FeedConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the database path against `home`.
    pub fn database_path(&self, home: &Path) -> PathBuf {
        match &self.database {
            Some(path) => expand_home(path, home),
            None => default_database_at(home),
        }
    }
}

/// Replication status feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Registry base URL. `None` disables status gating entirely.
    pub base_url: Option<String>,
    pub username: String,
    pub password: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub timeout_secs: u64,
    pub policies: PolicyIds,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: String::new(),
            password: String::new(),
            page_size: 200,
            max_pages: 10,
            timeout_secs: 30,
            policies: PolicyIds::default(),
        }
    }
}

/// Replication policy id per target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyIds {
    pub alpha: u32,
    pub beta: u32,
}

impl Default for PolicyIds {
    fn default() -> Self {
        Self { alpha: 1, beta: 3 }
    }
}

impl PolicyIds {
    pub fn for_env(&self, env: Environment) -> u32 {
        match env {
            Environment::Alpha => self.alpha,
            Environment::Beta => self.beta,
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.revtrack/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".revtrack")
}

/// `<home>/.revtrack/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

/// `<home>/.revtrack/revtrack.db`
pub fn default_database_at(home: &Path) -> PathBuf {
    root_at(home).join("revtrack.db")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load `<home>/.revtrack/config.yaml`, falling back to defaults when absent.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load an explicit config file. Unlike [`load_at`], a missing file is an error.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
