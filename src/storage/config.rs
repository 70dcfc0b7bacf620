//! Configuration handling for the bookstore
//!
//! Configuration is read from `--config <FILE>`, `./bookstore.toml`, or
//! `~/.config/bookstore/config.toml` (global), first match wins. The store
//! path can always be overridden with `XML_STORE_PATH`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that overrides the configured store path
pub const STORE_PATH_ENV: &str = "XML_STORE_PATH";

/// Store path used when nothing is configured
pub const DEFAULT_STORE_PATH: &str = "./data/bookstore.xml";

/// Project-local configuration file name
pub const LOCAL_CONFIG_FILE: &str = "bookstore.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Where the store document lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the XML document (relative paths resolve against the working directory)
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl StoreConfig {
    /// Returns the effective store path: `$XML_STORE_PATH` if set, else the configured path
    pub fn resolve_path(&self) -> PathBuf {
        resolve_store_path(std::env::var(STORE_PATH_ENV).ok().as_deref(), &self.path)
    }
}

fn resolve_store_path(env_override: Option<&str>, configured: &Path) -> PathBuf {
    match env_override.map(str::trim) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => configured.to_path_buf(),
    }
}

/// HTML report settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Page heading
    pub title: String,

    /// PNG embedded at the top of the report
    pub logo: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Bookstore: Books".to_string(),
            logo: None,
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub report: ReportConfig,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Loads configuration, preferring an explicit file
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            return Self::load_file(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::load_file(&local);
        }

        if let Some(global) = Self::global_config_dir().map(|dir| dir.join("config.toml")) {
            if global.is_file() {
                return Self::load_file(&global);
            }
        }

        Ok(Self::default())
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "bookstore", "bookstore")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Parses configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }
}
