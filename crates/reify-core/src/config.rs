//! Workspace configuration (reify.toml)
//!
//! Every section is optional. Relative catalog paths are resolved against
//! the directory holding the configuration file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::mop::{SynchronousDispatcher, TargetType};

/// Default configuration file name
pub const CONFIG_FILE: &str = "reify.toml";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Workspace configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReifyConfig {
    /// Type catalogs to load
    #[serde(default)]
    pub catalog: CatalogSection,

    /// Stub synthesis settings
    #[serde(default)]
    pub stubs: StubsSection,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSection,

    /// Directory of the loaded file; relative paths resolve against it
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// `[catalog]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CatalogSection {
    /// Catalog files (TOML or JSON), loaded in order
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

/// `[stubs]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct StubsSection {
    /// Targets to synthesize at startup, e.g. `"acme.Box<String>"`
    #[serde(default)]
    pub warm: Vec<String>,

    /// Dispatcher used when a command does not name one
    #[serde(default = "default_dispatcher")]
    pub default_dispatcher: String,
}

fn default_dispatcher() -> String {
    SynchronousDispatcher::NAME.to_string()
}

impl Default for StubsSection {
    fn default() -> Self {
        Self {
            warm: Vec::new(),
            default_dispatcher: default_dispatcher(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive (`info`, `reify_core=debug`, ...)
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl ReifyConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ReifyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Look for `reify.toml` in `dir`; defaults if absent
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stubs.default_dispatcher.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "stubs.default-dispatcher cannot be empty".to_string(),
            ));
        }
        self.warm_targets()?;
        Ok(())
    }

    /// Catalog paths, resolved against the config directory
    pub fn catalog_files(&self) -> Vec<PathBuf> {
        self.catalog
            .files
            .iter()
            .map(|f| match &self.base_dir {
                Some(base) if f.is_relative() => base.join(f),
                _ => f.clone(),
            })
            .collect()
    }

    /// Parsed `stubs.warm` targets
    pub fn warm_targets(&self) -> Result<Vec<TargetType>, ConfigError> {
        self.stubs
            .warm
            .iter()
            .map(|t| {
                t.parse::<TargetType>()
                    .map_err(|e| ConfigError::ValidationError(format!("stubs.warm: {}", e)))
            })
            .collect()
    }
}
