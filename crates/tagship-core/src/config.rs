//! `tagship.toml` project configuration.
//!
//! The file is optional; every field has a default.
//!
//! ```toml
//! [archive]
//! prefix = "myproj"
//! versioned = true
//! format = "tar.gz"
//! extra = ["target/release/myproj"]
//!
//! [package]
//! name = "myproj"
//! release = "1"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveFormat;
use crate::package::PackageConfig;

/// Default configuration file name, looked up in the repository root.
pub const CONFIG_FILE: &str = "tagship.toml";

/// Errors loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("while reading {path}: {source}")]
    Io {
        /// File that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration.
    #[error("while parsing {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: String,
        /// TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Whole-file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Archive defaults.
    #[serde(default)]
    pub archive: ArchiveSettings,
    /// Packaging metadata.
    #[serde(default)]
    pub package: Option<PackageConfig>,
}

/// `[archive]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Entry prefix base; the package name or directory name when unset.
    pub prefix: Option<String>,
    /// Append `-<version>` to the prefix.
    pub versioned: bool,
    /// Output format.
    pub format: ArchiveFormat,
    /// Paths outside the tag's tree to include, relative to the root.
    pub extra: Vec<String>,
    /// Archive the extra paths alone when the tag's tree cannot be read.
    pub allow_unreadable_tree: bool,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            prefix: None,
            versioned: true,
            format: ArchiveFormat::default(),
            extra: Vec::new(),
            allow_unreadable_tree: false,
        }
    }
}

impl ArchiveSettings {
    /// Final entry prefix for `version`, using `fallback` when no prefix is
    /// configured.
    pub fn resolve_prefix(&self, fallback: &str, version: &str) -> String {
        let base = self.prefix.as_deref().unwrap_or(fallback);
        if self.versioned {
            format!("{base}-{version}")
        } else {
            base.to_string()
        }
    }
}

impl Config {
    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: CONFIG_FILE.to_string(),
            source,
        })
    }

    /// Load `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
