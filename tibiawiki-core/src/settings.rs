//! Settings loaded from a TOML file like:
//! ```toml
//! database = "tibiawiki.db"
//! log_file = "/tmp/tibiawiki.log"
//! articles_dir = "dump/articles"
//! ```
//!
//! Every key is optional.

use crate::error::{Result, TibiaWikiError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// SQLite file records are written to.
    pub database: PathBuf,
    pub log_file: PathBuf,
    /// Default directory of article JSON dumps.
    pub articles_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("tibiawiki.db"),
            log_file: PathBuf::from("/tmp/tibiawiki.log"),
            articles_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TibiaWikiError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read settings from {:?}: {}", path, e),
            ))
        })?;

        Self::from_str(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TibiaWikiError::Config(format!("Failed to parse settings TOML: {}", e)))
    }
}
