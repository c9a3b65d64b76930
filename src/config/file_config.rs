//! Configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [data]
//! directory = "~/.cache/nist-resolver"
//! feed_url = "https://csrc.nist.gov/CSRC/media/feeds/metanorma/pubs-export.zip"
//! feed_meta_url = "https://csrc.nist.gov/CSRC/media/feeds/metanorma/pubs-export.meta"
//! index_url = "https://raw.githubusercontent.com/relaton/relaton-data-nist/main/index-v1.zip"
//! documents_url = "https://raw.githubusercontent.com/relaton/relaton-data-nist/main/"
//!
//! [http]
//! timeout_seconds = 30
//!
//! [resolver]
//! workers = 3
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
const LOCAL_CONFIG: &str = "nist-resolver.toml";

impl Config {
    /// Load configuration from a TOML file, without environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// `./nist-resolver.toml`, else `<config dir>/nist-resolver/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("nist-resolver").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
