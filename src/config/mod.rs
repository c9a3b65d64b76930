//! Configuration management.
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables prefixed with `NIST_RESOLVER_` (nested keys use `__`, e.g.
//! `NIST_RESOLVER_RESOLVER__WORKERS=4`).

mod file_config;

pub use file_config::{find_config_file, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Cache location and remote data URLs
    #[serde(default)]
    pub data: DataConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Resolution engine settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where data comes from and where it is cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub directory: PathBuf,

    /// Bulk pubs-export archive
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Resource whose `Last-Modified` header tracks the feed
    #[serde(default = "default_feed_meta_url")]
    pub feed_meta_url: String,

    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Base URL the index's document paths are relative to
    #[serde(default = "default_documents_url")]
    pub documents_url: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: default_data_dir(),
            feed_url: default_feed_url(),
            feed_meta_url: default_feed_meta_url(),
            index_url: default_index_url(),
            documents_url: default_documents_url(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("nist-resolver")
}

fn default_feed_url() -> String {
    "https://csrc.nist.gov/CSRC/media/feeds/metanorma/pubs-export.zip".to_string()
}

fn default_feed_meta_url() -> String {
    "https://csrc.nist.gov/CSRC/media/feeds/metanorma/pubs-export.meta".to_string()
}

fn default_index_url() -> String {
    "https://raw.githubusercontent.com/relaton/relaton-data-nist/main/index-v1.zip".to_string()
}

fn default_documents_url() -> String {
    "https://raw.githubusercontent.com/relaton/relaton-data-nist/main/".to_string()
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    crate::utils::DEFAULT_USER_AGENT.to_string()
}

/// Resolution engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Concurrent candidate fetches per batch
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    3
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` for structured output, plain text otherwise
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix("NIST_RESOLVER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Configuration from the first config file found, else defaults plus the
/// environment
pub fn get_config() -> Result<Config, config::ConfigError> {
    let path = find_config_file();
    load_config(path.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolver.workers, 3);
        assert_eq!(config.http.timeout_seconds, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.data.feed_meta_url.ends_with("pubs-export.meta"));
        assert!(config.data.directory.ends_with("nist-resolver"));
    }

    #[test]
    fn test_load_config_file_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nist-resolver.toml");
        std::fs::write(
            &path,
            "[resolver]\nworkers = 5\n\n[data]\ndirectory = \"/tmp/nist-cache\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.resolver.workers, 5);
        assert_eq!(config.data.directory, PathBuf::from("/tmp/nist-cache"));
        assert_eq!(config.http.timeout_seconds, 30);
        assert!(config.data.index_url.ends_with("index-v1.zip"));
    }
}
