//! Data source adapters supplying candidate records.
//!
//! A [`DataSource`] answers two questions: which raw records could match a
//! query, and how to turn one of those records into a full [`NistItem`].
//!
//! - [`PubsExportSource`]: the bulk pubs-export JSON feed (primary)
//! - [`IndexSource`]: the precomputed identifier index with per-document
//!   YAML files (fallback)
//! - [`MockSource`]: in-memory records for tests

mod index;
pub mod mock;
mod pubs_export;

pub use index::{IndexRow, IndexSource};
pub use mock::MockSource;
pub use pubs_export::{FeedPerson, FeedRecord, FeedRelation, PubsExportSource};

use async_trait::async_trait;

use crate::models::{NistItem, RawCandidate, SearchQuery};

/// A provider of candidate records
#[async_trait]
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs (e.g. "pubs-export", "index")
    fn id(&self) -> &str;

    /// Raw records that could match `query`.
    ///
    /// Implementations may prefilter cheaply (series and code, status) but
    /// leave field-level matching to the hit collection.
    async fn candidates(&self, query: &SearchQuery) -> Result<Vec<RawCandidate>, SourceError>;

    /// Build the full bibliographic item for a candidate
    async fn materialize(&self, raw: &RawCandidate) -> Result<NistItem, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Remote resource answered 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parsing error (JSON, YAML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Corrupt or empty archive
    #[error("Archive error: {0}")]
    Archive(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return SourceError::NotFound(url);
        }
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for SourceError {
    fn from(err: serde_yaml::Error) -> Self {
        SourceError::Parse(format!("YAML: {}", err))
    }
}

impl From<zip::result::ZipError> for SourceError {
    fn from(err: zip::result::ZipError) -> Self {
        SourceError::Archive(err.to_string())
    }
}
