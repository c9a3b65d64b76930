//! Precomputed identifier index hosted alongside the relaton NIST dataset.
//!
//! The index maps identifiers to document files. Documents are fetched one
//! at a time, only for rows that survive matching.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::cache::{DataCache, HttpArchive, Payload};
use crate::config::Config;
use crate::models::{NistItem, RawCandidate, SearchQuery};
use crate::output::from_yaml;
use crate::parser::ParsedRef;
use crate::sources::{DataSource, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

/// File name of the cached index archive
pub const INDEX_FILE: &str = "index-v1.zip";

/// One index entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    pub id: String,
    /// Path of the document relative to the dataset root
    pub file: String,
}

impl IndexRow {
    /// Identifier without the publisher prefix
    fn key(&self) -> &str {
        let id = self.id.trim();
        ["NIST ", "NBS "]
            .iter()
            .find_map(|prefix| id.strip_prefix(prefix))
            .unwrap_or(id)
    }
}

/// Fallback data source backed by the index
#[derive(Debug, Clone)]
pub struct IndexSource {
    cache: Arc<DataCache<Vec<IndexRow>>>,
    client: HttpClient,
    documents_url: String,
    retry: RetryConfig,
}

impl IndexSource {
    pub fn new(
        cache: Arc<DataCache<Vec<IndexRow>>>,
        client: HttpClient,
        documents_url: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            client,
            documents_url: documents_url.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config(config: &Config, client: HttpClient) -> Self {
        let remote = HttpArchive::new(client.clone(), &config.data.index_url);
        let cache = DataCache::new(
            config.data.directory.join(INDEX_FILE),
            Arc::new(remote),
            Payload::Yaml,
        );
        Self::new(Arc::new(cache), client, &config.data.documents_url)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &Arc<DataCache<Vec<IndexRow>>> {
        &self.cache
    }

    /// Absolute URL of a document listed in the index
    fn document_url(&self, file: &str) -> Result<Url, SourceError> {
        let base = format!("{}/", self.documents_url.trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|base| base.join(file.trim_start_matches('/')))
            .map_err(|e| SourceError::Parse(format!("bad document url for {}: {}", file, e)))
    }
}

#[async_trait]
impl DataSource for IndexSource {
    fn id(&self) -> &str {
        "index"
    }

    async fn candidates(&self, query: &SearchQuery) -> Result<Vec<RawCandidate>, SourceError> {
        let rows = self.cache.get().await?;

        let selected: Vec<RawCandidate> = match &query.parsed {
            ParsedRef::Structured(q) => {
                let base = q.base_ref().to_lowercase();
                rows.iter()
                    .filter(|row| row.key().to_lowercase().starts_with(&base))
                    .cloned()
                    .map(RawCandidate::IndexRow)
                    .collect()
            }
            ParsedRef::Opaque(_) => {
                let needle = query.bare_text().to_lowercase();
                rows.iter()
                    .filter(|row| !needle.is_empty() && row.id.to_lowercase().contains(&needle))
                    .cloned()
                    .map(RawCandidate::IndexRow)
                    .collect()
            }
        };

        tracing::debug!(
            query = %query.text,
            total = rows.len(),
            selected = selected.len(),
            "index lookup"
        );
        Ok(selected)
    }

    async fn materialize(&self, raw: &RawCandidate) -> Result<NistItem, SourceError> {
        match raw {
            RawCandidate::IndexRow(row) => {
                let url = self.document_url(&row.file)?;
                tracing::debug!(id = %row.id, url = %url, "fetching indexed document");
                let bytes = with_retry(self.retry, || self.client.get_bytes(url.as_str())).await?;
                let yaml = String::from_utf8(bytes)
                    .map_err(|e| SourceError::Parse(format!("{}: {}", url, e)))?;
                from_yaml(&yaml).map_err(|e| SourceError::Parse(format!("{}: {}", url, e)))
            }
            RawCandidate::Document(item) => Ok(item.as_ref().clone()),
            RawCandidate::Feed(record) => Err(SourceError::Parse(format!(
                "index cannot materialize feed record {}",
                record.docidentifier
            ))),
        }
    }
}
