//! Remote zip archives backing the data cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::sources::SourceError;
use crate::utils::{with_retry, HttpClient, RetryConfig};

/// A remote resource the cache can download
#[async_trait]
pub trait RemoteArchive: Send + Sync + std::fmt::Debug {
    /// Last modification time of the remote resource, when known
    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, SourceError>;

    /// Download the archive bytes
    async fn download(&self) -> Result<Vec<u8>, SourceError>;
}

/// Archive fetched over HTTP
///
/// `meta_url` points at a small sibling resource whose `Last-Modified`
/// header tracks the archive (the pubs-export feed publishes one). Without
/// it the archive URL itself is asked.
#[derive(Debug, Clone)]
pub struct HttpArchive {
    client: HttpClient,
    url: String,
    meta_url: Option<String>,
    retry: RetryConfig,
}

impl HttpArchive {
    pub fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            meta_url: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_meta_url(mut self, meta_url: impl Into<String>) -> Self {
        self.meta_url = Some(meta_url.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteArchive for HttpArchive {
    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>, SourceError> {
        let url = self.meta_url.as_deref().unwrap_or(&self.url);
        with_retry(self.retry, || self.client.last_modified(url)).await
    }

    async fn download(&self) -> Result<Vec<u8>, SourceError> {
        tracing::info!(url = %self.url, "downloading archive");
        with_retry(self.retry, || self.client.get_bytes(&self.url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_meta_url_supplies_last_modified() {
        let mut server = mockito::Server::new_async().await;
        let meta = server
            .mock("HEAD", "/pubs-export.meta")
            .with_status(200)
            .with_header("last-modified", "Wed, 01 Jan 2020 00:00:00 GMT")
            .create_async()
            .await;
        let archive = server
            .mock("GET", "/pubs-export.zip")
            .with_status(200)
            .with_body("zipdata")
            .create_async()
            .await;

        let remote = HttpArchive::new(
            HttpClient::new().unwrap(),
            format!("{}/pubs-export.zip", server.url()),
        )
        .with_meta_url(format!("{}/pubs-export.meta", server.url()))
        .with_retry(RetryConfig::no_retry());

        let modified = remote.last_modified().await.unwrap().unwrap();
        assert_eq!(modified.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert_eq!(remote.download().await.unwrap(), b"zipdata");

        meta.assert_async().await;
        archive.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_archive_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/index-v1.zip")
            .with_status(404)
            .create_async()
            .await;

        let remote = HttpArchive::new(
            HttpClient::new().unwrap(),
            format!("{}/index-v1.zip", server.url()),
        )
        .with_retry(RetryConfig::no_retry());

        assert!(remote.download().await.unwrap_err().is_not_found());
    }
}
