//! HTTP client utilities.

use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client honoring the configured timeout and user agent
    pub fn from_config(config: &HttpConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and return the body.
    ///
    /// A 404 maps to [`SourceError::NotFound`], other non-success statuses to
    /// [`SourceError::Network`].
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(url).send().await?;
        let response = check_status(url, response)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Read the `Last-Modified` header of `url` with a HEAD request.
    ///
    /// Returns `None` when the header is missing or unparseable.
    pub async fn last_modified(&self, url: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
        let response = self.client.head(url).send().await?;
        let response = check_status(url, response)?;
        let modified = response
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok(modified)
    }
}

fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(url.to_string()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimit);
    }
    if !status.is_success() {
        return Err(SourceError::Network(format!("{} returned {}", url, status)));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_bytes_and_not_found() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/data.bin")
            .with_status(200)
            .with_body("payload")
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let body = client
            .get_bytes(&format!("{}/data.bin", server.url()))
            .await
            .unwrap();
        assert_eq!(body, b"payload");

        let err = client
            .get_bytes(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));

        ok.assert_async().await;
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn test_last_modified_header() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/feed.meta")
            .with_status(200)
            .with_header("last-modified", "Tue, 10 Jul 2018 08:00:00 GMT")
            .create_async()
            .await;
        server
            .mock("HEAD", "/plain.meta")
            .with_status(200)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let modified = client
            .last_modified(&format!("{}/feed.meta", server.url()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(modified.to_rfc3339(), "2018-07-10T08:00:00+00:00");

        let none = client
            .last_modified(&format!("{}/plain.meta", server.url()))
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
