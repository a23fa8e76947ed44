//! Fetching template files by URL

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::error::{ApiError, Error, Result};

/// Source of template bytes
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, ApiError>;
}

/// Fetches `http(s)://` URLs over the network and `file://` URLs from disk.
///
/// Neither path buffers more than `max_bytes`.
pub struct UrlFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl UrlFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { client, max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn too_large(&self, url: &str, size: u64) -> ApiError {
        warn!(%url, size, limit = self.max_bytes, "template too large");
        ApiError::TemplateTooLarge { limit: self.max_bytes }
    }

    async fn read_file(&self, url: &str, path: &str) -> std::result::Result<Vec<u8>, ApiError> {
        let fetch_error = |e: std::io::Error| ApiError::Fetch(format!("{}: {}", path, e));
        let file = tokio::fs::File::open(path).await.map_err(fetch_error)?;
        let declared = file.metadata().await.map_err(fetch_error)?.len();
        if declared > self.max_bytes {
            return Err(self.too_large(url, declared));
        }

        // Device files report no length, so the read itself is bounded too
        let mut bytes = Vec::new();
        file.take(self.max_bytes + 1).read_to_end(&mut bytes).await.map_err(fetch_error)?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(self.too_large(url, bytes.len() as u64));
        }
        Ok(bytes)
    }

    async fn download(&self, url: &str) -> std::result::Result<Vec<u8>, ApiError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ApiError::Fetch(e.to_string()))?;
        if let Some(length) = response.content_length().filter(|&len| len > self.max_bytes) {
            return Err(self.too_large(url, length));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| ApiError::Fetch(e.to_string()))? {
            let size = (bytes.len() + chunk.len()) as u64;
            if size > self.max_bytes {
                return Err(self.too_large(url, size));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait]
impl TemplateSource for UrlFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, ApiError> {
        if let Some(path) = url.strip_prefix("file://") {
            let bytes = self.read_file(url, path).await?;
            debug!(%url, size = bytes.len(), "template read from disk");
            return Ok(bytes);
        }

        if !is_remote_url(url) {
            return Err(ApiError::Fetch(format!("unsupported URL: {}", url)));
        }

        let bytes = self.download(url).await?;
        debug!(%url, size = bytes.len(), "template downloaded");
        Ok(bytes)
    }
}

/// Whether a URL is fetched over the network
pub fn is_remote_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_file_url() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"PK\x03\x04").unwrap();

        let fetcher = UrlFetcher::new(Duration::from_secs(5), 1024).unwrap();
        let url = format!("file://{}", file.path().display());
        assert_eq!(fetcher.fetch(&url).await.unwrap(), b"PK\x03\x04");
    }

    #[tokio::test]
    async fn test_fetch_file_over_limit() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 2048]).unwrap();

        let fetcher = UrlFetcher::new(Duration::from_secs(5), 1024).unwrap();
        let url = format!("file://{}", file.path().display());
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(ApiError::TemplateTooLarge { limit: 1024 })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_unbounded_device_is_cut_off() {
        let fetcher = UrlFetcher::new(Duration::from_secs(5), 4096).unwrap();
        assert!(matches!(
            fetcher.fetch("file:///dev/zero").await,
            Err(ApiError::TemplateTooLarge { limit: 4096 })
        ));
    }

    #[tokio::test]
    async fn test_fetch_errors() {
        let fetcher = UrlFetcher::new(Duration::from_secs(5), 1024).unwrap();
        assert!(matches!(fetcher.fetch("ftp://example.com/a.pptx").await, Err(ApiError::Fetch(_))));
        assert!(matches!(
            fetcher.fetch("file:///nonexistent/template.pptx").await,
            Err(ApiError::Fetch(_))
        ));
    }

    #[test]
    fn test_is_remote_url() {
        assert!(is_remote_url("https://cdn.example.com/offer.pptx"));
        assert!(is_remote_url("http://localhost/offer.pptx"));
        assert!(!is_remote_url("file:///etc/passwd"));
        assert!(!is_remote_url("ftp://example.com/a.pptx"));
    }
}
