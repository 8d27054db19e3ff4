use crate::traits::ThumbnailSource;
use crate::types::{CaptionerError, CandidateItem, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads asset thumbnails from the photo store API.
pub struct ThumbnailFetcher {
    client: Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl ThumbnailFetcher {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(base_url, api_key, THUMBNAIL_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("photo-captioner/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        // `join` replaces the last segment unless the base ends in a slash.
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            timeout,
        })
    }

    /// Whole-request timeout applied to every download.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn thumbnail_url(&self, item: &CandidateItem) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("api/assets/{}/thumbnail", item.id))?;
        url.query_pairs_mut().append_pair("format", "JPEG");
        Ok(url)
    }
}

#[async_trait]
impl ThumbnailSource for ThumbnailFetcher {
    async fn fetch(&self, item: &CandidateItem) -> Result<Vec<u8>> {
        let url = self.thumbnail_url(item)?;
        debug!("Fetching thumbnail: {}", url);

        let response = self
            .client
            .get(url)
            .header("x-api-key", &self.api_key)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            // Dropping the response here releases the connection.
            return Err(CaptionerError::RemoteStatus {
                status: status.as_u16(),
                body: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Fetched thumbnail for {} ({} bytes)", item.id, bytes.len());
        Ok(bytes.to_vec())
    }
}
