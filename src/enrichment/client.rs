//! HTTP client for the external song metadata service.

use super::{EnrichmentError, SongDetails, SongEnricher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub struct EnrichmentClient {
    client: reqwest::Client,
    base_url: String,
}

impl EnrichmentClient {
    /// Create a new enrichment client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the metadata service (e.g., "http://localhost:8081")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn info_url(&self) -> String {
        format!("{}/info", self.base_url)
    }
}

#[async_trait]
impl SongEnricher for EnrichmentClient {
    async fn lookup(&self, group: &str, title: &str) -> Result<SongDetails, EnrichmentError> {
        debug!("Looking up details for '{}' by '{}'", title, group);
        let response = self
            .client
            .get(self.info_url())
            .query(&[("group", group), ("song", title)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => return Err(EnrichmentError::BadRequest),
            status => return Err(EnrichmentError::Server(status)),
        }

        response
            .json::<SongDetails>()
            .await
            .map_err(|e| EnrichmentError::Decode(e.to_string()))
    }
}
