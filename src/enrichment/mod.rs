//! Song metadata enrichment.
//!
//! New songs only carry a title and a group when they are submitted; release
//! date, lyrics and link are fetched from an external metadata service.

mod client;

pub use client::EnrichmentClient;

use crate::song_store::release_date_format;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Fields the metadata service knows about a song.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SongDetails {
    #[serde(rename = "releaseDate", with = "release_date_format")]
    pub release_date: NaiveDate,
    pub text: String,
    pub link: String,
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// The service rejected the lookup (HTTP 400), usually an unknown song.
    #[error("Metadata service rejected the request")]
    BadRequest,

    #[error("Metadata service failed with status {0}")]
    Server(StatusCode),

    #[error("Failed to reach metadata service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid metadata service response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SongEnricher: Send + Sync {
    async fn lookup(&self, group: &str, title: &str) -> Result<SongDetails, EnrichmentError>;
}
