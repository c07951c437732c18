//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all song library endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Songs
    // ========================================================================

    pub async fn create_song(&self, group: &str, song: &str) -> Response {
        self.client
            .post(format!("{}/songs", self.base_url))
            .json(&json!({ "group": group, "song": song }))
            .send()
            .await
            .expect("Create song request failed")
    }

    /// Creates a song and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the server does not answer 201 (indicates test setup problem).
    pub async fn create_song_ok(&self, group: &str, song: &str) -> i64 {
        let response = self.create_song(group, song).await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "Creating '{}' by '{}' failed",
            song,
            group
        );
        let body: Value = response.json().await.expect("Invalid create response");
        body["id"].as_i64().expect("Create response without id")
    }

    /// Lists songs; `query` pairs are passed through verbatim.
    pub async fn list_songs(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/songs", self.base_url))
            .query(query)
            .send()
            .await
            .expect("List songs request failed")
    }

    pub async fn get_verses(&self, id: i64, start: Option<i64>, count: Option<i64>) -> Response {
        let mut query = Vec::new();
        if let Some(start) = start {
            query.push(("start", start.to_string()));
        }
        if let Some(count) = count {
            query.push(("count", count.to_string()));
        }
        self.client
            .get(format!("{}/songs/{}", self.base_url, id))
            .query(&query)
            .send()
            .await
            .expect("Get verses request failed")
    }

    pub async fn get_song_details(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/songs/{}/details", self.base_url, id))
            .send()
            .await
            .expect("Get song details request failed")
    }

    pub async fn patch_song(&self, id: i64, body: Value) -> Response {
        self.client
            .patch(format!("{}/songs/{}", self.base_url, id))
            .json(&body)
            .send()
            .await
            .expect("Patch song request failed")
    }

    pub async fn delete_song(&self, id: i64) -> Response {
        self.client
            .delete(format!("{}/songs/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete song request failed")
    }
}
