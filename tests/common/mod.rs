//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, MUSE, STARLIGHT_TITLE};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_create_song() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.create_song(MUSE, STARLIGHT_TITLE).await;
//!     assert_eq!(response.status(), StatusCode::CREATED);
//! }
//! ```

mod client;
mod constants;
mod metadata;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
#[allow(unused_imports)]
pub use constants::*;
pub use server::TestServer;
