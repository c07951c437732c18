//! Song Library Server Library
//!
//! This library exposes the internal modules for the binaries and the end-to-end tests.

pub mod config;
pub mod enrichment;
pub mod library;
pub mod server;
pub mod song_store;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use enrichment::{EnrichmentClient, SongEnricher};
pub use library::SongLibrary;
pub use server::{run_server, RequestsLoggingLevel};
pub use song_store::{SongStore, SqliteSongStore};
