//! SongStore trait definition.

use super::models::{NewSong, Song, SongFilter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SongStoreError {
    /// The filter was rejected before reaching the database.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Song {0} not found")]
    NotFound(i64),

    #[error("Database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for SongStoreError {
    fn from(err: rusqlite::Error) -> Self {
        SongStoreError::Database(err.into())
    }
}

pub type SongStoreResult<T> = Result<T, SongStoreError>;

/// Persistence for song records.
///
/// Implementations are shared across request handlers, so every method takes
/// `&self` and must be safe to call concurrently.
pub trait SongStore: Send + Sync {
    /// Returns all songs matching `filter`, ordered by id.
    fn find(&self, filter: &SongFilter) -> SongStoreResult<Vec<Song>>;

    fn find_by_id(&self, id: i64) -> SongStoreResult<Song>;

    /// Stores a new song and returns the id assigned to it.
    fn insert(&self, song: &NewSong) -> SongStoreResult<i64>;

    /// Overwrites every field of the song with the same id.
    fn update(&self, song: &Song) -> SongStoreResult<()>;

    fn delete(&self, id: i64) -> SongStoreResult<()>;

    /// Number of stored songs.
    fn count(&self) -> SongStoreResult<usize>;
}
