use crate::enrichment::EnrichmentError;
use crate::song_store::SongStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Song {0} not found")]
    NotFound(i64),

    #[error("Cannot read {count} verse(s) starting at verse {start}: the song has {available}")]
    VerseOutOfBounds {
        start: i64,
        count: i64,
        available: usize,
    },

    #[error(transparent)]
    Upstream(#[from] EnrichmentError),

    #[error("Store error: {0:#}")]
    Store(anyhow::Error),
}

impl From<SongStoreError> for LibraryError {
    fn from(err: SongStoreError) -> Self {
        match err {
            SongStoreError::InvalidFilter(msg) => LibraryError::InvalidInput(msg),
            SongStoreError::NotFound(id) => LibraryError::NotFound(id),
            SongStoreError::Database(e) => LibraryError::Store(e),
        }
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;
