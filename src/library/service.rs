//! Song library operations exposed over HTTP.

use super::error::{LibraryError, LibraryResult};
use super::verses::{extract_verses, Verse};
use crate::enrichment::SongEnricher;
use crate::song_store::{release_date_format, NewSong, Song, SongFilter, SongStore};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Body of a song creation request. Everything else comes from enrichment.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateSongRequest {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub song: String,
}

/// Partial update of a song. Missing or empty fields keep the stored value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SongPatch {
    #[serde(default, rename = "song")]
    pub title: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(
        default,
        rename = "releaseDate",
        deserialize_with = "release_date_format::option::deserialize"
    )]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Trimmed value, or `None` when nothing but whitespace was sent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SongPatch {
    fn apply(self, song: &mut Song) {
        if let Some(title) = non_blank(self.title) {
            song.title = title;
        }
        if let Some(group) = non_blank(self.group) {
            song.group = group;
        }
        if let Some(date) = self.release_date {
            song.release_date = date;
        }
        // Lyrics keep their surrounding whitespace, only blank ones are ignored.
        if let Some(text) = self.text.filter(|t| !t.trim().is_empty()) {
            song.text = text;
        }
        if let Some(link) = non_blank(self.link) {
            song.link = link;
        }
    }
}

#[derive(Clone)]
pub struct SongLibrary {
    store: Arc<dyn SongStore>,
    enricher: Arc<dyn SongEnricher>,
}

impl SongLibrary {
    pub fn new(store: Arc<dyn SongStore>, enricher: Arc<dyn SongEnricher>) -> Self {
        Self { store, enricher }
    }

    /// Looks up the song's details upstream and stores it, returning the new id.
    pub async fn create(&self, request: CreateSongRequest) -> LibraryResult<i64> {
        let group = request.group.trim();
        let title = request.song.trim();
        if group.is_empty() || title.is_empty() {
            return Err(LibraryError::InvalidInput(
                "both 'group' and 'song' are required".to_string(),
            ));
        }

        let details = self.enricher.lookup(group, title).await.map_err(|e| {
            warn!("Enrichment of '{}' by '{}' failed: {}", title, group, e);
            e
        })?;

        let new_song = NewSong {
            title: title.to_string(),
            group: group.to_string(),
            release_date: details.release_date,
            text: details.text,
            link: details.link,
        };
        let id = self.store.insert(&new_song)?;
        info!("Created song {} '{}' by '{}'", id, title, group);
        Ok(id)
    }

    pub fn list(&self, filter: &SongFilter) -> LibraryResult<Vec<Song>> {
        debug!("Listing songs with {:?}", filter);
        Ok(self.store.find(filter)?)
    }

    pub fn get(&self, id: i64) -> LibraryResult<Song> {
        Ok(self.store.find_by_id(id)?)
    }

    pub fn read_verses(&self, id: i64, start: i64, count: i64) -> LibraryResult<Vec<Verse>> {
        let song = self.store.find_by_id(id)?;
        extract_verses(&song.text, start, count)
    }

    /// Merges `patch` into the stored song and returns the result.
    pub fn update(&self, id: i64, patch: SongPatch) -> LibraryResult<Song> {
        let mut song = self.store.find_by_id(id)?;
        patch.apply(&mut song);
        self.store.update(&song)?;
        info!("Updated song {}", id);
        Ok(song)
    }

    pub fn delete(&self, id: i64) -> LibraryResult<()> {
        self.store.delete(id)?;
        info!("Deleted song {}", id);
        Ok(())
    }

    pub fn count(&self) -> LibraryResult<usize> {
        Ok(self.store.count()?)
    }
}
