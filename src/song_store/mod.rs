mod models;
mod query;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use query::{build_filter_query, FilterQuery};
pub use schema::SONG_LIBRARY_VERSIONED_SCHEMAS;
pub use store::SqliteSongStore;
pub use trait_def::{SongStore, SongStoreError, SongStoreResult};
