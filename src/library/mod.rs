mod error;
mod service;
mod verses;

pub use error::{LibraryError, LibraryResult};
pub use service::{CreateSongRequest, SongLibrary, SongPatch};
pub use verses::{extract_verses, split_verses, Verse};
