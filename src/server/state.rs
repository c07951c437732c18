use axum::extract::FromRef;

use crate::library::SongLibrary;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSongLibrary = Arc<SongLibrary>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub library: GuardedSongLibrary,
}

impl FromRef<ServerState> for GuardedSongLibrary {
    fn from_ref(input: &ServerState) -> Self {
        input.library.clone()
    }
}
