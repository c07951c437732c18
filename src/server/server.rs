use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{error, info};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;

use super::{log_requests, state::*, ServerConfig};
use crate::library::{CreateSongRequest, LibraryError, SongPatch};
use crate::song_store::{parse_release_date, SongFilter};
use std::time::Instant;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct CreatedSong {
    id: i64,
}

/// Listing filter as it arrives in the query string. Empty values are ignored.
#[derive(Deserialize, Debug, Default)]
struct ListSongsParams {
    song: Option<String>,
    group: Option<String>,
    #[serde(alias = "releaseDate")]
    release_date: Option<String>,
    text: Option<String>,
    link: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parses an integer query value, falling back to `default` when it is missing or empty.
fn parse_number(name: &str, value: Option<String>, default: i64) -> Result<i64, LibraryError> {
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            LibraryError::InvalidInput(format!("{} must be an integer, got '{}'", name, raw))
        }),
    }
}

impl TryFrom<ListSongsParams> for SongFilter {
    type Error = LibraryError;

    fn try_from(params: ListSongsParams) -> Result<Self, Self::Error> {
        let release_date = match non_empty(params.release_date) {
            Some(raw) => Some(parse_release_date(&raw).ok_or_else(|| {
                LibraryError::InvalidInput(format!(
                    "invalid release date '{}', expected DD.MM.YYYY",
                    raw
                ))
            })?),
            None => None,
        };

        Ok(SongFilter {
            title: non_empty(params.song),
            group: non_empty(params.group),
            release_date,
            text: non_empty(params.text),
            link: non_empty(params.link),
            limit: parse_number("limit", params.limit, 0)?,
            offset: parse_number("offset", params.offset, 0)?,
        })
    }
}

/// Verse window as it arrives in the query string; both ends default to 1.
#[derive(Deserialize, Debug, Default)]
struct VerseWindowParams {
    start: Option<String>,
    count: Option<String>,
}

impl VerseWindowParams {
    fn resolve(self) -> Result<(i64, i64), LibraryError> {
        Ok((
            parse_number("start", self.start, 1)?,
            parse_number("count", self.count, 1)?,
        ))
    }
}

impl IntoResponse for LibraryError {
    fn into_response(self) -> Response {
        let status = match &self {
            LibraryError::InvalidInput(_) | LibraryError::VerseOutOfBounds { .. } => {
                StatusCode::BAD_REQUEST
            }
            LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
            LibraryError::Upstream(crate::enrichment::EnrichmentError::BadRequest) => {
                StatusCode::BAD_REQUEST
            }
            LibraryError::Upstream(_) => StatusCode::BAD_GATEWAY,
            LibraryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// Extractor rejections are turned into `InvalidInput` so every error body is JSON.

type SongIdPath = Result<Path<i64>, PathRejection>;

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, LibraryError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| LibraryError::InvalidInput(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, LibraryError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| LibraryError::InvalidInput(rejection.body_text()))
}

fn song_id(path: SongIdPath) -> Result<i64, LibraryError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| LibraryError::InvalidInput(rejection.body_text()))
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(stats)
}

async fn create_song(
    State(library): State<GuardedSongLibrary>,
    body: Result<Json<CreateSongRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match library.create(request).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedSong { id })).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_songs(
    State(library): State<GuardedSongLibrary>,
    query: Result<Query<ListSongsParams>, QueryRejection>,
) -> Response {
    let result = query_params(query)
        .and_then(SongFilter::try_from)
        .and_then(|filter| library.list(&filter));
    match result {
        Ok(songs) => Json(songs).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_song_verses(
    State(library): State<GuardedSongLibrary>,
    path: SongIdPath,
    query: Result<Query<VerseWindowParams>, QueryRejection>,
) -> Response {
    let result = song_id(path).and_then(|id| {
        let (start, count) = query_params(query)?.resolve()?;
        library.read_verses(id, start, count)
    });
    match result {
        Ok(verses) => Json(verses).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_song_details(State(library): State<GuardedSongLibrary>, path: SongIdPath) -> Response {
    match song_id(path).and_then(|id| library.get(id)) {
        Ok(song) => Json(song).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn patch_song(
    State(library): State<GuardedSongLibrary>,
    path: SongIdPath,
    body: Result<Json<SongPatch>, JsonRejection>,
) -> Response {
    let result = song_id(path).and_then(|id| library.update(id, json_body(body)?));
    match result {
        Ok(song) => Json(song).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_song(State(library): State<GuardedSongLibrary>, path: SongIdPath) -> Response {
    match song_id(path).and_then(|id| library.delete(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

impl ServerState {
    fn new(config: ServerConfig, library: GuardedSongLibrary) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            library,
        }
    }
}

pub fn make_app(config: ServerConfig, library: GuardedSongLibrary) -> Router {
    let state = ServerState::new(config.clone(), library);

    let song_routes: Router = Router::new()
        .route("/", get(list_songs).post(create_song))
        .route(
            "/{id}",
            get(get_song_verses).patch(patch_song).delete(delete_song),
        )
        .route("/{id}/details", get(get_song_details))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/songs", song_routes)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(config: ServerConfig, library: GuardedSongLibrary) -> Result<()> {
    let address = format!("{}:{}", config.host, config.port);
    let app = make_app(config, library);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    Ok(axum::serve(listener, app).await?)
}
