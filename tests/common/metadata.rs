//! Fake song metadata service
//!
//! Serves `GET /info?group=..&song=..` for the songs listed in `constants.rs`,
//! answering 400 for anything else.

use super::constants::*;
use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Deserialize)]
struct InfoParams {
    group: Option<String>,
    song: Option<String>,
}

const KNOWN_SONGS: &[(&str, &str, &str, &str, &str)] = &[
    (
        MUSE,
        SUPERMASSIVE_TITLE,
        SUPERMASSIVE_RELEASE_DATE,
        SUPERMASSIVE_TEXT,
        SUPERMASSIVE_LINK,
    ),
    (
        MUSE,
        STARLIGHT_TITLE,
        STARLIGHT_RELEASE_DATE,
        STARLIGHT_TEXT,
        STARLIGHT_LINK,
    ),
    (
        RADIOHEAD,
        CREEP_TITLE,
        CREEP_RELEASE_DATE,
        CREEP_TEXT,
        CREEP_LINK,
    ),
];

async fn info(Query(params): Query<InfoParams>) -> Response {
    let (Some(group), Some(song)) = (params.group, params.song) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if group == UNAVAILABLE_GROUP {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    match KNOWN_SONGS
        .iter()
        .find(|(g, s, _, _, _)| *g == group && *s == song)
    {
        Some((_, _, release_date, text, link)) => Json(json!({
            "releaseDate": release_date,
            "text": text,
            "link": link,
        }))
        .into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Starts the fake service on a random port and returns its base URL.
/// The service stops when `shutdown_rx` fires or is dropped.
pub async fn spawn_metadata_service(shutdown_rx: tokio::sync::oneshot::Receiver<()>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind metadata service");
    let port = listener
        .local_addr()
        .expect("Failed to get metadata service address")
        .port();

    tokio::spawn(async move {
        axum::serve(listener, Router::new().route("/info", get(info)))
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Metadata service failed");
    });

    format!("http://127.0.0.1:{}", port)
}
