use super::constants::*;
use super::metadata::spawn_metadata_service;
use song_library_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use song_library_server::{EnrichmentClient, SongLibrary, SqliteSongStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub struct TestServer {
    pub base_url: String,

    pub port: u16,

    /// Location of the server's database, for tests that reopen it.
    pub db_path: PathBuf,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    _metadata_shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_db_dir.path().join("songs.db");

        let store = SqliteSongStore::new(&db_path, 2, Duration::from_secs(5))
            .expect("Failed to open song store");

        let (metadata_shutdown_tx, metadata_shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let metadata_url = spawn_metadata_service(metadata_shutdown_rx).await;
        let enricher =
            EnrichmentClient::new(metadata_url, 5).expect("Failed to build enrichment client");

        let library = Arc::new(SongLibrary::new(Arc::new(store), Arc::new(enricher)));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            host: "127.0.0.1".to_string(),
            port,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        };

        let app = make_app(config, library);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            db_path,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
            _metadata_shutdown_tx: Some(metadata_shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self._metadata_shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
