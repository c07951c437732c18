use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use song_library_server::config::{AppConfig, CliConfig, FileConfig};
use song_library_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use song_library_server::{EnrichmentClient, SongLibrary, SqliteSongStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite song database file, created if missing.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// The address to bind to.
    #[clap(long, default_value = "0.0.0.0")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the song metadata service queried when songs are created.
    #[clap(long)]
    pub enrichment_url: Option<String>,

    /// Timeout in seconds for metadata service requests.
    #[clap(long, default_value_t = 10)]
    pub enrichment_timeout_sec: u64,

    /// Overall deadline in seconds for handling one HTTP request.
    #[clap(long, default_value_t = 30)]
    pub request_timeout_sec: u64,

    /// How long a database statement waits on a locked database, in milliseconds.
    #[clap(long, default_value_t = 5000)]
    pub store_busy_timeout_ms: u64,

    /// Number of read-only database connections.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            host: self.host.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            enrichment_url: self.enrichment_url.clone(),
            enrichment_timeout_sec: self.enrichment_timeout_sec,
            request_timeout_sec: self.request_timeout_sec,
            store_busy_timeout_ms: self.store_busy_timeout_ms,
            read_pool_size: self.read_pool_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening song database at {:?}...", app_config.db_path);
    let store = SqliteSongStore::new(
        &app_config.db_path,
        app_config.store.read_pool_size,
        app_config.store.busy_timeout,
    )?;

    let enricher = EnrichmentClient::new(
        app_config.enrichment.url.clone(),
        app_config.enrichment.timeout_sec,
    )?;
    info!("Metadata service configured at {}", enricher.base_url());

    let library = Arc::new(SongLibrary::new(Arc::new(store), Arc::new(enricher)));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        host: app_config.host.clone(),
        port: app_config.port,
        request_timeout: Duration::from_secs(app_config.request_timeout_sec),
    };

    info!("Ready to serve at {}", app_config.bind_address());
    tokio::select! {
        result = run_server(server_config, library) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
    }
}
