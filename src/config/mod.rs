mod file_config;

pub use file_config::{EnrichmentConfig, FileConfig, StoreConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub enrichment_url: Option<String>,
    pub enrichment_timeout_sec: u64,
    pub request_timeout_sec: u64,
    pub store_busy_timeout_ms: u64,
    pub read_pool_size: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub request_timeout_sec: u64,
    pub enrichment: EnrichmentSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub url: String,
    pub timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub busy_timeout: Duration,
    pub read_pool_size: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let request_timeout_sec = file
            .request_timeout_sec
            .unwrap_or(cli.request_timeout_sec);

        let enrichment_file = file.enrichment.unwrap_or_default();
        let enrichment = EnrichmentSettings {
            url: enrichment_file
                .url
                .or_else(|| cli.enrichment_url.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "enrichment url must be specified via --enrichment-url or in config file"
                    )
                })?,
            timeout_sec: enrichment_file
                .timeout_sec
                .unwrap_or(cli.enrichment_timeout_sec),
        };

        let store_file = file.store.unwrap_or_default();
        let store = StoreSettings {
            busy_timeout: Duration::from_millis(
                store_file
                    .busy_timeout_ms
                    .unwrap_or(cli.store_busy_timeout_ms),
            ),
            read_pool_size: store_file.read_pool_size.unwrap_or(cli.read_pool_size),
        };
        if store.read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }

        Ok(Self {
            db_path,
            host,
            port,
            logging_level,
            request_timeout_sec,
            enrichment,
            store,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
