use super::RequestsLoggingLevel;
use std::time::Duration;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub host: String,
    pub port: u16,
    /// Upper bound for handling a single request, enrichment included.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            host: "0.0.0.0".to_string(),
            port: 3001,
            request_timeout: Duration::from_secs(30),
        }
    }
}
