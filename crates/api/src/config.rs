//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3001`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs against a seeded in-memory store
/// - `COMPLAINTS_SERVICE_URL`: base URL of the complaints service
///   (default: `"http://complaints-service:3002"`)
/// - `COMPLAINTS_UPDATE_PATH`: username update endpoint on that service
///   (default: `"/api/internal/update-assignee-username"`)
/// - `REMOTE_TIMEOUT_SECS`: timeout of every downstream call (default: `5`)
/// - `STEP_TIMEOUT_SECS`: upper bound of every saga step and compensation,
///   local or remote (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub complaints_service_url: String,
    pub complaints_update_path: String,
    pub remote_timeout: Duration,
    pub step_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            complaints_service_url: lookup("COMPLAINTS_SERVICE_URL")
                .unwrap_or(defaults.complaints_service_url),
            complaints_update_path: lookup("COMPLAINTS_UPDATE_PATH")
                .unwrap_or(defaults.complaints_update_path),
            remote_timeout: parse_secs(lookup("REMOTE_TIMEOUT_SECS"))
                .unwrap_or(defaults.remote_timeout),
            step_timeout: parse_secs(lookup("STEP_TIMEOUT_SECS")).unwrap_or(defaults.step_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            complaints_service_url: "http://complaints-service:3002".to_string(),
            complaints_update_path: "/api/internal/update-assignee-username".to_string(),
            remote_timeout: saga::services::DEFAULT_REMOTE_TIMEOUT,
            step_timeout: Duration::from_secs(10),
        }
    }
}

/// Parses a positive number of seconds.
fn parse_secs(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
