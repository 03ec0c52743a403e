// Configuration types module
// Defines all configuration-related data structures

use crate::http::MatchMode;
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub etag: EtagConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Value of the `Server` response header
    pub server_name: String,
    /// Largest accepted request body in bytes
    pub max_body_size: u64,
}

/// `ETag` middleware configuration
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct EtagConfig {
    /// How `If-None-Match` is compared against computed tags
    #[serde(default)]
    pub match_mode: MatchMode,
}

/// Static asset configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AssetsConfig {
    /// Serve assets from this directory instead of the embedded set
    #[serde(default)]
    pub dir: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds a connection may stay open
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
}
