// Configuration module entry point
// Loads application configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    AssetsConfig, Config, EtagConfig, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Default config file, looked up without extension
pub const DEFAULT_CONFIG_PATH: &str = "hare";

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (extension optional)
    ///
    /// Environment variables override the file, e.g. `HARE_SERVER__PORT=8080`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("HARE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3200)?
            .set_default("http.server_name", "hare")?
            .set_default("http.max_body_size", 16 * 1024 * 1024)? // 16MB
            .set_default("etag.match_mode", "exact")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.http.max_body_size == 0 {
            return Err(config::ConfigError::Message(
                "http.max_body_size must be positive".to_string(),
            ));
        }
        if self.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
