//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `webthing.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Which things are served, and how.
    pub things: ThingsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Path prefix of every route, e.g. `/things`. Empty for `/`.
    pub base_path: String,
    /// Public host name clients use to reach the server.
    pub hostname: Option<String>,
    /// Accept any `Host` header. Exposes the server to DNS rebinding.
    pub disable_host_validation: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Served things.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThingsConfig {
    pub mode: ThingsMode,
    /// Server name advertised when several things are served.
    pub name: String,
    /// Events kept per thing; unbounded when absent.
    pub event_history_limit: Option<usize>,
}

/// Whether the server hosts the lamp alone or every virtual thing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThingsMode {
    Single,
    #[default]
    Multiple,
}

impl Config {
    /// Load configuration from `webthing.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("webthing.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WEBTHING_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("WEBTHING_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("WEBTHING_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("WEBTHING_BASE_PATH") {
            self.server.base_path = val;
        }
        if let Ok(val) = std::env::var("WEBTHING_HOSTNAME") {
            self.server.hostname = Some(val);
        }
        if let Ok(val) = std::env::var("WEBTHING_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if !self.server.base_path.is_empty() && !self.server.base_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "base_path must start with '/'".to_string(),
            ));
        }
        if self.things.event_history_limit == Some(0) {
            return Err(ConfigError::Validation(
                "event_history_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            base_path: String::new(),
            hostname: None,
            disable_host_validation: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "webthingd=info,webthing=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ThingsConfig {
    fn default() -> Self {
        Self {
            mode: ThingsMode::default(),
            name: "LightAndHumidityDevice".to_string(),
            event_history_limit: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
