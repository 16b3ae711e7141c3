//! Daemon configuration

use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "smsgate.toml";

/// Daemon configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Token decryption and response shaping
    #[serde(default)]
    pub security: SecurityConfig,

    /// Downstream SMS device
    #[serde(default)]
    pub relay: RelayConfig,

    /// Log sink
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Monitoring configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl DaemonConfig {
    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Load `path` if given, else the default file if present, else defaults
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load(DEFAULT_CONFIG_PATH).await
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Merge another config into this one
    ///
    /// Rules:
    /// - Scalar values: overwrite if the new value differs from default
    /// - Option values: overwrite if Some
    pub fn merge(&mut self, other: DaemonConfig) {
        // Server config
        if other.server.bind != default_bind() {
            self.server.bind = other.server.bind;
        }
        if other.server.route != default_route() {
            self.server.route = other.server.route;
        }

        // Security config - only if provided
        if other.security.key.is_some() {
            self.security.key = other.security.key;
        }
        if other.security.min_response_ms != 0 {
            self.security.min_response_ms = other.security.min_response_ms;
        }

        // Relay config
        if other.relay.device.is_some() {
            self.relay.device = other.relay.device;
        }
        if other.relay.baud_rate != default_baud_rate() {
            self.relay.baud_rate = other.relay.baud_rate;
        }
        if other.relay.write_timeout_ms != default_write_timeout() {
            self.relay.write_timeout_ms = other.relay.write_timeout_ms;
        }

        // Logging
        if other.logging.path.is_some() {
            self.logging.path = other.logging.path;
        }

        // Monitoring
        if other.monitoring.prometheus_bind != default_prometheus_bind() {
            self.monitoring.prometheus_bind = other.monitoring.prometheus_bind;
        }
        if other.monitoring.prometheus_enabled {
            self.monitoring.prometheus_enabled = true;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Path of the command endpoint
    #[serde(default = "default_route")]
    pub route: String,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_route() -> String {
    "/send".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            route: default_route(),
        }
    }
}

/// Security configuration
#[derive(Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Shared AES key; its UTF-8 bytes are used as-is (16, 24 or 32 bytes).
    /// Absent means insecure mode.
    #[serde(default)]
    pub key: Option<String>,

    /// Every response takes at least this long (0 disables)
    #[serde(default)]
    pub min_response_ms: u64,
}

impl SecurityConfig {
    pub fn key_bytes(&self) -> Option<&[u8]> {
        self.key.as_deref().map(str::as_bytes).filter(|k| !k.is_empty())
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("min_response_ms", &self.min_response_ms)
            .finish()
    }
}

/// Relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Serial device path (e.g. /dev/ttyUSB0). Absent disables relaying.
    #[serde(default)]
    pub device: Option<String>,

    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Serial write timeout in ms
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_write_timeout() -> u64 {
    1000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: default_baud_rate(),
            write_timeout_ms: default_write_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the log file. Absent logs to stdout.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Prometheus metrics bind address
    #[serde(default = "default_prometheus_bind")]
    pub prometheus_bind: SocketAddr,

    /// Enable Prometheus
    #[serde(default)]
    pub prometheus_enabled: bool,
}

fn default_prometheus_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9095))
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_bind: default_prometheus_bind(),
            prometheus_enabled: false,
        }
    }
}
