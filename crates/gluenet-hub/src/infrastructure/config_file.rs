//! TOML configuration file for the hub.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8080
//! max_sessions = 256
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field is optional.  Missing fields (and missing sections) take the
//! same defaults as [`HubConfig::default`].

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use gluenet_core::protocol::messages::MAX_SESSIONS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::HubConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address: {0:?}")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address to bind the listener to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Ceiling on concurrently live sessions (at most 256).
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// `tracing` filter: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`,
    /// or a full directive such as `"gluenet_hub=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_sessions() -> usize {
    MAX_SESSIONS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Conversion ────────────────────────────────────────────────────────────────

impl FileConfig {
    /// Parses TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Serializes back to TOML text.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builds the runtime configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBindAddress`] if `bind_address` is not an IP.
    pub fn to_hub_config(&self) -> Result<HubConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.server.bind_address.clone()))?;
        Ok(HubConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            max_sessions: self.server.max_sessions,
            log_level: self.logging.level.clone(),
        })
    }
}

impl From<&HubConfig> for FileConfig {
    fn from(config: &HubConfig) -> Self {
        Self {
            server: ServerSection {
                bind_address: config.bind_addr.ip().to_string(),
                port: config.bind_addr.port(),
                max_sessions: config.max_sessions,
            },
            logging: LoggingSection {
                level: config.log_level.clone(),
            },
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`] if
/// it is not valid TOML for this schema.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FileConfig::from_toml(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
