//! Configuration management
//!
//! Server configuration loaded from TOML files with environment-variable
//! overrides, plus the read-mode controller consumed by the servers.

pub mod read_mode;

pub use read_mode::{ReadMode, ReadModeConfig};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Validation error
    #[error("configuration validation failed: {0}")]
    Validation(String),

    /// Environment variable error
    #[error("invalid environment variable: {0}")]
    EnvVar(String),
}

/// Configuration Result type
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Listen port (0 picks an ephemeral port)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Re-arm a read after every successful read completion
    #[serde(default = "default_auto_read")]
    pub auto_read: bool,

    /// Upper bound for every armed read, in seconds
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,

    /// Maximum bytes buffered while searching for a delimiter
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,

    /// Initial read-mode configuration
    #[serde(default)]
    pub read: ReadModeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            auto_read: default_auto_read(),
            read_timeout_secs: None,
            max_read_size: default_max_read_size(),
            read: ReadModeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment
    ///
    /// Supported variables:
    /// - EVENTSOCK_BIND_ADDRESS
    /// - EVENTSOCK_PORT
    /// - EVENTSOCK_AUTO_READ (true/false)
    /// - EVENTSOCK_READ_MODE (fixed_size/until_delimiter)
    /// - EVENTSOCK_READ_SIZE
    /// - EVENTSOCK_READ_DELIMITER
    /// - EVENTSOCK_READ_TIMEOUT_SECS
    /// - EVENTSOCK_MAX_READ_SIZE
    pub fn load_with_env_override(self) -> Result<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary variable lookup
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("EVENTSOCK_BIND_ADDRESS") {
            self.bind_address = addr;
        }

        if let Some(port) = lookup("EVENTSOCK_PORT") {
            self.port = parse_var("EVENTSOCK_PORT", &port, "a valid u16")?;
        }

        if let Some(auto_read) = lookup("EVENTSOCK_AUTO_READ") {
            self.auto_read = parse_var("EVENTSOCK_AUTO_READ", &auto_read, "true or false")?;
        }

        if let Some(mode) = lookup("EVENTSOCK_READ_MODE") {
            self.read.mode = mode
                .parse()
                .map_err(|e| ConfigError::EnvVar(format!("EVENTSOCK_READ_MODE: {}", e)))?;
        }

        if let Some(size) = lookup("EVENTSOCK_READ_SIZE") {
            self.read.size = parse_var("EVENTSOCK_READ_SIZE", &size, "a valid usize")?;
        }

        if let Some(delimiter) = lookup("EVENTSOCK_READ_DELIMITER") {
            self.read.delimiter = unescape_delimiter(&delimiter);
        }

        if let Some(secs) = lookup("EVENTSOCK_READ_TIMEOUT_SECS") {
            self.read_timeout_secs = Some(parse_var(
                "EVENTSOCK_READ_TIMEOUT_SECS",
                &secs,
                "a valid u64",
            )?);
        }

        if let Some(max) = lookup("EVENTSOCK_MAX_READ_SIZE") {
            self.max_read_size = parse_var("EVENTSOCK_MAX_READ_SIZE", &max, "a valid usize")?;
        }

        Ok(self)
    }

    /// Load from a file, then apply environment overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file(path)?.load_with_env_override()
    }

    /// Check the configuration for values no server can run with
    pub fn validate(&self) -> Result<()> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::Validation("bind address must not be empty".to_string()));
        }

        if self.read.size == 0 {
            return Err(ConfigError::Validation("read size must not be 0".to_string()));
        }

        if self.max_read_size == 0 {
            return Err(ConfigError::Validation("max read size must not be 0".to_string()));
        }

        if self.max_read_size < self.read.delimiter.len() {
            return Err(ConfigError::Validation(
                "max read size is smaller than the delimiter".to_string(),
            ));
        }

        if self.read_timeout_secs == Some(0) {
            return Err(ConfigError::Validation("read timeout must not be 0".to_string()));
        }

        Ok(())
    }

    /// Full bind address string
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Read timeout as a duration
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "EventSock server configuration:\n  address: {}\n  auto read: {}\n  read mode: {} (size {}, delimiter {:?})\n  read timeout: {:?}\n  max read size: {}",
            self.bind_addr(),
            self.auto_read,
            self.read.mode,
            self.read.size,
            self.read.delimiter,
            self.read_timeout_secs,
            self.max_read_size
        )
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVar(format!("{} must be {}", key, expected)))
}

// Shell environments cannot easily carry raw control characters.
fn unescape_delimiter(raw: &str) -> String {
    raw.replace("\\r", "\r").replace("\\n", "\n").replace("\\t", "\t")
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_auto_read() -> bool {
    true
}

fn default_max_read_size() -> usize {
    64 * 1024
}
