//! Configuration for tyrantkv connections
//!
//! Centralized configuration with sensible defaults.
//!
//! The protocol itself has no notion of per-call deadlines; socket timeouts
//! are a property of the connection and are therefore set here, at
//! establishment time. The defaults block indefinitely, matching the stock
//! client behavior.

use std::time::Duration;

use crate::error::{Result, TyrantError};

/// Default TCP port of a Tokyo Tyrant server.
pub const DEFAULT_PORT: u16 = 1978;

/// Connection configuration for a single server endpoint
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint
    // -------------------------------------------------------------------------
    /// Server hostname or IP address
    pub host: String,

    /// Server TCP port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Socket behavior
    // -------------------------------------------------------------------------
    /// Timeout for establishing the TCP connection (None = OS default)
    pub connect_timeout: Option<Duration>,

    /// Socket read timeout; a blocking read past this fails with a timeout
    /// I/O error (None = block indefinitely)
    pub read_timeout: Option<Duration>,

    /// Socket write timeout (None = block indefinitely)
    pub write_timeout: Option<Duration>,

    /// Disable Nagle's algorithm for low request latency
    pub nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            nodelay: true,
        }
    }
}

impl Config {
    /// Config for the given endpoint with default socket behavior
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The endpoint as a `host:port` string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(TyrantError::Config("host must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server hostname or IP address
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connection-establishment timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the socket read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Set the socket write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = Some(timeout);
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
