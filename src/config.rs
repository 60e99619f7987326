//! Configuration for CinderKV
//!
//! Centralized configuration with sensible defaults.

use crate::error::{CinderError, Result};

/// Default maximum payload size of a single frame (bytes, excluding the length prefix)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

/// Default maximum number of arguments in one request
pub const DEFAULT_MAX_ARGS: usize = 1024;

/// Main configuration for a CinderKV server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Upper bound on a single poll wait (milliseconds)
    pub poll_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Max frame payload size; connection buffers hold `4 + max_message_size` bytes
    pub max_message_size: usize,

    /// Max argument count accepted in one request
    pub max_args: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:1234".to_string(),
            max_connections: 1024,
            poll_timeout_ms: 1000,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_args: DEFAULT_MAX_ARGS,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the values can actually run a server
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.is_empty() {
            return Err(CinderError::Config("listen address is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(CinderError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.poll_timeout_ms == 0 {
            return Err(CinderError::Config(
                "poll_timeout_ms must be at least 1".to_string(),
            ));
        }
        // The smallest useful frame is an argc header plus one empty argument,
        // and the size-limit error reply must itself fit.
        if self.max_message_size < 64 {
            return Err(CinderError::Config(format!(
                "max_message_size too small: {} (min 64)",
                self.max_message_size
            )));
        }
        if self.max_message_size > u32::MAX as usize {
            return Err(CinderError::Config(format!(
                "max_message_size does not fit the u32 length prefix: {}",
                self.max_message_size
            )));
        }
        if self.max_args == 0 {
            return Err(CinderError::Config("max_args must be at least 1".to_string()));
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
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the poll timeout (in milliseconds)
    pub fn poll_timeout_ms(mut self, ms: u64) -> Self {
        self.config.poll_timeout_ms = ms;
        self
    }

    /// Set the maximum frame payload size (in bytes)
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the maximum number of request arguments
    pub fn max_args(mut self, count: usize) -> Self {
        self.config.max_args = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
