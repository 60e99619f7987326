//! Error types for CinderKV
//!
//! Provides a unified error type for all fallible operations. Misses in the
//! hash map or tree are not errors; they surface as `Option::None`.

use thiserror::Error;

/// Result type alias using CinderError
pub type Result<T> = std::result::Result<T, CinderError>;

/// Unified error type for CinderKV operations
#[derive(Debug, Error)]
pub enum CinderError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
