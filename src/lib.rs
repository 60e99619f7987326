//! # CinderKV
//!
//! A single-threaded, in-memory key-value server with:
//! - A progressively rehashed hash map as the primary index
//! - An order-statistic AVL tree over the same keys
//! - A length-prefixed binary request/response protocol
//! - A non-blocking readiness loop serving many clients on one thread
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Event Loop (mio Poll)                        │
//! │             listener + non-blocking clients                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ complete request frames
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                Connection State Machine                      │
//! │           (Reading ⇄ Writing, buffered, pipelined)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ argument vectors
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │                 (command dispatcher)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Progressive │          │  AVL Tree   │
//!   │  Hash Map   │          │ (key order) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hashmap;
pub mod tree;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CinderError, Result};
pub use config::Config;
pub use engine::Engine;
pub use network::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CinderKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
