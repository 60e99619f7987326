//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - One thread, one poller, non-blocking sockets
//! - Each client is a buffering state machine ([`Connection`])
//! - Commands routed through Engine

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{ConnState, Connection};
