//! TCP Server
//!
//! Single-threaded readiness loop: one poller watches the listening socket
//! and every client connection, and the engine runs each request to
//! completion on the loop thread.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{CinderError, Result};

use super::Connection;

/// Token reserved for the listening socket
const LISTENER: Token = Token(0);

/// Readiness events drained per poll
const EVENT_CAPACITY: usize = 1024;

/// Requests shutdown of a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the loop to stop; it notices within one poll timeout
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// TCP server for CinderKV
pub struct Server {
    config: Config,
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection<TcpStream>>,
    next_token: usize,
    engine: Engine,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listening socket and register it with a fresh poller
    pub fn bind(config: Config, engine: Engine) -> Result<Self> {
        config.validate()?;

        let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
            CinderError::Config(format!(
                "invalid listen address '{}': {}",
                config.listen_addr, e
            ))
        })?;

        let mut listener = TcpListener::bind(addr)
            .map_err(|e| CinderError::Network(format!("failed to bind {}: {}", addr, e)))?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        tracing::info!("Bound to {}", listener.local_addr()?);

        Ok(Self {
            config,
            poll,
            listener,
            connections: HashMap::new(),
            next_token: LISTENER.0,
            engine,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Run the event loop until shutdown is requested (blocking)
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(EVENT_CAPACITY);
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);

        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::Relaxed) {
            if let Err(e) = self.poll.poll(&mut events, Some(timeout)) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_connections(),
                    token => self.drive_connection(token),
                }
            }
        }

        tracing::info!(
            "Shutting down, dropping {} connections",
            self.connections.len()
        );
        self.connections.clear();
        Ok(())
    }

    /// Address the listener is bound to (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Number of live client connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    // =========================================================================
    // Accept
    // =========================================================================

    /// Accept until the listener would block
    fn accept_connections(&mut self) {
        loop {
            let (mut stream, peer) = match self.listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("accept() failed: {}", e);
                    return;
                }
            };

            if self.connections.len() >= self.config.max_connections {
                tracing::warn!(
                    "Rejecting {}: connection limit {} reached",
                    peer,
                    self.config.max_connections
                );
                continue;
            }

            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
            }

            let token = self.allocate_token();
            if let Err(e) = self
                .poll
                .registry()
                .register(&mut stream, token, Interest::READABLE)
            {
                tracing::warn!("Failed to register {}: {}", peer, e);
                continue;
            }

            self.connections
                .insert(token, Connection::new(stream, peer.to_string(), &self.config));
            tracing::debug!(
                "Connection established from {} ({} active)",
                peer,
                self.connections.len()
            );
        }
    }

    /// Next token not held by the listener or a live connection
    fn allocate_token(&mut self) -> Token {
        loop {
            self.next_token = self.next_token.wrapping_add(1);
            let token = Token(self.next_token);
            if token != LISTENER && !self.connections.contains_key(&token) {
                return token;
            }
        }
    }

    // =========================================================================
    // Client I/O
    // =========================================================================

    fn drive_connection(&mut self, token: Token) {
        // Events for a connection closed earlier in this batch are stale.
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        let before = conn.interest();
        conn.handle_io(&mut self.engine);

        match conn.interest() {
            None => self.close_connection(token),
            Some(interest) if Some(interest) != before => {
                if let Err(e) = self
                    .poll
                    .registry()
                    .reregister(conn.stream_mut(), token, interest)
                {
                    tracing::warn!("Failed to reregister {}: {}", conn.peer_addr(), e);
                    self.close_connection(token);
                }
            }
            Some(_) => {}
        }
    }

    fn close_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            if let Err(e) = self.poll.registry().deregister(conn.stream_mut()) {
                tracing::debug!("Failed to deregister {}: {}", conn.peer_addr(), e);
            }
            tracing::debug!(
                "Connection closed: {} ({} active)",
                conn.peer_addr(),
                self.connections.len()
            );
        }
    }
}
