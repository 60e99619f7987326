//! Connection Handler
//!
//! Per-connection buffering state machine over a non-blocking stream.
//!
//! ## States
//! ```text
//!            full frame buffered,          response fully sent
//!            response staged               (then keep reading)
//!   ┌─────────┐ ───────────────▶ ┌─────────┐
//!   │ Reading │                  │ Writing │
//!   └─────────┘ ◀─────────────── └─────────┘
//!        │                            │
//!        │ EOF, I/O error,            │ I/O error
//!        │ oversized or bad frame     │
//!        ▼                            ▼
//!   ┌──────────────────────────────────────┐
//!   │                Closed                │
//!   └──────────────────────────────────────┘
//! ```
//!
//! The handler never blocks: a `WouldBlock` from the stream suspends it
//! until the event loop reports readiness again.

use std::io::{ErrorKind, Read, Write};

use mio::Interest;

use crate::config::Config;
use crate::engine::Engine;
use crate::protocol::{
    decode_request, encode_value_to_vec, peek_frame_len, Value, ERR_TOO_BIG, LEN_PREFIX_SIZE,
};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Waiting for (more of) a request frame
    Reading,

    /// A response is staged and partially sent
    Writing,

    /// Terminal; the owner drops the connection
    Closed,
}

/// Handles a single client connection
pub struct Connection<S> {
    /// Non-blocking byte stream
    stream: S,

    /// Peer address for logging
    peer_addr: String,

    state: ConnState,

    /// Frame limits (from Config)
    max_message_size: usize,
    max_args: usize,

    /// Read buffer: bytes in `consumed..filled` are not yet processed
    rbuf: Box<[u8]>,
    rbuf_consumed: usize,
    rbuf_filled: usize,

    /// Write buffer: bytes in `sent..total` are not yet written
    wbuf: Box<[u8]>,
    wbuf_sent: usize,
    wbuf_total: usize,
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an accepted, already non-blocking stream
    pub fn new(stream: S, peer_addr: impl Into<String>, config: &Config) -> Self {
        let capacity = LEN_PREFIX_SIZE + config.max_message_size;
        Self {
            stream,
            peer_addr: peer_addr.into(),
            state: ConnState::Reading,
            max_message_size: config.max_message_size,
            max_args: config.max_args,
            rbuf: vec![0u8; capacity].into_boxed_slice(),
            rbuf_consumed: 0,
            rbuf_filled: 0,
            wbuf: vec![0u8; capacity].into_boxed_slice(),
            wbuf_sent: 0,
            wbuf_total: 0,
        }
    }

    /// Make as much progress as the stream allows without blocking
    ///
    /// Call on every readiness notification. Finishes a pending write
    /// first, then answers every complete frame already buffered, then
    /// reads until the stream would block.
    pub fn handle_io(&mut self, engine: &mut Engine) {
        if self.state == ConnState::Writing {
            self.state_writing();
        }
        if self.state == ConnState::Reading {
            self.state_reading(engine);
        }
    }

    /// Readiness this connection is waiting for; `None` once closed
    pub fn interest(&self) -> Option<Interest> {
        match self.state {
            ConnState::Reading => Some(Interest::READABLE),
            ConnState::Writing => Some(Interest::WRITABLE),
            ConnState::Closed => None,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnState::Closed
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Bytes received but not yet consumed as frames
    pub fn buffered_len(&self) -> usize {
        self.rbuf_filled - self.rbuf_consumed
    }

    /// Bytes of the staged response not yet written
    pub fn pending_write_len(&self) -> usize {
        self.wbuf_total - self.wbuf_sent
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    // =========================================================================
    // Reading
    // =========================================================================

    fn state_reading(&mut self, engine: &mut Engine) {
        loop {
            while self.try_one_request(engine) {}
            if self.state != ConnState::Reading {
                return;
            }
            if !self.try_fill_buffer() {
                return;
            }
        }
    }

    /// Read once into the free tail of the buffer.
    /// Returns true if bytes arrived.
    fn try_fill_buffer(&mut self) -> bool {
        if self.rbuf_consumed > 0 {
            self.rbuf.copy_within(self.rbuf_consumed..self.rbuf_filled, 0);
            self.rbuf_filled -= self.rbuf_consumed;
            self.rbuf_consumed = 0;
        }
        // A full buffer always holds a complete frame, which was answered
        // before we got here.
        debug_assert!(self.rbuf_filled < self.rbuf.len());

        let read = loop {
            match self.stream.read(&mut self.rbuf[self.rbuf_filled..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
                Err(e) => {
                    self.log_io_error("read", &e);
                    self.close();
                    return false;
                }
            }
        };

        if read == 0 {
            if self.rbuf_filled > 0 {
                tracing::warn!(
                    "Unexpected EOF from {} with {} bytes of a partial frame",
                    self.peer_addr,
                    self.rbuf_filled
                );
            } else {
                tracing::debug!("Client {} disconnected", self.peer_addr);
            }
            self.close();
            return false;
        }

        self.rbuf_filled += read;
        tracing::trace!("Read {} bytes from {}", read, self.peer_addr);
        true
    }

    /// Answer the frame at the front of the buffer, if it is complete.
    /// Returns true if the reply went out in full and we are reading again.
    fn try_one_request(&mut self, engine: &mut Engine) -> bool {
        if self.state != ConnState::Reading {
            return false;
        }

        let pending = &self.rbuf[self.rbuf_consumed..self.rbuf_filled];
        let Some(len) = peek_frame_len(pending) else {
            return false;
        };
        if len > self.max_message_size {
            tracing::warn!(
                "Frame from {} too large: {} bytes (max {})",
                self.peer_addr,
                len,
                self.max_message_size
            );
            self.close();
            return false;
        }
        if pending.len() < LEN_PREFIX_SIZE + len {
            return false;
        }

        let payload = &pending[LEN_PREFIX_SIZE..LEN_PREFIX_SIZE + len];
        let args = match decode_request(payload, self.max_args) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                self.close();
                return false;
            }
        };
        self.rbuf_consumed += LEN_PREFIX_SIZE + len;

        let response = engine.dispatch(args);
        self.stage_response(&response);

        self.state = ConnState::Writing;
        self.state_writing();
        self.state == ConnState::Reading
    }

    /// Encode `response` behind its length prefix into the write buffer
    fn stage_response(&mut self, response: &Value) {
        let mut body = encode_value_to_vec(response);
        if body.len() > self.max_message_size {
            tracing::debug!(
                "Response to {} too big ({} bytes), replacing with error",
                self.peer_addr,
                body.len()
            );
            body = encode_value_to_vec(&Value::err(ERR_TOO_BIG, "response is too big"));
        }

        let total = LEN_PREFIX_SIZE + body.len();
        self.wbuf[..LEN_PREFIX_SIZE].copy_from_slice(&(body.len() as u32).to_le_bytes());
        self.wbuf[LEN_PREFIX_SIZE..total].copy_from_slice(&body);
        self.wbuf_sent = 0;
        self.wbuf_total = total;
    }

    // =========================================================================
    // Writing
    // =========================================================================

    fn state_writing(&mut self) {
        while self.try_flush_buffer() {}
    }

    /// Write once from the staged response.
    /// Returns true if bytes remain and the stream may take more.
    fn try_flush_buffer(&mut self) -> bool {
        let written = loop {
            match self.stream.write(&self.wbuf[self.wbuf_sent..self.wbuf_total]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
                Err(e) => {
                    self.log_io_error("write", &e);
                    self.close();
                    return false;
                }
            }
        };

        if written == 0 {
            tracing::warn!("Write to {} returned zero bytes", self.peer_addr);
            self.close();
            return false;
        }

        self.wbuf_sent += written;
        if self.wbuf_sent == self.wbuf_total {
            self.wbuf_sent = 0;
            self.wbuf_total = 0;
            self.state = ConnState::Reading;
            return false;
        }
        true
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    fn close(&mut self) {
        self.state = ConnState::Closed;
        self.rbuf_consumed = 0;
        self.rbuf_filled = 0;
        self.wbuf_sent = 0;
        self.wbuf_total = 0;
    }

    fn log_io_error(&self, op: &str, e: &std::io::Error) {
        match e.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                tracing::debug!("Client {} went away during {}: {}", self.peer_addr, op, e);
            }
            _ => tracing::warn!("Error during {} on {}: {}", op, self.peer_addr, e),
        }
    }
}
