//! Engine Module
//!
//! The key space the server exposes, and the dispatcher that runs commands
//! against it.
//!
//! ## Responsibilities
//! - Own the primary index (progressive hash map of key → value)
//! - Keep the ordered key index (AVL tree) in step with it
//! - Turn argument vectors into typed commands and commands into replies
//!
//! The engine is driven by a single thread; every command runs to
//! completion before the next one starts.

use crate::hashmap::ProgressiveMap;
use crate::protocol::{Command, Value};
use crate::tree::AvlTree;

/// One key-value pair in the primary index
#[derive(Debug)]
struct Entry {
    key: Vec<u8>,
    value: Vec<u8>,
}

/// Hash a key for the primary index (FNV-style multiply-add)
pub fn key_hash(key: &[u8]) -> u64 {
    let mut h: u64 = 0x811C_9DC5;
    for &byte in key {
        h = h.wrapping_add(byte as u64).wrapping_mul(0x0100_0193);
    }
    h
}

/// The in-memory key space
pub struct Engine {
    /// Primary index: key → value
    db: ProgressiveMap<Entry>,

    /// Every live key, in byte order
    ordered: AvlTree<Vec<u8>>,
}

impl Engine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            db: ProgressiveMap::new(),
            ordered: AvlTree::new(),
        }
    }

    /// Decode-level entry point: parse `args` and execute the command
    ///
    /// Unknown commands and bad arguments become error values; the caller
    /// always gets exactly one reply.
    pub fn dispatch(&mut self, args: Vec<Vec<u8>>) -> Value {
        match Command::parse(args) {
            Ok(command) => self.execute(command),
            Err(e) => {
                tracing::debug!("Rejected request: {}", e);
                e.to_value()
            }
        }
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&mut self, command: Command) -> Value {
        tracing::trace!("Executing {}", command.name());

        match command {
            Command::Get { key } => match self.lookup(&key) {
                Some(value) => Value::str(value),
                None => Value::Nil,
            },
            Command::Set { key, value } => {
                self.upsert(key, value);
                Value::Nil
            }
            Command::Del { key } => Value::Int(self.remove(&key) as i64),
            Command::Keys => Value::Arr(self.keys().map(Value::str).collect()),
            Command::Ping => Value::str("PONG"),
            Command::DbSize => Value::Int(self.len() as i64),
            Command::Rank { key } => match self.rank(&key) {
                Some(rank) => Value::Int(rank as i64),
                None => Value::Nil,
            },
            Command::Scan { min, offset, limit } => Value::Arr(
                self.scan(&min, offset, limit)
                    .into_iter()
                    .map(Value::str)
                    .collect(),
            ),
        }
    }

    // =========================================================================
    // Store operations
    // =========================================================================

    /// Get a value by key
    pub fn lookup(&mut self, key: &[u8]) -> Option<&[u8]> {
        self.db
            .lookup(key_hash(key), |entry| entry.key == key)
            .map(|entry| entry.value.as_slice())
    }

    /// Insert a key or replace its value in place
    ///
    /// Returns true if the key was new.
    pub fn upsert(&mut self, key: Vec<u8>, value: Vec<u8>) -> bool {
        let hcode = key_hash(&key);
        if let Some(entry) = self.db.lookup_mut(hcode, |entry| entry.key == key) {
            entry.value = value;
            return false;
        }

        self.ordered.insert(key.clone());
        self.db.insert(hcode, Entry { key, value });
        true
    }

    /// Delete a key; returns true if it existed
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let Some(entry) = self.db.pop(key_hash(key), |entry| entry.key == key) else {
            return false;
        };

        if let Some(id) = self.ordered.find(entry.key.as_slice()) {
            self.ordered.delete(id);
        }
        true
    }

    /// Every live key exactly once, in hash order
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.db.iter().map(|entry| entry.key.as_slice())
    }

    /// Zero-based position of `key` in byte order
    pub fn rank(&self, key: &[u8]) -> Option<usize> {
        let id = self.ordered.find(key)?;
        self.ordered.rank(id)
    }

    /// Up to `limit` keys in byte order, starting `offset` positions away
    /// from the first key `>= min`
    pub fn scan(&self, min: &[u8], offset: i64, limit: usize) -> Vec<&[u8]> {
        if limit == 0 {
            return Vec::new();
        }

        // A missing lower bound means `min` sorts after every key.
        let base = match self.ordered.lower_bound(min) {
            Some(id) => self.ordered.rank(id).unwrap_or(0),
            None => self.ordered.len(),
        };
        let start = i64::try_from(base)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .and_then(|target| usize::try_from(target).ok())
            .and_then(|k| self.ordered.select(k));

        match start {
            Some(id) => self
                .ordered
                .iter_from(id)
                .take(limit)
                .map(Vec::as_slice)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Whether the primary index is mid-resize
    pub fn is_resizing(&self) -> bool {
        self.db.is_resizing()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
