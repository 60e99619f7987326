//! Command definitions
//!
//! Turns a decoded argument vector into a typed command.

use thiserror::Error;

use super::value::{ERR_ARITY, ERR_BAD_ARG, ERR_UNKNOWN};
use super::Value;

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Insert or overwrite a key
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Del { key: Vec<u8> },

    /// List every key
    Keys,

    /// Health check
    Ping,

    /// Number of keys
    DbSize,

    /// Position of a key in key order
    Rank { key: Vec<u8> },

    /// Keys in order, starting `offset` positions from the first key >= `min`
    Scan {
        min: Vec<u8>,
        offset: i64,
        limit: usize,
    },
}

/// Why an argument vector is not a valid command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command")]
    Unknown,

    #[error("wrong number of arguments for '{name}': expected {expected}, got {got}")]
    Arity {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid {what}: expected an integer")]
    NotAnInteger { what: &'static str },
}

impl CommandError {
    /// Wire error code for this failure
    pub fn code(&self) -> i32 {
        match self {
            CommandError::Unknown => ERR_UNKNOWN,
            CommandError::Arity { .. } => ERR_ARITY,
            CommandError::NotAnInteger { .. } => ERR_BAD_ARG,
        }
    }

    /// The error reply sent to the client
    pub fn to_value(&self) -> Value {
        Value::err(self.code(), self.to_string())
    }
}

impl Command {
    /// Parse an argument vector; the command name is case-insensitive.
    ///
    /// Takes ownership so key and value bytes move into the command.
    pub fn parse(args: Vec<Vec<u8>>) -> std::result::Result<Command, CommandError> {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Err(CommandError::Unknown);
        };
        let rest: Vec<Vec<u8>> = args.collect();

        let name = name.to_ascii_lowercase();
        let command = match name.as_slice() {
            b"get" => {
                let [key] = expect_args::<1>("get", rest)?;
                Command::Get { key }
            }
            b"set" => {
                let [key, value] = expect_args::<2>("set", rest)?;
                Command::Set { key, value }
            }
            b"del" => {
                let [key] = expect_args::<1>("del", rest)?;
                Command::Del { key }
            }
            b"keys" => {
                expect_args::<0>("keys", rest)?;
                Command::Keys
            }
            b"ping" => {
                expect_args::<0>("ping", rest)?;
                Command::Ping
            }
            b"dbsize" => {
                expect_args::<0>("dbsize", rest)?;
                Command::DbSize
            }
            b"rank" => {
                let [key] = expect_args::<1>("rank", rest)?;
                Command::Rank { key }
            }
            b"scan" => {
                let [min, offset, limit] = expect_args::<3>("scan", rest)?;
                let offset = parse_int::<i64>(&offset, "offset")?;
                let limit = parse_int::<usize>(&limit, "limit")?;
                Command::Scan { min, offset, limit }
            }
            _ => return Err(CommandError::Unknown),
        };
        Ok(command)
    }

    /// Command name as clients spell it
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Del { .. } => "del",
            Command::Keys => "keys",
            Command::Ping => "ping",
            Command::DbSize => "dbsize",
            Command::Rank { .. } => "rank",
            Command::Scan { .. } => "scan",
        }
    }
}

fn expect_args<const N: usize>(
    name: &'static str,
    args: Vec<Vec<u8>>,
) -> std::result::Result<[Vec<u8>; N], CommandError> {
    let got = args.len();
    args.try_into().map_err(|_| CommandError::Arity {
        name,
        expected: N,
        got,
    })
}

fn parse_int<N: std::str::FromStr>(
    bytes: &[u8],
    what: &'static str,
) -> std::result::Result<N, CommandError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::NotAnInteger { what })
}
