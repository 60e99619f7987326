//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! Every message in either direction is one frame:
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │         Payload             │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! A request payload is an argument vector; a response payload is one
//! tagged value. See [`codec`] for the byte layouts.
//!
//! ### Commands
//! - `get key`, `set key value`, `del key`, `keys`
//! - `ping`, `dbsize`
//! - `rank key`, `scan min offset limit` (ordered key index)
//!
//! ### Error Codes
//! - 1: unknown command
//! - 2: response too big
//! - 3: wrong number of arguments
//! - 4: unparseable argument

mod command;
mod value;
pub mod codec;
#[cfg(test)]
mod codec_proptest;

pub use codec::{
    decode_request, decode_value, encode_frame, encode_request, encode_value,
    encode_value_to_vec, peek_frame_len, read_frame, read_response, write_frame, write_request,
    LEN_PREFIX_SIZE,
};
pub use command::{Command, CommandError};
pub use value::{Tag, Value, ERR_ARITY, ERR_BAD_ARG, ERR_TOO_BIG, ERR_UNKNOWN};
