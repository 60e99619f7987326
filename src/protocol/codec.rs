//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol. All integers are
//! little-endian.
//!
//! ## Wire Format
//!
//! ### Frame
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │         Payload             │   Len excludes itself
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Request Payload
//! ```text
//! ┌──────────┬──────────┬─────────┬──────────┬─────────┬─────
//! │ Argc (4) │ Len (4)  │  Arg 0  │ Len (4)  │  Arg 1  │ ...
//! └──────────┴──────────┴─────────┴──────────┴─────────┴─────
//! ```
//!
//! ### Response Payload
//! ```text
//! Nil:  ┌─────────┐
//!       │ 0x00    │
//!       └─────────┘
//! Err:  ┌─────────┬───────────┬──────────┬───────────┐
//!       │ 0x01    │ Code (4)  │ Len (4)  │ Message   │
//!       └─────────┴───────────┴──────────┴───────────┘
//! Str:  ┌─────────┬──────────┬───────────┐
//!       │ 0x02    │ Len (4)  │ Bytes     │
//!       └─────────┴──────────┴───────────┘
//! Int:  ┌─────────┬───────────┐
//!       │ 0x03    │ i64 (8)   │
//!       └─────────┴───────────┘
//! Arr:  ┌─────────┬──────────┬──────────────────────────┐
//!       │ 0x04    │ Count (4)│ Count tagged values ...  │
//!       └─────────┴──────────┴──────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use super::{Tag, Value};
use crate::error::{CinderError, Result};

/// Size of the frame length prefix
pub const LEN_PREFIX_SIZE: usize = 4;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode an argument vector into a request payload
///
/// Format: argc (4) + (len (4) + bytes) per argument
pub fn encode_request<A: AsRef<[u8]>>(args: &[A]) -> Vec<u8> {
    let body: usize = args.iter().map(|a| 4 + a.as_ref().len()).sum();
    let mut payload = Vec::with_capacity(4 + body);

    payload.put_u32_le(args.len() as u32);
    for arg in args {
        let arg = arg.as_ref();
        payload.put_u32_le(arg.len() as u32);
        payload.put_slice(arg);
    }
    payload
}

/// Decode a request payload into its argument vector
///
/// The payload must hold exactly `argc` arguments: a short record or
/// trailing bytes after the last argument is an error.
pub fn decode_request(payload: &[u8], max_args: usize) -> Result<Vec<Vec<u8>>> {
    let mut buf = payload;

    if buf.remaining() < 4 {
        return Err(CinderError::Protocol(format!(
            "Request too short for argument count: {} bytes",
            buf.remaining()
        )));
    }
    let argc = buf.get_u32_le() as usize;
    if argc > max_args {
        return Err(CinderError::Protocol(format!(
            "Too many arguments: {} (max {})",
            argc, max_args
        )));
    }

    let mut args = Vec::with_capacity(argc);
    for index in 0..argc {
        if buf.remaining() < 4 {
            return Err(CinderError::Protocol(format!(
                "Argument {}: missing length",
                index
            )));
        }
        let len = buf.get_u32_le() as usize;
        if buf.remaining() < len {
            return Err(CinderError::Protocol(format!(
                "Argument {}: incomplete (expected {}, got {})",
                index,
                len,
                buf.remaining()
            )));
        }
        args.push(buf[..len].to_vec());
        buf.advance(len);
    }

    if buf.has_remaining() {
        return Err(CinderError::Protocol(format!(
            "Trailing bytes after {} arguments: {}",
            argc,
            buf.remaining()
        )));
    }
    Ok(args)
}

// =============================================================================
// Value Encoding/Decoding
// =============================================================================

/// Append the serialized form of `value` to `out`
pub fn encode_value<B: BufMut>(value: &Value, out: &mut B) {
    out.put_u8(value.tag() as u8);
    match value {
        Value::Nil => {}
        Value::Err { code, message } => {
            out.put_i32_le(*code);
            out.put_u32_le(message.len() as u32);
            out.put_slice(message.as_bytes());
        }
        Value::Str(bytes) => {
            out.put_u32_le(bytes.len() as u32);
            out.put_slice(bytes);
        }
        Value::Int(n) => out.put_i64_le(*n),
        Value::Arr(items) => {
            out.put_u32_le(items.len() as u32);
            for item in items {
                encode_value(item, out);
            }
        }
    }
}

/// Serialize a value into a fresh buffer
pub fn encode_value_to_vec(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_value(value, &mut out);
    out
}

/// Decode one value from the front of `bytes`
///
/// Returns the value and the exact number of bytes it occupied. Trailing
/// bytes are left for the caller. An error message that is not UTF-8 is a
/// decode failure.
pub fn decode_value(bytes: &[u8]) -> Result<(Value, usize)> {
    let mut buf = bytes;
    let value = decode_value_from(&mut buf)?;
    Ok((value, bytes.len() - buf.len()))
}

fn decode_value_from(buf: &mut &[u8]) -> Result<Value> {
    let tag_byte = take_u8(buf, "tag")?;
    let tag = Tag::try_from(tag_byte).map_err(|byte| {
        CinderError::Protocol(format!("Unknown value tag: 0x{:02x}", byte))
    })?;

    match tag {
        Tag::Nil => Ok(Value::Nil),
        Tag::Err => {
            let code = take_i32(buf, "error code")?;
            let message = String::from_utf8(take_bytes(buf, "error message")?).map_err(|e| {
                CinderError::Protocol(format!("Error message is not valid UTF-8: {}", e))
            })?;
            Ok(Value::Err { code, message })
        }
        Tag::Str => Ok(Value::Str(take_bytes(buf, "string")?)),
        Tag::Int => {
            ensure(buf, 8, "integer")?;
            Ok(Value::Int(buf.get_i64_le()))
        }
        Tag::Arr => {
            let count = take_u32(buf, "array count")? as usize;
            // Every element needs at least its tag byte.
            ensure(buf, count, "array elements")?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_value_from(buf)?);
            }
            Ok(Value::Arr(items))
        }
    }
}

fn ensure(buf: &&[u8], needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(CinderError::Protocol(format!(
            "Truncated {}: need {} bytes, have {}",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn take_u8(buf: &mut &[u8], what: &str) -> Result<u8> {
    ensure(buf, 1, what)?;
    Ok(buf.get_u8())
}

fn take_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32_le())
}

fn take_i32(buf: &mut &[u8], what: &str) -> Result<i32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_i32_le())
}

fn take_bytes(buf: &mut &[u8], what: &str) -> Result<Vec<u8>> {
    let len = take_u32(buf, what)? as usize;
    ensure(buf, len, what)?;
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

// =============================================================================
// Framing
// =============================================================================

/// Prefix a payload with its 4-byte length
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(LEN_PREFIX_SIZE + payload.len());
    frame.put_u32_le(payload.len() as u32);
    frame.put_slice(payload);
    frame
}

/// Read the declared payload length at the front of `bytes`, if present
pub fn peek_frame_len(bytes: &[u8]) -> Option<usize> {
    let prefix: [u8; LEN_PREFIX_SIZE] = bytes.get(..LEN_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_le_bytes(prefix) as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one frame's payload from a blocking stream
pub fn read_frame<R: Read>(reader: &mut R, max_message_size: usize) -> Result<Vec<u8>> {
    let mut prefix = [0u8; LEN_PREFIX_SIZE];
    reader.read_exact(&mut prefix)?;

    let len = u32::from_le_bytes(prefix) as usize;
    if len > max_message_size {
        return Err(CinderError::FrameTooLarge {
            len,
            max: max_message_size,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Write one frame to a blocking stream
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    writer.write_all(&encode_frame(payload))?;
    writer.flush()?;
    Ok(())
}

/// Send an argument vector as one request frame
pub fn write_request<W: Write, A: AsRef<[u8]>>(writer: &mut W, args: &[A]) -> Result<()> {
    write_frame(writer, &encode_request(args))
}

/// Receive one response frame and decode its value
///
/// The value must fill the whole payload.
pub fn read_response<R: Read>(reader: &mut R, max_message_size: usize) -> Result<Value> {
    let payload = read_frame(reader, max_message_size)?;
    let (value, consumed) = decode_value(&payload)?;
    if consumed != payload.len() {
        return Err(CinderError::Protocol(format!(
            "Trailing bytes after response value: {}",
            payload.len() - consumed
        )));
    }
    Ok(value)
}
