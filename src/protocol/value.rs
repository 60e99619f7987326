//! Response values
//!
//! The tagged value a command produces and the server sends back.

use std::fmt;

/// Error code: command name not recognised
pub const ERR_UNKNOWN: i32 = 1;

/// Error code: encoded response exceeds the frame size limit
pub const ERR_TOO_BIG: i32 = 2;

/// Error code: known command, wrong number of arguments
pub const ERR_ARITY: i32 = 3;

/// Error code: an argument could not be parsed
pub const ERR_BAD_ARG: i32 = 4;

/// Wire tags of a serialized value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Nil = 0,
    Err = 1,
    Str = 2,
    Int = 3,
    Arr = 4,
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        match byte {
            0 => Ok(Tag::Nil),
            1 => Ok(Tag::Err),
            2 => Ok(Tag::Str),
            3 => Ok(Tag::Int),
            4 => Ok(Tag::Arr),
            other => Err(other),
        }
    }
}

/// A response value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absence of a value
    Nil,

    /// Application-level failure
    Err { code: i32, message: String },

    /// Binary-safe string
    Str(Vec<u8>),

    /// Signed 64-bit integer
    Int(i64),

    /// Ordered list of values, possibly nested
    Arr(Vec<Value>),
}

impl Value {
    /// Create an error value
    pub fn err(code: i32, message: impl Into<String>) -> Self {
        Value::Err {
            code,
            message: message.into(),
        }
    }

    /// Create a string value
    pub fn str(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Str(bytes.into())
    }

    pub fn tag(&self) -> Tag {
        match self {
            Value::Nil => Tag::Nil,
            Value::Err { .. } => Tag::Err,
            Value::Str(_) => Tag::Str,
            Value::Int(_) => Tag::Int,
            Value::Arr(_) => Tag::Arr,
        }
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Value::Err { .. })
    }
}

/// Human-readable rendering used by the CLI
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "(nil)"),
            Value::Err { code, message } => write!(f, "(err) {} {}", code, message),
            Value::Str(bytes) => write!(f, "(str) {}", String::from_utf8_lossy(bytes)),
            Value::Int(n) => write!(f, "(int) {}", n),
            Value::Arr(items) => {
                writeln!(f, "(arr) len={}", items.len())?;
                for item in items {
                    writeln!(f, "{}", item)?;
                }
                write!(f, "(arr) end")
            }
        }
    }
}
