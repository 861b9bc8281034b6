//! Error types used to report failure in low-level binary parsing
//!
//! This module defines the primary type [`ParseError`] and the alias
//! [`ParseResult<T>`]. A `ParseError` always indicates that the byte
//! stream itself was malformed: truncated, carrying an illegal tag or
//! flag byte, or framing a payload that cannot be interpreted. Errors
//! of this class are never caused by hand-authored input; they point at
//! corrupt or mismatched wire data.

use std::error::Error;
use std::fmt::{Display, Formatter, Result};
use std::string::FromUtf8Error;

use crate::ident::IdentError;

/// Enumeration over all failure conditions of the binary reader and of
/// the wire-level interpretation performed on top of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A read would advance past the end of the buffer.
    Overrun {
        buflen: usize,
        offset: usize,
        requested: usize,
    },
    /// A byte in boolean position was neither `0xff` nor `0x00`.
    InvalidBoolean(u8),
    /// A one-byte tag was outside the discriminant range of its type.
    InvalidDiscriminant { tag: u8, limit: usize },
    /// A length prefix carried a negative element count.
    NegativeLength(i32),
    /// A length-prefixed string payload was not valid UTF-8.
    InvalidUtf8(FromUtf8Error),
    /// A string in identifier position did not parse as `namespace:path`.
    InvalidIdentifier(IdentError),
    /// Bytes remained in the buffer after a whole-buffer decode.
    TrailingBytes { residual: usize },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ParseError::Overrun {
                buflen,
                offset,
                requested,
            } => {
                write!(
                    f,
                    "cannot read {} bytes at offset {} in buffer of length {}",
                    requested, offset, buflen
                )
            }
            ParseError::InvalidBoolean(byte) => {
                write!(f, "expected boolean := (0xff | 0x00), got 0x{:02x}", byte)
            }
            ParseError::InvalidDiscriminant { tag, limit } => {
                write!(
                    f,
                    "discriminant {} out of range for type with {} variants",
                    tag, limit
                )
            }
            ParseError::NegativeLength(count) => {
                write!(f, "length prefix carried negative count {}", count)
            }
            ParseError::InvalidUtf8(err) => {
                write!(f, "string payload is not valid UTF-8: {}", err)
            }
            ParseError::InvalidIdentifier(err) => {
                write!(f, "identifier payload is malformed: {}", err)
            }
            ParseError::TrailingBytes { residual } => {
                write!(f, "decode left {} unconsumed bytes in buffer", residual)
            }
        }
    }
}

impl From<FromUtf8Error> for ParseError {
    fn from(err: FromUtf8Error) -> Self {
        Self::InvalidUtf8(err)
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::InvalidUtf8(err) => Some(err),
            ParseError::InvalidIdentifier(err) => Some(err),
            _ => None,
        }
    }
}

/// Type alias for `Result` with an error type of [`ParseError`]
pub type ParseResult<T> = std::result::Result<T, ParseError>;
