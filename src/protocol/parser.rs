//! Incremental RESP Reply Parser
//!
//! Replies arrive from the socket in arbitrary chunks. The parser is handed
//! whatever has been buffered so far and returns one of:
//!
//! - `Ok(Some((value, consumed)))`: a complete reply, `consumed` bytes long
//! - `Ok(None)`: the reply is incomplete, read more and try again
//! - `Err(ParseError)`: the peer is not speaking RESP
//!
//! Nothing is consumed on `Ok(None)`, so the caller simply appends to its
//! buffer and calls again.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// A length or integer line is not a valid integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string or error message
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, nesting too deep)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A bulk string is larger than any server is allowed to send
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Parses server replies.
///
/// # Example
///
/// ```
/// use nskv::protocol::{RespParser, RespValue};
///
/// let mut parser = RespParser::new();
/// let (value, consumed) = parser.parse(b":42\r\n").unwrap().unwrap();
/// assert_eq!(value, RespValue::Integer(42));
/// assert_eq!(consumed, 5);
///
/// assert!(parser.parse(b"$5\r\nhel").unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one reply from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match first {
            prefix::SIMPLE_STRING => Ok(parse_line(buf)?
                .map(|(line, used)| (RespValue::SimpleString(line.to_string()), used))),
            prefix::ERROR => {
                Ok(parse_line(buf)?.map(|(line, used)| (RespValue::Error(line.to_string()), used)))
            }
            prefix::INTEGER => Ok(parse_header(buf)?.map(|(n, used)| (RespValue::Integer(n), used))),
            prefix::BULK_STRING => parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some((count, mut consumed)) = parse_header(buf)? else {
            return Ok(None);
        };

        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        // Every element takes at least 3 bytes, so a huge count with a short
        // buffer is merely incomplete; don't preallocate for it.
        let mut elements = Vec::with_capacity((count as usize).min(1024));

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => {
                    self.depth -= 1;
                    return Ok(None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// `$<len>\r\n<data>\r\n` or `$-1\r\n`
fn parse_bulk_string(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some((length, data_start)) = parse_header(buf)? else {
        return Ok(None);
    };

    if length == -1 {
        return Ok(Some((RespValue::Null, data_start)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let data_end = data_start + length;
    if buf.len() < data_end + 2 {
        return Ok(None);
    }
    if &buf[data_end..data_end + 2] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[data_start..data_end]);
    Ok(Some((RespValue::BulkString(data), data_end + 2)))
}

/// Reads the text after the prefix byte up to CRLF.
fn parse_line(buf: &[u8]) -> ParseResult<Option<(&str, usize)>> {
    let Some(pos) = find_crlf(&buf[1..]) else {
        return Ok(None);
    };
    let line = std::str::from_utf8(&buf[1..1 + pos])
        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    Ok(Some((line, 1 + pos + 2)))
}

/// Reads the integer after the prefix byte up to CRLF.
fn parse_header(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let Some((line, used)) = parse_line(buf)? else {
        return Ok(None);
    };
    let n = line
        .parse()
        .map_err(|_| ParseError::InvalidInteger(line.to_string()))?;
    Ok(Some((n, used)))
}

/// Finds the position of the first CRLF in `buf`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single complete reply.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
