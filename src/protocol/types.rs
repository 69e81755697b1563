//! RESP (Redis Serialization Protocol) Data Types
//!
//! [`Command`] is what the client writes: always an array of bulk strings.
//! [`RespValue`] is what the server answers with.
//!
//! ## Wire Format
//!
//! Each RESP type starts with a type prefix byte and ends with CRLF:
//!
//! ```text
//! +OK\r\n                          simple string
//! -ERR unknown command\r\n         error
//! :1000\r\n                        integer
//! $5\r\nhello\r\n                  bulk string ($-1\r\n is null)
//! *2\r\n$3\r\nGET\r\n$4\r\nname\r\n   array
//! ```
//!
//! The `into_*` conversions turn a reply into the Rust type a command
//! returns, mapping error replies onto [`StoreError`].

use crate::error::{StoreError, StoreResult};
use crate::store::{KeyType, ScanPage, ScoredMember};
use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+<string>\r\n`
    SimpleString(String),

    /// `-<error message>\r\n`
    Error(String),

    /// `:<integer>\r\n`
    Integer(i64),

    /// `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string or null array
    Null,

    /// `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Serializes the value into `buf`.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => write_bulk(buf, data),
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    fn unexpected<T>(self, wanted: &str) -> StoreResult<T> {
        Err(StoreError::UnexpectedReply(format!(
            "expected {wanted}, got {self}"
        )))
    }

    /// Turns an error reply into the matching [`StoreError`].
    pub fn into_result(self) -> StoreResult<RespValue> {
        match self {
            RespValue::Error(message) => Err(error_from_reply(message)),
            other => Ok(other),
        }
    }

    /// `+OK`
    pub fn into_ok(self) -> StoreResult<()> {
        match self.into_result()? {
            RespValue::SimpleString(s) if s == "OK" => Ok(()),
            other => other.unexpected("OK"),
        }
    }

    pub fn into_int(self) -> StoreResult<i64> {
        match self.into_result()? {
            RespValue::Integer(n) => Ok(n),
            other => other.unexpected("integer"),
        }
    }

    /// Integer replies used as booleans (`1`/`0`).
    pub fn into_bool(self) -> StoreResult<bool> {
        self.into_int().map(|n| n != 0)
    }

    /// Counts and lengths. Negative integers are rejected.
    pub fn into_count(self) -> StoreResult<u64> {
        let n = self.into_int()?;
        u64::try_from(n).map_err(|_| StoreError::UnexpectedReply(format!("negative count {n}")))
    }

    /// A bulk string that may be null.
    pub fn into_opt_bytes(self) -> StoreResult<Option<Bytes>> {
        match self.into_result()? {
            RespValue::BulkString(b) => Ok(Some(b)),
            RespValue::SimpleString(s) => Ok(Some(Bytes::from(s))),
            RespValue::Null => Ok(None),
            other => other.unexpected("bulk string"),
        }
    }

    /// A bulk string that is never null.
    pub fn into_bytes(self) -> StoreResult<Bytes> {
        match self.into_opt_bytes()? {
            Some(b) => Ok(b),
            None => Err(StoreError::UnexpectedReply("unexpected null".to_string())),
        }
    }

    /// An array of bulk strings. A null array reads as empty.
    pub fn into_bytes_vec(self) -> StoreResult<Vec<Bytes>> {
        self.into_values()?
            .into_iter()
            .map(RespValue::into_bytes)
            .collect()
    }

    /// An array of nullable bulk strings (`MGET`, `HMGET`).
    pub fn into_opt_bytes_vec(self) -> StoreResult<Vec<Option<Bytes>>> {
        self.into_values()?
            .into_iter()
            .map(RespValue::into_opt_bytes)
            .collect()
    }

    /// A float sent as a bulk string.
    pub fn into_float(self) -> StoreResult<f64> {
        match self.into_opt_float()? {
            Some(f) => Ok(f),
            None => Err(StoreError::UnexpectedReply("unexpected null".to_string())),
        }
    }

    pub fn into_opt_float(self) -> StoreResult<Option<f64>> {
        match self.into_opt_bytes()? {
            Some(b) => parse_float(&b).map(Some),
            None => Ok(None),
        }
    }

    /// A flat `[field, value, field, value, ...]` array.
    pub fn into_pairs(self) -> StoreResult<Vec<(Bytes, Bytes)>> {
        let flat = self.into_bytes_vec()?;
        if flat.len() % 2 != 0 {
            return Err(StoreError::UnexpectedReply(format!(
                "odd number of elements ({}) in pair reply",
                flat.len()
            )));
        }
        let mut pairs = Vec::with_capacity(flat.len() / 2);
        let mut iter = flat.into_iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            pairs.push((k, v));
        }
        Ok(pairs)
    }

    /// A `WITHSCORES` reply.
    pub fn into_scored(self) -> StoreResult<Vec<ScoredMember>> {
        self.into_pairs()?
            .into_iter()
            .map(|(member, score)| Ok(ScoredMember::new(member, parse_float(&score)?)))
            .collect()
    }

    /// A `TYPE` reply.
    pub fn into_key_type(self) -> StoreResult<KeyType> {
        match self.into_result()? {
            RespValue::SimpleString(s) => Ok(KeyType::from_name(&s)),
            other => other.unexpected("type name"),
        }
    }

    /// A `*SCAN` reply: `[cursor, [items...]]`.
    pub fn into_scan<T>(
        self,
        items: impl FnOnce(RespValue) -> StoreResult<Vec<T>>,
    ) -> StoreResult<ScanPage<T>> {
        let mut parts = self.into_values()?;
        if parts.len() != 2 {
            return Err(StoreError::UnexpectedReply(format!(
                "scan reply has {} elements",
                parts.len()
            )));
        }
        let page = parts.pop().unwrap_or(RespValue::Null);
        let cursor = parts.pop().unwrap_or(RespValue::Null).into_bytes()?;
        let cursor = std::str::from_utf8(&cursor)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StoreError::UnexpectedReply("invalid scan cursor".to_string()))?;

        Ok(ScanPage {
            cursor,
            items: items(page)?,
        })
    }

    fn into_values(self) -> StoreResult<Vec<RespValue>> {
        match self.into_result()? {
            RespValue::Array(values) => Ok(values),
            RespValue::Null => Ok(Vec::new()),
            other => other.unexpected("array"),
        }
    }
}

fn write_line(buf: &mut Vec<u8>, prefix: u8, line: &[u8]) {
    buf.push(prefix);
    buf.extend_from_slice(line);
    buf.extend_from_slice(CRLF);
}

fn write_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

fn parse_float(bytes: &[u8]) -> StoreResult<f64> {
    let text = std::str::from_utf8(bytes).map_err(|_| StoreError::NotFloat)?;
    match text {
        "inf" | "+inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        _ => text.parse().map_err(|_| StoreError::NotFloat),
    }
}

/// Maps well-known Redis error replies onto typed errors.
fn error_from_reply(message: String) -> StoreError {
    if message.starts_with("WRONGTYPE") {
        return StoreError::WrongType;
    }
    if message.starts_with("BUSYKEY") {
        return StoreError::BusyKey;
    }
    if message.starts_with("ERR invalid expire time") {
        return StoreError::InvalidExpireTime;
    }
    match message.as_str() {
        "ERR no such key" => StoreError::NoSuchKey,
        "ERR index out of range" => StoreError::IndexOutOfRange,
        "ERR value is not an integer or out of range" | "ERR hash value is not an integer" => {
            StoreError::NotInteger
        }
        "ERR value is not a valid float" | "ERR hash value is not a float" => StoreError::NotFloat,
        "ERR increment or decrement would overflow" => StoreError::Overflow,
        "ERR timeout is out of range" | "ERR timeout is negative" => StoreError::TimeoutOutOfRange,
        "ERR bit offset is not an integer or out of range"
        | "ERR offset is out of range"
        | "ERR string exceeds maximum allowed size (proto-max-bulk-len)" => {
            StoreError::OffsetOutOfRange
        }
        _ => StoreError::Server(message),
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => write!(f, "(array of {})", values.len()),
        }
    }
}

/// A command ready to be written to the server.
///
/// # Example
///
/// ```
/// use nskv::protocol::Command;
///
/// let cmd = Command::new("SET").arg("app:users:1").arg("Ariz").arg("PX").int(500);
/// assert_eq!(cmd.name(), "SET");
/// assert!(cmd.encode().starts_with(b"*5\r\n$3\r\nSET\r\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Appends an argument, copying it.
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    /// Appends an argument that is already `Bytes`, without copying.
    pub fn bulk(mut self, arg: Bytes) -> Self {
        self.args.push(arg);
        self
    }

    /// Appends every item of `args`.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        self.args
            .extend(args.into_iter().map(|a| Bytes::copy_from_slice(a.as_ref())));
        self
    }

    pub fn int(self, n: i64) -> Self {
        self.arg(n.to_string())
    }

    pub fn uint(self, n: u64) -> Self {
        self.arg(n.to_string())
    }

    /// Appends a score or increment. Infinities become `+inf`/`-inf`.
    pub fn float(self, f: f64) -> Self {
        let text = if f == f64::INFINITY {
            "+inf".to_string()
        } else if f == f64::NEG_INFINITY {
            "-inf".to_string()
        } else {
            f.to_string()
        };
        self.arg(text)
    }

    /// Encodes the command as an array of bulk strings.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        write_line(
            buf,
            prefix::ARRAY,
            (self.args.len() + 1).to_string().as_bytes(),
        );
        write_bulk(buf, self.name.as_bytes());
        for arg in &self.args {
            write_bulk(buf, arg);
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }
}
