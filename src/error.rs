//! Error types for nskv.
//!
//! Two families of failures exist:
//!
//! - [`NamespaceError`]: a Database or Table name was rejected. Raised
//!   synchronously before any store command is issued.
//! - [`StoreError`]: anything that went wrong inside, or on the way to, the
//!   key-value store. These are passed through to the caller untouched.
//!
//! [`Error`] is the union returned by the namespace layer and the facades.

use crate::protocol::ParseError;
use std::fmt;
use thiserror::Error;

/// Which kind of namespace a name was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Database,
    Table,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Database => write!(f, "database"),
            NameKind::Table => write!(f, "table"),
        }
    }
}

/// A Database or Table name failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    /// The name contains the reserved key separator.
    #[error("{kind} name {name:?} can't contain the separator {separator:?}")]
    InvalidName {
        kind: NameKind,
        name: String,
        separator: &'static str,
    },

    /// The name is longer than the maximum allowed length.
    #[error("{kind} name {name:?} is longer than {max} characters")]
    NameTooLong {
        kind: NameKind,
        name: String,
        max: usize,
    },

    /// The name is reserved for table policies.
    #[error("database name {0:?} is reserved")]
    ReservedName(String),
}

/// Failures raised by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Socket level failure talking to a remote store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A connect or command round trip exceeded its deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The remote store sent bytes that are not valid RESP.
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// The remote store rejected the command (`-ERR ...`).
    #[error("server error: {0}")]
    Server(String),

    /// The reply was valid RESP but not the shape the command expects.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The connection was closed by the peer.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The key holds a value of another type.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The value is not an integer or is out of range.
    #[error("value is not an integer or out of range")]
    NotInteger,

    /// The value is not a valid float.
    #[error("value is not a valid float")]
    NotFloat,

    /// An increment would overflow.
    #[error("increment or decrement would overflow")]
    Overflow,

    /// The key does not exist.
    #[error("no such key")]
    NoSuchKey,

    /// A list index is outside the list.
    #[error("index out of range")]
    IndexOutOfRange,

    /// An offset or length argument is outside the supported range.
    #[error("offset is out of range")]
    OffsetOutOfRange,

    /// A TTL is zero where one is required, or too large to represent.
    #[error("invalid expire time")]
    InvalidExpireTime,

    /// A blocking timeout is too large to represent.
    #[error("timeout is out of range")]
    TimeoutOutOfRange,

    /// The target key already exists (RESTORE without replace).
    #[error("target key name is busy")]
    BusyKey,

    /// A dump payload could not be decoded.
    #[error("invalid dump payload: {0}")]
    InvalidDump(#[from] serde_json::Error),

    /// The store does not implement this command.
    #[error("unsupported command: {0}")]
    Unsupported(&'static str),
}

/// Result alias for store primitives.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error returned by databases, tables and operation facades.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A typed value could not be encoded or decoded by the configured codec.
    #[error("codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result alias used throughout the namespace layer.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_error_messages() {
        let err = NamespaceError::InvalidName {
            kind: NameKind::Table,
            name: "a:b".to_string(),
            separator: ":",
        };
        assert_eq!(
            err.to_string(),
            "table name \"a:b\" can't contain the separator \":\""
        );

        let err = NamespaceError::NameTooLong {
            kind: NameKind::Database,
            name: "abcdefghijk".to_string(),
            max: 10,
        };
        assert_eq!(
            err.to_string(),
            "database name \"abcdefghijk\" is longer than 10 characters"
        );
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: Error = StoreError::Server("ERR boom".to_string()).into();
        assert_eq!(err.to_string(), "server error: ERR boom");
        assert!(matches!(err, Error::Store(StoreError::Server(_))));
    }
}
