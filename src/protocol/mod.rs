//! RESP Client Protocol
//!
//! The remote [`Store`](crate::store::Store) implementation. Commands are
//! encoded as RESP arrays of bulk strings, replies are parsed incrementally
//! from the socket and converted into typed results.
//!
//! ## Modules
//!
//! - `types`: `RespValue` replies, the `Command` builder and reply conversions
//! - `parser`: incremental reply parser
//! - `client`: `RespClient`, a `Store` over a single TCP connection
//!
//! ## Example
//!
//! ```
//! use nskv::protocol::{parse_message, Command, RespValue};
//!
//! let wire = Command::new("GET").arg("app:users:1").encode();
//! assert!(wire.starts_with(b"*2\r\n"));
//!
//! let (reply, _) = parse_message(b"$4\r\nAriz\r\n").unwrap().unwrap();
//! assert_eq!(reply, RespValue::BulkString("Ariz".into()));
//! ```

pub mod client;
pub mod parser;
pub mod types;

pub use client::{ClientConfig, RespClient};
pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::{Command, RespValue};
