//! # nskv - Namespaced Tables over a Key-Value Store
//!
//! nskv organizes the flat keyspace of a Redis-compatible store into
//! databases and tables, and gives every table its own expiration policy.
//!
//! ## Features
//!
//! - **Namespacing**: every logical key is stored as `<db>:<table>:<key>`
//! - **Table TTLs**: scalar writes pick up the table's explicit TTL, or its
//!   sliding window, without the caller passing one
//! - **Sliding Windows**: scalar reads push the key's expiry forward
//! - **Typed Facades**: value, hash, list, set and sorted-set operations
//! - **Two Backends**: an in-process sharded store, or any RESP server over TCP
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                nskv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────────────┐ │
//! │  │  Database   │───>│    Table    │───>│ ValueOps HashOps ListOps     │ │
//! │  │  (name)     │    │ (KeySpace + │    │ SetOps ZSetOps               │ │
//! │  └─────────────┘    │  Expiration │    └──────────────┬───────────────┘ │
//! │                     │  Policy)    │                   │ storage keys    │
//! │                     └──────┬──────┘                   ▼                 │
//! │                            │ root:expt / root:awt ┌──────────────┐      │
//! │                            └─────────────────────>│ Arc<dyn Store│      │
//! │                                                   └──────┬───────┘      │
//! │                            ┌─────────────────────────────┴───┐          │
//! │                            ▼                                 ▼          │
//! │                   ┌─────────────────┐              ┌─────────────────┐  │
//! │                   │   MemoryStore   │              │   RespClient    │  │
//! │                   │ 64 RwLock shards│              │ RESP over TCP   │  │
//! │                   │ + lazy expiry   │              │                 │  │
//! │                   └─────────────────┘              └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use nskv::{Database, MemoryStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let db = Database::new("app", Arc::new(MemoryStore::new()))?;
//! let sessions = db.create_table("sessions").await?;
//!
//! // Sessions live for 30 minutes after their last read.
//! sessions.set_auto_window(Duration::from_secs(30 * 60)).await?;
//!
//! sessions.value_ops().set("abc", "ariz").await?;
//! assert_eq!(sessions.value_ops().get("abc").await?, Some("ariz".into()));
//! # Ok::<(), nskv::Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Expiration Policy
//!
//! A scalar write without a TTL argument uses, in order:
//!
//! 1. the table's explicit TTL (`root:expt:<db>:<table>`) if positive
//! 2. the table's sliding window (`root:awt:<db>:<table>`) if positive
//! 3. no TTL
//!
//! Scalar reads renew the key to the sliding window when it is positive.
//! The window is cached per table handle; see [`PolicyReads`].
//!
//! ## Module Overview
//!
//! - [`namespace`]: `Database`, `Table`, name validation, expiration policy
//! - [`ops`]: the five operation facades and the shared key commands
//! - [`store`]: the `Store` trait and the in-process `MemoryStore`
//! - [`protocol`]: RESP types, reply parser and the `RespClient` store
//! - [`error`]: error types

pub mod error;
pub mod namespace;
pub mod ops;
pub mod protocol;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{Error, NameKind, NamespaceError, Result, StoreError};
pub use namespace::{Database, ExpirationPolicy, KeySpace, PolicyReads, Table, TableOptions};
pub use ops::{Codec, HashOps, JsonCodec, KeyCommands, ListOps, SetOps, ValueOps, ZSetOps};
pub use protocol::{ClientConfig, RespClient};
pub use store::{MemoryStore, Store, StoreHandle};

/// Separator between database, table and logical key.
pub const KEY_SEPARATOR: &str = ":";

/// Maximum length of a database or table name, in characters.
pub const MAX_NAME_LENGTH: usize = 10;

/// Reserved database holding table policies.
pub const ADMIN_DATABASE: &str = "root";

/// Table under [`ADMIN_DATABASE`] holding explicit table TTLs.
pub const EXPIRE_TABLE: &str = "expt";

/// Table under [`ADMIN_DATABASE`] holding sliding windows.
pub const AUTO_WINDOW_TABLE: &str = "awt";

/// Version of nskv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
