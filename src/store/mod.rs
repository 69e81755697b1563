//! Store Abstraction
//!
//! The namespace layer never talks to a key-value engine directly. It goes
//! through the [`Store`] trait, which exposes the primitive command set of a
//! Redis-compatible engine over *storage keys* (already namespaced strings)
//! and binary values.
//!
//! ## Implementations
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │         MemoryStore          │      │          RespClient          │
//! │  sharded in-process engine   │      │  RESP over TCP to a server   │
//! │  lazy expiry on access       │      │  (Redis, Valkey, ...)        │
//! └──────────────┬───────────────┘      └──────────────┬───────────────┘
//!                │                                     │
//!                └──────────────┐   ┌──────────────────┘
//!                               ▼   ▼
//!                       Arc<dyn Store> (StoreHandle)
//! ```
//!
//! Every method is a single command with the atomicity the engine gives it.
//! Nothing here composes commands; that is the job of the facades.

pub mod glob;
pub mod memory;

pub use glob::{escape_glob, GlobPattern};
pub use memory::{MemoryStore, StorageStats};

use crate::error::StoreResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Shared handle to a store, as held by databases, tables and facades.
pub type StoreHandle = Arc<dyn Store>;

/// The type of the value stored at a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    None,
    String,
    List,
    Set,
    ZSet,
    Hash,
}

impl KeyType {
    /// The name Redis uses for this type in `TYPE` replies.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::None => "none",
            KeyType::String => "string",
            KeyType::List => "list",
            KeyType::Set => "set",
            KeyType::ZSet => "zset",
            KeyType::Hash => "hash",
        }
    }

    /// Parses a `TYPE` reply. Unknown types (streams, modules) map to `None`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "string" => KeyType::String,
            "list" => KeyType::List,
            "set" => KeyType::Set,
            "zset" => KeyType::ZSet,
            "hash" => KeyType::Hash,
            _ => KeyType::None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining time to live of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist.
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key expires after the given duration.
    Expires(Duration),
}

impl KeyTtl {
    /// Decodes a `PTTL` reply (`-2` missing, `-1` persistent).
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            -2 => KeyTtl::Missing,
            ms if ms < 0 => KeyTtl::Persistent,
            ms => KeyTtl::Expires(Duration::from_millis(ms as u64)),
        }
    }

    /// Encodes as a `PTTL` style integer.
    pub fn as_millis(&self) -> i64 {
        match self {
            KeyTtl::Missing => -2,
            KeyTtl::Persistent => -1,
            KeyTtl::Expires(d) => d.as_millis() as i64,
        }
    }

    /// Returns the duration if the key has an expiry.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(*d),
            _ => None,
        }
    }
}

/// Where `LINSERT` places the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

/// Options for cursor based scans (`HSCAN`, `SSCAN`, `ZSCAN`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Only return elements matching this glob pattern
    pub pattern: Option<String>,
    /// Hint for how many elements to return per call
    pub count: Option<usize>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

/// One page of a cursor based scan. A `cursor` of 0 means the scan is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage<T> {
    pub cursor: u64,
    pub items: Vec<T>,
}

/// A sorted-set member together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: Bytes,
    pub score: f64,
}

impl ScoredMember {
    pub fn new(member: impl Into<Bytes>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// An inclusive score interval for `ZRANGEBYSCORE` and friends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Every score.
    pub fn all() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    #[inline]
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

/// `LIMIT offset count` for score range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: usize,
    pub count: usize,
}

impl Limit {
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }
}

/// The primitive command set of a Redis-compatible key-value engine.
///
/// All keys are storage keys. Values, hash fields and members are binary.
/// Index arguments follow Redis conventions: inclusive, negative values count
/// from the end (`-1` is the last element).
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// `EXISTS key`
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// `DEL key [key ...]`, returns the number of keys removed.
    async fn del(&self, keys: &[String]) -> StoreResult<u64>;

    /// `PEXPIRE key ms`, returns false if the key does not exist.
    async fn pexpire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// `PEXPIREAT key unix-ms`
    async fn pexpire_at(&self, key: &str, at: SystemTime) -> StoreResult<bool>;

    /// `PERSIST key`, returns true if an expiry was removed.
    async fn persist(&self, key: &str) -> StoreResult<bool>;

    /// `PTTL key`
    async fn pttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// `KEYS pattern`
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// `RENAME from to`, fails with `NoSuchKey` if `from` is missing.
    async fn rename(&self, from: &str, to: &str) -> StoreResult<()>;

    /// `RENAMENX from to`
    async fn rename_nx(&self, from: &str, to: &str) -> StoreResult<bool>;

    /// `TYPE key`
    async fn key_type(&self, key: &str) -> StoreResult<KeyType>;

    /// `DUMP key`, an opaque payload understood by `restore` on the same engine.
    async fn dump(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// `RESTORE key ttl payload [REPLACE]`
    async fn restore(
        &self,
        key: &str,
        ttl: Option<Duration>,
        payload: Bytes,
        replace: bool,
    ) -> StoreResult<()>;

    /// `MOVE key db`
    async fn move_key(&self, key: &str, db: u32) -> StoreResult<bool>;

    /// `RANDOMKEY`
    async fn random_key(&self) -> StoreResult<Option<String>>;

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// `GET key`
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// `SET key value [PX ms]`
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> StoreResult<()>;

    /// `SET key value NX [PX ms]`, returns true if the key was set.
    async fn set_nx(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> StoreResult<bool>;

    /// `GETRANGE key start end`
    async fn get_range(&self, key: &str, start: i64, end: i64) -> StoreResult<Bytes>;

    /// `SETRANGE key offset value`, returns the new length.
    async fn set_range(&self, key: &str, offset: usize, value: Bytes) -> StoreResult<usize>;

    /// `GETSET key value`
    async fn get_set(&self, key: &str, value: Bytes) -> StoreResult<Option<Bytes>>;

    /// `MGET key [key ...]`
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Bytes>>>;

    /// `MSET key value [key value ...]`
    async fn mset(&self, pairs: &[(String, Bytes)]) -> StoreResult<()>;

    /// `MSETNX key value [key value ...]`
    async fn mset_nx(&self, pairs: &[(String, Bytes)]) -> StoreResult<bool>;

    /// `INCRBY key delta`
    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64>;

    /// `INCRBYFLOAT key delta`
    async fn incr_by_float(&self, key: &str, delta: f64) -> StoreResult<f64>;

    /// `APPEND key value`, returns the new length.
    async fn append(&self, key: &str, value: Bytes) -> StoreResult<usize>;

    /// `STRLEN key`
    async fn strlen(&self, key: &str) -> StoreResult<usize>;

    /// `GETBIT key offset`
    async fn get_bit(&self, key: &str, offset: u64) -> StoreResult<bool>;

    /// `SETBIT key offset bit`, returns the previous bit.
    async fn set_bit(&self, key: &str, offset: u64, on: bool) -> StoreResult<bool>;

    // ------------------------------------------------------------------
    // Hashes
    // ------------------------------------------------------------------

    async fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Bytes>>;

    async fn hget_all(&self, key: &str) -> StoreResult<Vec<(Bytes, Bytes)>>;

    async fn hmget(&self, key: &str, fields: &[Bytes]) -> StoreResult<Vec<Option<Bytes>>>;

    /// `HSET key field value`, returns true if the field is new.
    async fn hset(&self, key: &str, field: Bytes, value: Bytes) -> StoreResult<bool>;

    /// `HSET key field value [field value ...]`, returns the number of new fields.
    async fn hset_many(&self, key: &str, pairs: &[(Bytes, Bytes)]) -> StoreResult<u64>;

    async fn hset_nx(&self, key: &str, field: Bytes, value: Bytes) -> StoreResult<bool>;

    async fn hdel(&self, key: &str, fields: &[Bytes]) -> StoreResult<u64>;

    async fn hexists(&self, key: &str, field: &[u8]) -> StoreResult<bool>;

    async fn hincr_by(&self, key: &str, field: &[u8], delta: i64) -> StoreResult<i64>;

    async fn hincr_by_float(&self, key: &str, field: &[u8], delta: f64) -> StoreResult<f64>;

    async fn hkeys(&self, key: &str) -> StoreResult<Vec<Bytes>>;

    async fn hlen(&self, key: &str) -> StoreResult<u64>;

    async fn hvals(&self, key: &str) -> StoreResult<Vec<Bytes>>;

    async fn hscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<(Bytes, Bytes)>>;

    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    async fn lindex(&self, key: &str, index: i64) -> StoreResult<Option<Bytes>>;

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Bytes>>;

    /// `LPUSH`, returns the new length.
    async fn lpush(&self, key: &str, values: &[Bytes]) -> StoreResult<u64>;

    /// `LPUSHX`, pushes only if the list exists.
    async fn lpush_x(&self, key: &str, values: &[Bytes]) -> StoreResult<u64>;

    async fn rpush(&self, key: &str, values: &[Bytes]) -> StoreResult<u64>;

    async fn rpush_x(&self, key: &str, values: &[Bytes]) -> StoreResult<u64>;

    /// `LINSERT`, returns the new length, `-1` if the pivot was not found
    /// and `0` if the key does not exist.
    async fn linsert(
        &self,
        key: &str,
        position: InsertPosition,
        pivot: &[u8],
        value: Bytes,
    ) -> StoreResult<i64>;

    async fn lset(&self, key: &str, index: i64, value: Bytes) -> StoreResult<()>;

    async fn lpop(&self, key: &str) -> StoreResult<Option<Bytes>>;

    async fn rpop(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// `BLPOP key timeout`, waits up to `timeout` for an element.
    async fn blpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<Bytes>>;

    async fn brpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<Bytes>>;

    async fn rpoplpush(&self, source: &str, destination: &str) -> StoreResult<Option<Bytes>>;

    async fn brpoplpush(
        &self,
        source: &str,
        destination: &str,
        timeout: Duration,
    ) -> StoreResult<Option<Bytes>>;

    /// `LREM key count value`
    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> StoreResult<u64>;

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> StoreResult<()>;

    async fn llen(&self, key: &str) -> StoreResult<u64>;

    // ------------------------------------------------------------------
    // Sets
    // ------------------------------------------------------------------

    async fn sadd(&self, key: &str, members: &[Bytes]) -> StoreResult<u64>;

    async fn srem(&self, key: &str, members: &[Bytes]) -> StoreResult<u64>;

    async fn spop(&self, key: &str) -> StoreResult<Option<Bytes>>;

    async fn smove(&self, source: &str, destination: &str, member: &[u8]) -> StoreResult<bool>;

    async fn scard(&self, key: &str) -> StoreResult<u64>;

    async fn sismember(&self, key: &str, member: &[u8]) -> StoreResult<bool>;

    async fn sinter(&self, keys: &[String]) -> StoreResult<Vec<Bytes>>;

    async fn sinter_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64>;

    async fn sunion(&self, keys: &[String]) -> StoreResult<Vec<Bytes>>;

    async fn sunion_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64>;

    async fn sdiff(&self, keys: &[String]) -> StoreResult<Vec<Bytes>>;

    async fn sdiff_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64>;

    async fn smembers(&self, key: &str) -> StoreResult<Vec<Bytes>>;

    async fn srandmember(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// `SRANDMEMBER key count`. A negative count may return duplicates.
    async fn srandmember_count(&self, key: &str, count: i64) -> StoreResult<Vec<Bytes>>;

    async fn sscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<Bytes>>;

    // ------------------------------------------------------------------
    // Sorted sets
    // ------------------------------------------------------------------

    /// `ZADD`, returns the number of members added (not updated).
    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> StoreResult<u64>;

    async fn zrem(&self, key: &str, members: &[Bytes]) -> StoreResult<u64>;

    async fn zincr_by(&self, key: &str, delta: f64, member: Bytes) -> StoreResult<f64>;

    /// 0-based rank in ascending score order.
    async fn zrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>>;

    async fn zrevrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>>;

    /// `ZRANGE key start stop WITHSCORES`
    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<ScoredMember>>;

    /// `ZREVRANGE key start stop WITHSCORES`
    async fn zrevrange(&self, key: &str, start: i64, stop: i64)
        -> StoreResult<Vec<ScoredMember>>;

    /// `ZRANGEBYSCORE key min max WITHSCORES [LIMIT offset count]`
    async fn zrange_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        limit: Option<Limit>,
    ) -> StoreResult<Vec<ScoredMember>>;

    /// `ZREVRANGEBYSCORE key max min WITHSCORES [LIMIT offset count]`
    async fn zrevrange_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        limit: Option<Limit>,
    ) -> StoreResult<Vec<ScoredMember>>;

    async fn zcount(&self, key: &str, range: ScoreRange) -> StoreResult<u64>;

    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    async fn zscore(&self, key: &str, member: &[u8]) -> StoreResult<Option<f64>>;

    async fn zremrange_by_rank(&self, key: &str, start: i64, stop: i64) -> StoreResult<u64>;

    async fn zremrange_by_score(&self, key: &str, range: ScoreRange) -> StoreResult<u64>;

    /// `ZUNIONSTORE destination n key [key ...]` with SUM aggregation.
    async fn zunion_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64>;

    /// `ZINTERSTORE destination n key [key ...]` with SUM aggregation.
    async fn zinter_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64>;

    async fn zscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<ScoredMember>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ttl_from_millis() {
        assert_eq!(KeyTtl::from_millis(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_millis(-1), KeyTtl::Persistent);
        assert_eq!(
            KeyTtl::from_millis(1500),
            KeyTtl::Expires(Duration::from_millis(1500))
        );
        assert_eq!(KeyTtl::Persistent.as_millis(), -1);
        assert_eq!(KeyTtl::Missing.duration(), None);
    }

    #[test]
    fn test_key_type_names() {
        for ty in [
            KeyType::None,
            KeyType::String,
            KeyType::List,
            KeyType::Set,
            KeyType::ZSet,
            KeyType::Hash,
        ] {
            assert_eq!(KeyType::from_name(ty.as_str()), ty);
        }
        assert_eq!(KeyType::from_name("stream"), KeyType::None);
    }

    #[test]
    fn test_score_range_contains() {
        let range = ScoreRange::new(1.0, 2.0);
        assert!(range.contains(1.0));
        assert!(range.contains(2.0));
        assert!(!range.contains(2.5));
        assert!(ScoreRange::all().contains(f64::MAX));
    }
}
