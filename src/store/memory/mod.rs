//! Thread-Safe In-Process Store with Expiry Support
//!
//! `MemoryStore` is a complete [`Store`](crate::store::Store) that keeps all
//! data in the current process. It backs tests and embedded deployments that
//! do not want a separate server.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over 64 `RwLock`ed shards so that
//!    commands on different keys rarely contend.
//! 2. **One Map per Shard**: Every value type lives in the same map behind a
//!    [`Value`] enum, so `TYPE`, `RENAME` and `DEL` work across types and a
//!    key can never hold two values at once.
//! 3. **Lazy Expiry**: Expired entries are invisible to readers and removed
//!    by the next writer that touches them.
//! 4. **Bulk Cleanup**: [`MemoryStore::cleanup_expired`] drops every lapsed
//!    entry at once, for keys that are never touched again.
//! 5. **Ordered Multi-Key Locking**: Commands touching several keys lock the
//!    involved shards in ascending index order, which keeps them atomic
//!    without deadlocks.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       MemoryStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod hashes;
mod keyspace;
mod lists;
mod sets;
mod strings;
mod zsets;

pub(crate) use zsets::SortedSet;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    InsertPosition, KeyTtl, KeyType, Limit, ScanOptions, ScanPage, ScoreRange, ScoredMember,
    Store,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime};

/// Number of shards for the store.
const NUM_SHARDS: usize = 64;

/// How often blocking pops re-check their list.
const BLOCKING_POLL_INTERVAL: Duration = Duration::from_millis(10);

type ShardMap = HashMap<String, Entry>;

/// A stored value of any supported type.
#[derive(Debug, Clone)]
pub(crate) enum Value {
    Str(Bytes),
    List(VecDeque<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
    Set(HashSet<Bytes>),
    ZSet(SortedSet),
}

impl Value {
    fn key_type(&self) -> KeyType {
        match self {
            Value::Str(_) => KeyType::String,
            Value::List(_) => KeyType::List,
            Value::Hash(_) => KeyType::Hash,
            Value::Set(_) => KeyType::Set,
            Value::ZSet(_) => KeyType::ZSet,
        }
    }

    /// Collections are deleted as soon as they become empty.
    fn is_empty_collection(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::List(l) => l.is_empty(),
            Value::Hash(h) => h.is_empty(),
            Value::Set(s) => s.is_empty(),
            Value::ZSet(z) => z.is_empty(),
        }
    }

    fn as_str(&self) -> StoreResult<&Bytes> {
        match self {
            Value::Str(b) => Ok(b),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_list(&self) -> StoreResult<&VecDeque<Bytes>> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_list_mut(&mut self) -> StoreResult<&mut VecDeque<Bytes>> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_hash(&self) -> StoreResult<&HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_hash_mut(&mut self) -> StoreResult<&mut HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_set(&self) -> StoreResult<&HashSet<Bytes>> {
        match self {
            Value::Set(s) => Ok(s),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_set_mut(&mut self) -> StoreResult<&mut HashSet<Bytes>> {
        match self {
            Value::Set(s) => Ok(s),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_zset(&self) -> StoreResult<&SortedSet> {
        match self {
            Value::ZSet(z) => Ok(z),
            _ => Err(StoreError::WrongType),
        }
    }

    fn as_zset_mut(&mut self) -> StoreResult<&mut SortedSet> {
        match self {
            Value::ZSet(z) => Ok(z),
            _ => Err(StoreError::WrongType),
        }
    }
}

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// The actual value stored
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn with_ttl(value: Value, ttl: Option<Duration>) -> StoreResult<Self> {
        Ok(Self {
            value,
            expires_at: ttl.map(deadline).transpose()?,
        })
    }

    #[inline]
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }

    fn ttl(&self) -> KeyTtl {
        match self.expires_at {
            None => KeyTtl::Persistent,
            Some(exp) => KeyTtl::Expires(exp.saturating_duration_since(Instant::now())),
        }
    }
}

/// The instant `ttl` from now.
///
/// Zero and unrepresentable TTLs are rejected like Redis rejects them in
/// `SET PX`.
pub(crate) fn deadline(ttl: Duration) -> StoreResult<Instant> {
    if ttl.is_zero() {
        return Err(StoreError::InvalidExpireTime);
    }
    Instant::now()
        .checked_add(ttl)
        .ok_or(StoreError::InvalidExpireTime)
}

/// Operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of live keys
    pub keys: u64,
    /// Read commands served
    pub read_ops: u64,
    /// Write commands served
    pub write_ops: u64,
    /// Keys removed by DEL
    pub del_ops: u64,
    /// PEXPIRE / PEXPIREAT commands served
    pub expire_ops: u64,
    /// Expired keys removed on access or by `cleanup_expired`
    pub expired: u64,
}

/// Determines which shard a key belongs to.
#[inline]
fn shard_for(key: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % NUM_SHARDS
}

/// Returns the entry for `key` unless it is missing or expired.
#[inline]
fn live<'a>(map: &'a ShardMap, key: &str) -> Option<&'a Entry> {
    map.get(key).filter(|e| !e.is_expired())
}

/// Write locks on every shard a multi-key command touches.
///
/// Shards are locked in ascending index order, the same order every
/// multi-key command uses, so two commands can never wait on each other.
struct MultiLock<'a> {
    guards: Vec<(usize, RwLockWriteGuard<'a, ShardMap>)>,
}

impl MultiLock<'_> {
    /// The locked map holding `key`. `key` must be one of the locked keys.
    fn map(&mut self, key: &str) -> &mut ShardMap {
        let idx = shard_for(key);
        let pos = self.guards.partition_point(|(i, _)| *i < idx);
        debug_assert_eq!(self.guards[pos].0, idx, "shard for {key:?} is not locked");
        &mut self.guards[pos].1
    }
}

/// The in-process store.
///
/// Designed to be wrapped in an `Arc` and shared; all operations are
/// thread-safe.
///
/// # Example
///
/// ```
/// use nskv::store::MemoryStore;
/// use bytes::Bytes;
///
/// let store = MemoryStore::new();
/// store.set_value("app:users:1", Bytes::from("Ariz"), None).unwrap();
/// assert_eq!(store.get_value("app:users:1").unwrap(), Some(Bytes::from("Ariz")));
/// ```
pub struct MemoryStore {
    shards: Vec<RwLock<ShardMap>>,
    read_count: AtomicU64,
    write_count: AtomicU64,
    del_count: AtomicU64,
    expire_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("shards", &self.shards.len())
            .field("keys", &self.len())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expire_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    // A panicking writer leaves each map structurally valid, so poisoned
    // locks are recovered rather than propagated.

    fn read_shard(&self, key: &str) -> RwLockReadGuard<'_, ShardMap> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.shards[shard_for(key)]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_shard(&self, key: &str) -> RwLockWriteGuard<'_, ShardMap> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut map = self.shards[shard_for(key)]
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.purge_if_expired(&mut map, key);
        map
    }

    fn lock_many(&self, keys: &[&str]) -> MultiLock<'_> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut indices: Vec<usize> = keys.iter().map(|k| shard_for(k)).collect();
        indices.sort_unstable();
        indices.dedup();

        let guards = indices
            .into_iter()
            .map(|i| {
                let guard = self.shards[i]
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                (i, guard)
            })
            .collect();

        let mut lock = MultiLock { guards };
        for key in keys {
            self.purge_if_expired(lock.map(key), key);
        }
        lock
    }

    /// Removes `key` if it has expired.
    fn purge_if_expired(&self, map: &mut ShardMap, key: &str) {
        if map.get(key).is_some_and(Entry::is_expired) {
            map.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Deletes `key` if its collection became empty.
    fn drop_if_empty(map: &mut ShardMap, key: &str) {
        if map.get(key).is_some_and(|e| e.value.is_empty_collection()) {
            map.remove(key);
        }
    }

    /// Returns the live entry for `key`, inserting `make()` if it is absent.
    fn entry_or_insert<'a>(
        map: &'a mut ShardMap,
        key: &str,
        make: impl FnOnce() -> Value,
    ) -> &'a mut Entry {
        map.entry(key.to_string())
            .or_insert_with(|| Entry::new(make()))
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| {
                let map = shard.read().unwrap_or_else(PoisonError::into_inner);
                map.values().filter(|e| !e.is_expired()).count() as u64
            })
            .sum()
    }

    /// Returns the number of stored entries, including expired ones that
    /// have not been cleaned up yet.
    pub fn entry_count(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner).len() as u64)
            .sum()
    }

    /// Returns true if the store holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            read_ops: self.read_count.load(Ordering::Relaxed),
            write_ops: self.write_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expire_ops: self.expire_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Removes every key.
    pub fn flush(&self) {
        for shard in &self.shards {
            shard.write().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Removes expired keys from all shards.
    ///
    /// Returns the number of keys that were removed.
    pub fn cleanup_expired(&self) -> u64 {
        let mut cleaned = 0u64;

        for shard in &self.shards {
            let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
            let before = map.len();
            map.retain(|_, entry| !entry.is_expired());
            cleaned += (before - map.len()) as u64;
        }

        if cleaned > 0 {
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
        }

        cleaned
    }

    /// Polls `pop` until it yields an element or `timeout` elapses.
    ///
    /// A zero timeout waits forever, as in Redis.
    async fn block_on_pop<F>(&self, timeout: Duration, mut pop: F) -> StoreResult<Option<Bytes>>
    where
        F: FnMut(&Self) -> StoreResult<Option<Bytes>>,
    {
        let deadline = if timeout.is_zero() {
            None
        } else {
            let deadline = tokio::time::Instant::now()
                .checked_add(timeout)
                .ok_or(StoreError::TimeoutOutOfRange)?;
            Some(deadline)
        };
        loop {
            if let Some(value) = pop(self)? {
                return Ok(Some(value));
            }
            let now = tokio::time::Instant::now();
            let sleep_for = match deadline {
                Some(deadline) if now >= deadline => return Ok(None),
                Some(deadline) => BLOCKING_POLL_INTERVAL.min(deadline - now),
                None => BLOCKING_POLL_INTERVAL,
            };
            tokio::time::sleep(sleep_for).await;
        }
    }
}

/// Resolves Redis style inclusive `start..=stop` indices against `len`.
///
/// Returns `None` when the range is empty.
pub(crate) fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Resolves a single (possibly negative) index against `len`.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

#[async_trait]
impl Store for MemoryStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.exists_key(key))
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        Ok(self.delete_keys(keys))
    }

    async fn pexpire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.expire_in(key, ttl)
    }

    async fn pexpire_at(&self, key: &str, at: SystemTime) -> StoreResult<bool> {
        let ttl = at.duration_since(SystemTime::now()).unwrap_or_default();
        self.expire_in(key, ttl)
    }

    async fn persist(&self, key: &str) -> StoreResult<bool> {
        Ok(self.persist_key(key))
    }

    async fn pttl(&self, key: &str) -> StoreResult<KeyTtl> {
        Ok(self.ttl_of(key))
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        Ok(self.matching_keys(pattern))
    }

    async fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        self.rename_key(from, to, true).map(|_| ())
    }

    async fn rename_nx(&self, from: &str, to: &str) -> StoreResult<bool> {
        self.rename_key(from, to, false)
    }

    async fn key_type(&self, key: &str) -> StoreResult<KeyType> {
        Ok(self.type_of(key))
    }

    async fn dump(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.dump_key(key)
    }

    async fn restore(
        &self,
        key: &str,
        ttl: Option<Duration>,
        payload: Bytes,
        replace: bool,
    ) -> StoreResult<()> {
        self.restore_key(key, ttl, &payload, replace)
    }

    async fn move_key(&self, _key: &str, _db: u32) -> StoreResult<bool> {
        Err(StoreError::Unsupported("MOVE"))
    }

    async fn random_key(&self) -> StoreResult<Option<String>> {
        Ok(self.any_key())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.get_value(key)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> StoreResult<()> {
        self.set_value(key, value, ttl)
    }

    async fn set_nx(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> StoreResult<bool> {
        self.set_value_nx(key, value, ttl)
    }

    async fn get_range(&self, key: &str, start: i64, end: i64) -> StoreResult<Bytes> {
        self.value_range(key, start, end)
    }

    async fn set_range(&self, key: &str, offset: usize, value: Bytes) -> StoreResult<usize> {
        self.overwrite_range(key, offset, &value)
    }

    async fn get_set(&self, key: &str, value: Bytes) -> StoreResult<Option<Bytes>> {
        self.replace_value(key, value)
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Bytes>>> {
        Ok(self.get_values(keys))
    }

    async fn mset(&self, pairs: &[(String, Bytes)]) -> StoreResult<()> {
        self.set_values(pairs, false);
        Ok(())
    }

    async fn mset_nx(&self, pairs: &[(String, Bytes)]) -> StoreResult<bool> {
        Ok(self.set_values(pairs, true))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        self.increment(key, delta)
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> StoreResult<f64> {
        self.increment_float(key, delta)
    }

    async fn append(&self, key: &str, value: Bytes) -> StoreResult<usize> {
        self.append_value(key, &value)
    }

    async fn strlen(&self, key: &str) -> StoreResult<usize> {
        self.value_len(key)
    }

    async fn get_bit(&self, key: &str, offset: u64) -> StoreResult<bool> {
        self.bit_at(key, offset)
    }

    async fn set_bit(&self, key: &str, offset: u64, on: bool) -> StoreResult<bool> {
        self.write_bit(key, offset, on)
    }

    async fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Bytes>> {
        self.hash_get(key, field)
    }

    async fn hget_all(&self, key: &str) -> StoreResult<Vec<(Bytes, Bytes)>> {
        self.hash_entries(key)
    }

    async fn hmget(&self, key: &str, fields: &[Bytes]) -> StoreResult<Vec<Option<Bytes>>> {
        self.hash_get_many(key, fields)
    }

    async fn hset(&self, key: &str, field: Bytes, value: Bytes) -> StoreResult<bool> {
        self.hash_put(key, &[(field, value)]).map(|added| added == 1)
    }

    async fn hset_many(&self, key: &str, pairs: &[(Bytes, Bytes)]) -> StoreResult<u64> {
        self.hash_put(key, pairs)
    }

    async fn hset_nx(&self, key: &str, field: Bytes, value: Bytes) -> StoreResult<bool> {
        self.hash_put_nx(key, field, value)
    }

    async fn hdel(&self, key: &str, fields: &[Bytes]) -> StoreResult<u64> {
        self.hash_delete(key, fields)
    }

    async fn hexists(&self, key: &str, field: &[u8]) -> StoreResult<bool> {
        self.hash_get(key, field).map(|v| v.is_some())
    }

    async fn hincr_by(&self, key: &str, field: &[u8], delta: i64) -> StoreResult<i64> {
        self.hash_increment(key, field, delta)
    }

    async fn hincr_by_float(&self, key: &str, field: &[u8], delta: f64) -> StoreResult<f64> {
        self.hash_increment_float(key, field, delta)
    }

    async fn hkeys(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        self.hash_entries(key)
            .map(|entries| entries.into_iter().map(|(f, _)| f).collect())
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        self.hash_len(key)
    }

    async fn hvals(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        self.hash_entries(key)
            .map(|entries| entries.into_iter().map(|(_, v)| v).collect())
    }

    async fn hscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<(Bytes, Bytes)>> {
        self.hash_scan(key, cursor, options)
    }

    async fn lindex(&self, key: &str, index: i64) -> StoreResult<Option<Bytes>> {
        self.list_index(key, index)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        self.list_range(key, start, stop)
    }

    async fn lpush(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.list_push(key, values, true, false)
    }

    async fn lpush_x(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.list_push(key, values, true, true)
    }

    async fn rpush(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.list_push(key, values, false, false)
    }

    async fn rpush_x(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.list_push(key, values, false, true)
    }

    async fn linsert(
        &self,
        key: &str,
        position: InsertPosition,
        pivot: &[u8],
        value: Bytes,
    ) -> StoreResult<i64> {
        self.list_insert(key, position, pivot, value)
    }

    async fn lset(&self, key: &str, index: i64, value: Bytes) -> StoreResult<()> {
        self.list_set(key, index, value)
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.list_pop(key, true)
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.list_pop(key, false)
    }

    async fn blpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<Bytes>> {
        self.block_on_pop(timeout, |store| store.list_pop(key, true))
            .await
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<Bytes>> {
        self.block_on_pop(timeout, |store| store.list_pop(key, false))
            .await
    }

    async fn rpoplpush(&self, source: &str, destination: &str) -> StoreResult<Option<Bytes>> {
        self.list_rotate(source, destination)
    }

    async fn brpoplpush(
        &self,
        source: &str,
        destination: &str,
        timeout: Duration,
    ) -> StoreResult<Option<Bytes>> {
        self.block_on_pop(timeout, |store| store.list_rotate(source, destination))
            .await
    }

    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> StoreResult<u64> {
        self.list_remove(key, count, value)
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> StoreResult<()> {
        self.list_trim(key, start, stop)
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        self.list_len(key)
    }

    async fn sadd(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        self.set_add(key, members)
    }

    async fn srem(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        self.set_remove(key, members)
    }

    async fn spop(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.set_pop(key)
    }

    async fn smove(&self, source: &str, destination: &str, member: &[u8]) -> StoreResult<bool> {
        self.set_move(source, destination, member)
    }

    async fn scard(&self, key: &str) -> StoreResult<u64> {
        self.set_len(key)
    }

    async fn sismember(&self, key: &str, member: &[u8]) -> StoreResult<bool> {
        self.set_contains(key, member)
    }

    async fn sinter(&self, keys: &[String]) -> StoreResult<Vec<Bytes>> {
        self.set_combine(keys, SetOp::Inter, None)
    }

    async fn sinter_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.set_combine(keys, SetOp::Inter, Some(destination))
            .map(|m| m.len() as u64)
    }

    async fn sunion(&self, keys: &[String]) -> StoreResult<Vec<Bytes>> {
        self.set_combine(keys, SetOp::Union, None)
    }

    async fn sunion_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.set_combine(keys, SetOp::Union, Some(destination))
            .map(|m| m.len() as u64)
    }

    async fn sdiff(&self, keys: &[String]) -> StoreResult<Vec<Bytes>> {
        self.set_combine(keys, SetOp::Diff, None)
    }

    async fn sdiff_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.set_combine(keys, SetOp::Diff, Some(destination))
            .map(|m| m.len() as u64)
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        self.set_members(key)
    }

    async fn srandmember(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.set_random(key, 1).map(|mut m| m.pop())
    }

    async fn srandmember_count(&self, key: &str, count: i64) -> StoreResult<Vec<Bytes>> {
        self.set_random(key, count)
    }

    async fn sscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<Bytes>> {
        self.set_scan(key, cursor, options)
    }

    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> StoreResult<u64> {
        self.zset_add(key, members)
    }

    async fn zrem(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        self.zset_remove(key, members)
    }

    async fn zincr_by(&self, key: &str, delta: f64, member: Bytes) -> StoreResult<f64> {
        self.zset_increment(key, delta, member)
    }

    async fn zrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>> {
        self.zset_rank(key, member, false)
    }

    async fn zrevrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>> {
        self.zset_rank(key, member, true)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<ScoredMember>> {
        self.zset_range(key, start, stop, false)
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.zset_range(key, start, stop, true)
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        limit: Option<Limit>,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.zset_range_by_score(key, range, limit, false)
    }

    async fn zrevrange_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        limit: Option<Limit>,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.zset_range_by_score(key, range, limit, true)
    }

    async fn zcount(&self, key: &str, range: ScoreRange) -> StoreResult<u64> {
        self.zset_range_by_score(key, range, None, false)
            .map(|m| m.len() as u64)
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.zset_len(key)
    }

    async fn zscore(&self, key: &str, member: &[u8]) -> StoreResult<Option<f64>> {
        self.zset_score(key, member)
    }

    async fn zremrange_by_rank(&self, key: &str, start: i64, stop: i64) -> StoreResult<u64> {
        self.zset_remove_range(key, start, stop)
    }

    async fn zremrange_by_score(&self, key: &str, range: ScoreRange) -> StoreResult<u64> {
        self.zset_remove_by_score(key, range)
    }

    async fn zunion_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.zset_combine_store(destination, keys, false)
    }

    async fn zinter_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.zset_combine_store(destination, keys, true)
    }

    async fn zscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<ScoredMember>> {
        self.zset_scan(key, cursor, options)
    }
}

/// Set algebra used by `SINTER`, `SUNION` and `SDIFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOp {
    Inter,
    Union,
    Diff,
}

/// Shared cursor paging for the scan commands.
///
/// The cursor is an offset into the collection's current iteration order,
/// sorted so that pages are stable while the collection is unchanged.
pub(crate) fn page<T>(
    mut items: Vec<T>,
    cursor: u64,
    options: &ScanOptions,
    sort_key: impl Fn(&T) -> &[u8],
) -> ScanPage<T> {
    items.sort_by(|a, b| sort_key(a).cmp(sort_key(b)));
    let count = options.count.unwrap_or(10).max(1);
    let start = (cursor as usize).min(items.len());
    let end = (start + count).min(items.len());
    let next = if end >= items.len() { 0 } else { end as u64 };

    let pattern = options.pattern.as_deref().map(crate::store::GlobPattern::new);
    let items = items
        .into_iter()
        .skip(start)
        .take(end - start)
        .filter(|item| {
            pattern
                .as_ref()
                .map(|p| p.matches(sort_key(item)))
                .unwrap_or(true)
        })
        .collect();

    ScanPage {
        cursor: next,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize_range(0, -1, 5), Some((0, 4)));
        assert_eq!(normalize_range(1, 3, 5), Some((1, 3)));
        assert_eq!(normalize_range(-3, -1, 5), Some((2, 4)));
        assert_eq!(normalize_range(0, 100, 5), Some((0, 4)));
        assert_eq!(normalize_range(3, 1, 5), None);
        assert_eq!(normalize_range(-100, 0, 5), Some((0, 0)));
        assert_eq!(normalize_range(0, -1, 0), None);
        assert_eq!(normalize_range(5, 10, 5), None);
    }

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(0, 3), Some(0));
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
    }

    #[test]
    fn test_scan_paging_covers_everything() {
        let items: Vec<Bytes> = (0..25).map(|i| Bytes::from(format!("m{:02}", i))).collect();
        let options = ScanOptions::new().count(10);

        let mut cursor = 0;
        let mut seen = Vec::new();
        loop {
            let page = page(items.clone(), cursor, &options, |b| b.as_ref());
            seen.extend(page.items);
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn test_scan_pattern_filters_page() {
        let items = vec![Bytes::from("apple"), Bytes::from("avocado"), Bytes::from("banana")];
        let options = ScanOptions::new().pattern("a*").count(100);
        let page = page(items, 0, &options, |b| b.as_ref());
        assert_eq!(page.cursor, 0);
        assert_eq!(page.items, vec![Bytes::from("apple"), Bytes::from("avocado")]);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    store.set_value(&key, Bytes::from("value"), None).unwrap();
                    store.get_value(&key).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1000);
    }

    #[test]
    fn test_cleanup_expired() {
        let store = MemoryStore::new();

        store.set_value("key1", Bytes::from("value1"), Some(Duration::from_millis(10))).unwrap();
        store.set_value("key2", Bytes::from("value2"), Some(Duration::from_millis(10))).unwrap();
        store.set_value("key3", Bytes::from("value3"), None).unwrap();

        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(store.cleanup_expired(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.exists_key("key3"));
        assert_eq!(store.stats().expired, 2);
    }

    #[test]
    fn test_flush() {
        let store = MemoryStore::new();
        store.set_value("key1", Bytes::from("value1"), None).unwrap();
        store.set_value("key2", Bytes::from("value2"), None).unwrap();
        assert_eq!(store.len(), 2);

        store.flush();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_blocking_pop_times_out() {
        let store = MemoryStore::new();
        let started = std::time::Instant::now();
        let popped = store
            .blpop("queue", Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(popped, None);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_blocking_pop_wakes_on_push() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let pusher = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            pusher.rpush("queue", &[Bytes::from("job")]).await.unwrap();
        });

        let popped = store.blpop("queue", Duration::from_secs(2)).await.unwrap();
        assert_eq!(popped, Some(Bytes::from("job")));
    }

    #[tokio::test]
    async fn test_move_is_unsupported() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.move_key("k", 1).await,
            Err(StoreError::Unsupported("MOVE"))
        ));
    }
}
