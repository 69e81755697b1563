//! Type-independent key commands: existence, deletion, expiry, renaming,
//! enumeration and dump/restore.

use super::{deadline, live, Entry, MemoryStore, SortedSet, Value};
use crate::error::{StoreError, StoreResult};
use crate::store::{GlobPattern, KeyTtl, KeyType};
use bytes::Bytes;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use std::time::Duration;

/// Format version written into every dump payload.
const DUMP_VERSION: u8 = 1;

/// Serialized form of a single value, as produced by `DUMP`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
enum Snapshot {
    String(Bytes),
    List(Vec<Bytes>),
    Hash(Vec<(Bytes, Bytes)>),
    Set(Vec<Bytes>),
    Zset(Vec<(Bytes, f64)>),
}

#[derive(Debug, Serialize, Deserialize)]
struct DumpPayload {
    version: u8,
    value: Snapshot,
}

impl From<&Value> for Snapshot {
    fn from(value: &Value) -> Self {
        match value {
            Value::Str(b) => Snapshot::String(b.clone()),
            Value::List(l) => Snapshot::List(l.iter().cloned().collect()),
            Value::Hash(h) => Snapshot::Hash(h.iter().map(|(f, v)| (f.clone(), v.clone())).collect()),
            Value::Set(s) => Snapshot::Set(s.iter().cloned().collect()),
            Value::ZSet(z) => Snapshot::Zset(z.iter().map(|(m, s)| (m.clone(), s)).collect()),
        }
    }
}

impl From<Snapshot> for Value {
    fn from(snapshot: Snapshot) -> Self {
        match snapshot {
            Snapshot::String(b) => Value::Str(b),
            Snapshot::List(l) => Value::List(l.into()),
            Snapshot::Hash(h) => Value::Hash(h.into_iter().collect()),
            Snapshot::Set(s) => Value::Set(s.into_iter().collect()),
            Snapshot::Zset(z) => {
                let mut set = SortedSet::default();
                for (member, score) in z {
                    set.insert(member, score);
                }
                Value::ZSet(set)
            }
        }
    }
}

impl MemoryStore {
    /// Returns true if `key` exists and has not expired.
    pub fn exists_key(&self, key: &str) -> bool {
        live(&self.read_shard(key), key).is_some()
    }

    /// Deletes `keys`, returning how many existed.
    pub fn delete_keys(&self, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let mut lock = self.lock_many(&refs);
        let removed = refs
            .iter()
            .filter(|key| lock.map(key).remove(**key).is_some())
            .count() as u64;

        self.del_count.fetch_add(removed, Ordering::Relaxed);
        removed
    }

    /// Sets the TTL of an existing key. A zero TTL deletes the key.
    pub fn expire_in(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.expire_count.fetch_add(1, Ordering::Relaxed);
        let mut map = self.write_shard(key);

        if ttl.is_zero() {
            return Ok(map.remove(key).is_some());
        }

        let expires_at = deadline(ttl)?;
        match map.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the TTL of a key. Returns true if one was removed.
    pub fn persist_key(&self, key: &str) -> bool {
        let mut map = self.write_shard(key);
        map.get_mut(key)
            .and_then(|entry| entry.expires_at.take())
            .is_some()
    }

    /// Returns the remaining TTL of a key.
    pub fn ttl_of(&self, key: &str) -> KeyTtl {
        live(&self.read_shard(key), key)
            .map(Entry::ttl)
            .unwrap_or(KeyTtl::Missing)
    }

    /// Returns the type of the value stored at `key`.
    pub fn type_of(&self, key: &str) -> KeyType {
        live(&self.read_shard(key), key)
            .map(|e| e.value.key_type())
            .unwrap_or(KeyType::None)
    }

    /// Returns every live key matching a glob pattern.
    pub fn matching_keys(&self, pattern: &str) -> Vec<String> {
        let glob = GlobPattern::new(pattern);
        let mut keys = Vec::new();

        for shard in &self.shards {
            let map = shard.read().unwrap_or_else(PoisonError::into_inner);
            keys.extend(
                map.iter()
                    .filter(|(k, e)| !e.is_expired() && glob.matches_str(k))
                    .map(|(k, _)| k.clone()),
            );
        }

        keys
    }

    /// Returns a random live key.
    pub fn any_key(&self) -> Option<String> {
        self.matching_keys("*").choose(&mut rand::rng()).cloned()
    }

    /// Moves the value at `from` to `to`, keeping its TTL.
    ///
    /// With `overwrite == false` an existing `to` is left alone and `false`
    /// is returned.
    pub(crate) fn rename_key(&self, from: &str, to: &str, overwrite: bool) -> StoreResult<bool> {
        let mut lock = self.lock_many(&[from, to]);

        if live(lock.map(from), from).is_none() {
            return Err(StoreError::NoSuchKey);
        }
        if from == to {
            return Ok(overwrite);
        }
        if !overwrite && live(lock.map(to), to).is_some() {
            return Ok(false);
        }

        if let Some(entry) = lock.map(from).remove(from) {
            lock.map(to).insert(to.to_string(), entry);
        }
        Ok(true)
    }

    /// Serializes the value at `key`.
    pub(crate) fn dump_key(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let map = self.read_shard(key);
        let Some(entry) = live(&map, key) else {
            return Ok(None);
        };

        let payload = DumpPayload {
            version: DUMP_VERSION,
            value: Snapshot::from(&entry.value),
        };
        Ok(Some(Bytes::from(serde_json::to_vec(&payload)?)))
    }

    /// Recreates a value from a `dump_key` payload.
    pub(crate) fn restore_key(
        &self,
        key: &str,
        ttl: Option<Duration>,
        payload: &[u8],
        replace: bool,
    ) -> StoreResult<()> {
        let payload: DumpPayload = serde_json::from_slice(payload)?;
        if payload.version != DUMP_VERSION {
            return Err(StoreError::InvalidDump(serde::de::Error::custom(format!(
                "unsupported dump version {}",
                payload.version
            ))));
        }

        let mut map = self.write_shard(key);
        if !replace && map.contains_key(key) {
            return Err(StoreError::BusyKey);
        }

        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        map.insert(
            key.to_string(),
            Entry::with_ttl(Value::from(payload.value), ttl)?,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_delete_counts_existing_keys() {
        let store = MemoryStore::new();
        store.set_value("a", Bytes::from("1"), None).unwrap();
        store.set_value("b", Bytes::from("2"), None).unwrap();

        assert_eq!(store.delete_keys(&keys(&["a", "b", "missing"])), 2);
        assert!(!store.exists_key("a"));
        assert_eq!(store.stats().del_ops, 2);
        assert_eq!(store.delete_keys(&[]), 0);
    }

    #[test]
    fn test_expiry_and_ttl() {
        let store = MemoryStore::new();
        store.set_value("k", Bytes::from("v"), None).unwrap();

        assert_eq!(store.ttl_of("k"), KeyTtl::Persistent);
        assert!(store.expire_in("k", Duration::from_secs(100)).unwrap());
        let ttl = store.ttl_of("k").duration().unwrap();
        assert!(ttl > Duration::from_secs(99));
        assert_eq!(store.stats().expire_ops, 1);

        assert!(store.persist_key("k"));
        assert!(!store.persist_key("k"));
        assert_eq!(store.ttl_of("k"), KeyTtl::Persistent);

        assert!(!store.expire_in("missing", Duration::from_secs(1)).unwrap());
        assert_eq!(store.ttl_of("missing"), KeyTtl::Missing);
    }

    #[test]
    fn test_zero_ttl_deletes() {
        let store = MemoryStore::new();
        store.set_value("k", Bytes::from("v"), None).unwrap();
        assert!(store.expire_in("k", Duration::ZERO).unwrap());
        assert!(!store.exists_key("k"));
    }

    #[test]
    fn test_unrepresentable_ttl_is_rejected() {
        let store = MemoryStore::new();
        store.set_value("k", Bytes::from("v"), None).unwrap();

        assert!(matches!(
            store.expire_in("k", Duration::MAX),
            Err(StoreError::InvalidExpireTime)
        ));
        assert_eq!(store.ttl_of("k"), KeyTtl::Persistent);

        assert!(matches!(
            store.set_value("k", Bytes::from("w"), Some(Duration::from_secs(u64::MAX / 2))),
            Err(StoreError::InvalidExpireTime)
        ));
        assert_eq!(store.get_value("k").unwrap(), Some(Bytes::from("v")));
    }

    #[test]
    fn test_lazy_expiry() {
        let store = MemoryStore::new();
        store.set_value("k", Bytes::from("v"), Some(Duration::from_millis(10))).unwrap();
        assert!(store.exists_key("k"));

        std::thread::sleep(Duration::from_millis(30));
        assert!(!store.exists_key("k"));
        assert_eq!(store.type_of("k"), KeyType::None);
        assert_eq!(store.ttl_of("k"), KeyTtl::Missing);
    }

    #[test]
    fn test_matching_keys() {
        let store = MemoryStore::new();
        store.set_value("app:users:1", Bytes::from("a"), None).unwrap();
        store.set_value("app:users:2", Bytes::from("b"), None).unwrap();
        store.set_value("app:posts:1", Bytes::from("c"), None).unwrap();

        let mut found = store.matching_keys("app:users:*");
        found.sort();
        assert_eq!(found, keys(&["app:users:1", "app:users:2"]));
        assert_eq!(store.matching_keys("*").len(), 3);
        assert!(store.matching_keys("nothing:*").is_empty());
    }

    #[test]
    fn test_rename_keeps_ttl() {
        let store = MemoryStore::new();
        store.set_value("old", Bytes::from("v"), Some(Duration::from_secs(100))).unwrap();

        assert!(store.rename_key("old", "new", true).unwrap());
        assert!(!store.exists_key("old"));
        assert_eq!(store.get_value("new").unwrap(), Some(Bytes::from("v")));
        assert!(store.ttl_of("new").duration().is_some());
    }

    #[test]
    fn test_rename_nx_and_missing() {
        let store = MemoryStore::new();
        store.set_value("a", Bytes::from("1"), None).unwrap();
        store.set_value("b", Bytes::from("2"), None).unwrap();

        assert!(!store.rename_key("a", "b", false).unwrap());
        assert_eq!(store.get_value("b").unwrap(), Some(Bytes::from("2")));
        assert!(matches!(
            store.rename_key("missing", "c", true),
            Err(StoreError::NoSuchKey)
        ));
    }

    #[test]
    fn test_type_of() {
        let store = MemoryStore::new();
        store.set_value("s", Bytes::from("v"), None).unwrap();
        store.list_push("l", &[Bytes::from("x")], false, false).unwrap();
        store.set_add("set", &[Bytes::from("x")]).unwrap();

        assert_eq!(store.type_of("s"), KeyType::String);
        assert_eq!(store.type_of("l"), KeyType::List);
        assert_eq!(store.type_of("set"), KeyType::Set);
        assert_eq!(store.type_of("none"), KeyType::None);
    }

    #[test]
    fn test_dump_restore() {
        let store = MemoryStore::new();
        store
            .hash_put("h", &[(Bytes::from("f"), Bytes::from("v"))])
            .unwrap();

        let payload = store.dump_key("h").unwrap().unwrap();
        store.restore_key("copy", None, &payload, false).unwrap();
        assert_eq!(
            store.hash_get("copy", b"f").unwrap(),
            Some(Bytes::from("v"))
        );

        assert!(matches!(
            store.restore_key("copy", None, &payload, false),
            Err(StoreError::BusyKey)
        ));
        store
            .restore_key("copy", Some(Duration::from_secs(5)), &payload, true)
            .unwrap();
        assert!(store.ttl_of("copy").duration().is_some());

        assert!(store.dump_key("missing").unwrap().is_none());
        assert!(matches!(
            store.restore_key("x", None, b"not a dump", false),
            Err(StoreError::InvalidDump(_))
        ));
    }

    #[test]
    fn test_any_key() {
        let store = MemoryStore::new();
        assert_eq!(store.any_key(), None);
        store.set_value("only", Bytes::from("v"), None).unwrap();
        assert_eq!(store.any_key(), Some("only".to_string()));
    }
}
