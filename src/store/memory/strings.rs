//! String commands.

use super::{live, Entry, MemoryStore, Value};
use crate::error::{StoreError, StoreResult};
use bytes::{Bytes, BytesMut};
use std::time::Duration;

/// Largest string `SETRANGE` and `SETBIT` may grow a value to (512 MB).
const MAX_STRING_LEN: usize = 512 * 1024 * 1024;

/// Parses a stored string as a signed 64-bit integer.
pub(crate) fn parse_int(bytes: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(StoreError::NotInteger)
}

/// Parses a stored string as a finite float.
pub(crate) fn parse_float(bytes: &[u8]) -> StoreResult<f64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| !f.is_nan())
        .ok_or(StoreError::NotFloat)
}

/// Formats a float the way increments store it: shortest round-trip form.
pub(crate) fn format_float(value: f64) -> Bytes {
    Bytes::from(value.to_string())
}

impl MemoryStore {
    /// Gets a string value.
    pub fn get_value(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let map = self.read_shard(key);
        live(&map, key)
            .map(|e| e.value.as_str().cloned())
            .transpose()
    }

    /// Sets a string value, replacing whatever was stored at `key`.
    pub fn set_value(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> StoreResult<()> {
        let entry = Entry::with_ttl(Value::Str(value), ttl)?;
        let mut map = self.write_shard(key);
        map.insert(key.to_string(), entry);
        Ok(())
    }

    /// Sets a string value only if `key` does not exist.
    pub fn set_value_nx(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let entry = Entry::with_ttl(Value::Str(value), ttl)?;
        let mut map = self.write_shard(key);
        if map.contains_key(key) {
            return Ok(false);
        }
        map.insert(key.to_string(), entry);
        Ok(true)
    }

    /// `GETRANGE`. Out of range indices are clamped.
    pub(crate) fn value_range(&self, key: &str, start: i64, end: i64) -> StoreResult<Bytes> {
        let Some(value) = self.get_value(key)? else {
            return Ok(Bytes::new());
        };

        let len = value.len() as i64;
        if len == 0 {
            return Ok(Bytes::new());
        }
        let start = if start < 0 { (len + start).max(0) } else { start };
        let end = if end < 0 { (len + end).max(0) } else { end.min(len - 1) };
        if start > end || start >= len {
            return Ok(Bytes::new());
        }
        Ok(value.slice(start as usize..=end as usize))
    }

    /// `SETRANGE`. Pads with zero bytes if `offset` is past the end.
    pub(crate) fn overwrite_range(
        &self,
        key: &str,
        offset: usize,
        value: &[u8],
    ) -> StoreResult<usize> {
        let new_len = offset
            .checked_add(value.len())
            .filter(|len| *len <= MAX_STRING_LEN)
            .ok_or(StoreError::OffsetOutOfRange)?;

        let mut map = self.write_shard(key);
        let current = match map.get(key) {
            Some(entry) => entry.value.as_str()?.clone(),
            None if value.is_empty() => return Ok(0),
            None => Bytes::new(),
        };
        if value.is_empty() {
            return Ok(current.len());
        }

        let mut buf = BytesMut::from(current.as_ref());
        if buf.len() < new_len {
            buf.resize(new_len, 0);
        }
        buf[offset..new_len].copy_from_slice(value);
        let len = buf.len();

        Self::store_string(&mut map, key, buf.freeze());
        Ok(len)
    }

    /// `GETSET`. The new value is persistent.
    pub(crate) fn replace_value(&self, key: &str, value: Bytes) -> StoreResult<Option<Bytes>> {
        let mut map = self.write_shard(key);
        let old = match map.get(key) {
            Some(entry) => Some(entry.value.as_str()?.clone()),
            None => None,
        };
        map.insert(key.to_string(), Entry::new(Value::Str(value)));
        Ok(old)
    }

    /// `MGET`. Missing keys and non-strings read as `None`.
    pub(crate) fn get_values(&self, keys: &[String]) -> Vec<Option<Bytes>> {
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let mut lock = self.lock_many(&refs);
        refs.iter()
            .map(|key| {
                live(lock.map(key), key).and_then(|e| e.value.as_str().ok().cloned())
            })
            .collect()
    }

    /// `MSET` or, with `only_if_none_exist`, `MSETNX`.
    pub(crate) fn set_values(&self, pairs: &[(String, Bytes)], only_if_none_exist: bool) -> bool {
        let refs: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        let mut lock = self.lock_many(&refs);

        if only_if_none_exist && refs.iter().any(|key| lock.map(key).contains_key(*key)) {
            return false;
        }
        for (key, value) in pairs {
            lock.map(key)
                .insert(key.clone(), Entry::new(Value::Str(value.clone())));
        }
        true
    }

    /// `INCRBY`. Missing keys count as 0 and the TTL is kept.
    pub(crate) fn increment(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let mut map = self.write_shard(key);
        let current = match map.get(key) {
            Some(entry) => parse_int(entry.value.as_str()?)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(StoreError::Overflow)?;
        Self::store_string(&mut map, key, Bytes::from(next.to_string()));
        Ok(next)
    }

    /// `INCRBYFLOAT`. Missing keys count as 0 and the TTL is kept.
    pub(crate) fn increment_float(&self, key: &str, delta: f64) -> StoreResult<f64> {
        let mut map = self.write_shard(key);
        let current = match map.get(key) {
            Some(entry) => parse_float(entry.value.as_str()?)?,
            None => 0.0,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Err(StoreError::NotFloat);
        }
        Self::store_string(&mut map, key, format_float(next));
        Ok(next)
    }

    /// `APPEND`, returns the new length.
    pub(crate) fn append_value(&self, key: &str, value: &[u8]) -> StoreResult<usize> {
        let mut map = self.write_shard(key);
        let mut buf = match map.get(key) {
            Some(entry) => BytesMut::from(entry.value.as_str()?.as_ref()),
            None => BytesMut::new(),
        };
        buf.extend_from_slice(value);
        let len = buf.len();
        Self::store_string(&mut map, key, buf.freeze());
        Ok(len)
    }

    /// `STRLEN`
    pub(crate) fn value_len(&self, key: &str) -> StoreResult<usize> {
        Ok(self.get_value(key)?.map(|v| v.len()).unwrap_or(0))
    }

    /// `GETBIT`. Bit 0 is the most significant bit of the first byte.
    pub(crate) fn bit_at(&self, key: &str, offset: u64) -> StoreResult<bool> {
        let Some(value) = self.get_value(key)? else {
            return Ok(false);
        };
        let byte = (offset / 8) as usize;
        let mask = 0x80u8 >> (offset % 8);
        Ok(value.get(byte).is_some_and(|b| b & mask != 0))
    }

    /// `SETBIT`, returns the previous bit.
    pub(crate) fn write_bit(&self, key: &str, offset: u64, on: bool) -> StoreResult<bool> {
        let byte = usize::try_from(offset / 8)
            .ok()
            .filter(|b| *b < MAX_STRING_LEN)
            .ok_or(StoreError::OffsetOutOfRange)?;
        let mask = 0x80u8 >> (offset % 8);

        let mut map = self.write_shard(key);
        let mut buf = match map.get(key) {
            Some(entry) => BytesMut::from(entry.value.as_str()?.as_ref()),
            None => BytesMut::new(),
        };
        if buf.len() <= byte {
            buf.resize(byte + 1, 0);
        }

        let previous = buf[byte] & mask != 0;
        if on {
            buf[byte] |= mask;
        } else {
            buf[byte] &= !mask;
        }
        Self::store_string(&mut map, key, buf.freeze());
        Ok(previous)
    }

    /// Replaces the string at `key`, keeping any TTL it had.
    fn store_string(map: &mut super::ShardMap, key: &str, value: Bytes) {
        match map.get_mut(key) {
            Some(entry) => entry.value = Value::Str(value),
            None => {
                map.insert(key.to_string(), Entry::new(Value::Str(value)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KeyTtl;

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set_value("key", Bytes::from("value"), None).unwrap();
        assert_eq!(store.get_value("key").unwrap(), Some(Bytes::from("value")));
        assert_eq!(store.get_value("missing").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set_value("key", Bytes::from("value1"), None).unwrap();
        store.set_value("key", Bytes::from("value2"), None).unwrap();
        assert_eq!(store.get_value("key").unwrap(), Some(Bytes::from("value2")));
    }

    #[test]
    fn test_get_wrong_type() {
        let store = MemoryStore::new();
        store.list_push("list", &[Bytes::from("a")], true, false).unwrap();
        assert!(matches!(store.get_value("list"), Err(StoreError::WrongType)));
    }

    #[test]
    fn test_set_nx() {
        let store = MemoryStore::new();
        assert!(store.set_value_nx("key", Bytes::from("v1"), None).unwrap());
        assert!(!store.set_value_nx("key", Bytes::from("v2"), None).unwrap());
        assert_eq!(store.get_value("key").unwrap(), Some(Bytes::from("v1")));
    }

    #[test]
    fn test_set_with_ttl() {
        let store = MemoryStore::new();
        store.set_value("key", Bytes::from("v"), Some(Duration::from_millis(50))).unwrap();
        assert!(store.exists_key("key"));

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(store.get_value("key").unwrap(), None);
    }

    #[test]
    fn test_incr() {
        let store = MemoryStore::new();
        assert_eq!(store.increment("counter", 1).unwrap(), 1);
        assert_eq!(store.increment("counter", 1).unwrap(), 2);
        assert_eq!(store.increment("counter", -5).unwrap(), -3);

        store.set_value("text", Bytes::from("abc"), None).unwrap();
        assert!(matches!(store.increment("text", 1), Err(StoreError::NotInteger)));

        store.set_value("big", Bytes::from(i64::MAX.to_string()), None).unwrap();
        assert!(matches!(store.increment("big", 1), Err(StoreError::Overflow)));
    }

    #[test]
    fn test_incr_keeps_ttl() {
        let store = MemoryStore::new();
        store.set_value("n", Bytes::from("1"), Some(Duration::from_secs(100))).unwrap();
        store.increment("n", 1).unwrap();
        assert!(store.ttl_of("n").duration().is_some());
    }

    #[test]
    fn test_incr_float() {
        let store = MemoryStore::new();
        store.set_value("f", Bytes::from("10.5"), None).unwrap();
        assert_eq!(store.increment_float("f", 0.25).unwrap(), 10.75);
        assert_eq!(store.get_value("f").unwrap(), Some(Bytes::from("10.75")));

        store.set_value("bad", Bytes::from("x"), None).unwrap();
        assert!(matches!(store.increment_float("bad", 1.0), Err(StoreError::NotFloat)));
    }

    #[test]
    fn test_getset_clears_ttl() {
        let store = MemoryStore::new();
        store.set_value("k", Bytes::from("old"), Some(Duration::from_secs(100))).unwrap();
        let old = store.replace_value("k", Bytes::from("new")).unwrap();
        assert_eq!(old, Some(Bytes::from("old")));
        assert_eq!(store.ttl_of("k"), KeyTtl::Persistent);
        assert_eq!(store.replace_value("fresh", Bytes::from("v")).unwrap(), None);
    }

    #[test]
    fn test_get_range() {
        let store = MemoryStore::new();
        store.set_value("k", Bytes::from("This is a string"), None).unwrap();
        assert_eq!(store.value_range("k", 0, 3).unwrap(), Bytes::from("This"));
        assert_eq!(store.value_range("k", -3, -1).unwrap(), Bytes::from("ing"));
        assert_eq!(
            store.value_range("k", 0, -1).unwrap(),
            Bytes::from("This is a string")
        );
        assert_eq!(store.value_range("k", 10, 100).unwrap(), Bytes::from("string"));
        assert_eq!(store.value_range("k", 5, 2).unwrap(), Bytes::new());
        assert_eq!(store.value_range("missing", 0, -1).unwrap(), Bytes::new());
    }

    #[test]
    fn test_set_range_pads() {
        let store = MemoryStore::new();
        store.set_value("k", Bytes::from("Hello World"), None).unwrap();
        assert_eq!(store.overwrite_range("k", 6, b"Redis").unwrap(), 11);
        assert_eq!(store.get_value("k").unwrap(), Some(Bytes::from("Hello Redis")));

        assert_eq!(store.overwrite_range("pad", 3, b"x").unwrap(), 4);
        assert_eq!(
            store.get_value("pad").unwrap(),
            Some(Bytes::from_static(b"\0\0\0x"))
        );
    }

    #[test]
    fn test_mset_mget() {
        let store = MemoryStore::new();
        let pairs = vec![
            ("a".to_string(), Bytes::from("1")),
            ("b".to_string(), Bytes::from("2")),
        ];
        assert!(store.set_values(&pairs, false));

        let values = store.get_values(&["a".to_string(), "x".to_string(), "b".to_string()]);
        assert_eq!(values, vec![Some(Bytes::from("1")), None, Some(Bytes::from("2"))]);

        let pairs = vec![
            ("b".to_string(), Bytes::from("new")),
            ("c".to_string(), Bytes::from("3")),
        ];
        assert!(!store.set_values(&pairs, true));
        assert!(!store.exists_key("c"));
    }

    #[test]
    fn test_append_and_strlen() {
        let store = MemoryStore::new();
        assert_eq!(store.append_value("k", b"Hello").unwrap(), 5);
        assert_eq!(store.append_value("k", b" World").unwrap(), 11);
        assert_eq!(store.value_len("k").unwrap(), 11);
        assert_eq!(store.value_len("missing").unwrap(), 0);
    }

    #[test]
    fn test_bits() {
        let store = MemoryStore::new();
        assert!(!store.write_bit("b", 7, true).unwrap());
        assert!(store.bit_at("b", 7).unwrap());
        assert!(!store.bit_at("b", 0).unwrap());
        assert!(!store.bit_at("b", 100).unwrap());
        assert_eq!(store.get_value("b").unwrap(), Some(Bytes::from_static(&[1u8])));

        assert!(store.write_bit("b", 7, false).unwrap());
        assert!(!store.bit_at("b", 7).unwrap());
    }
}
