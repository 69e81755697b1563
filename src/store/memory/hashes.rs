//! Hash commands.

use super::strings::{format_float, parse_float, parse_int};
use super::{live, page, MemoryStore, Value};
use crate::error::{StoreError, StoreResult};
use crate::store::{ScanOptions, ScanPage};
use bytes::Bytes;
use std::collections::HashMap;

impl MemoryStore {
    /// `HGET`
    pub fn hash_get(&self, key: &str, field: &[u8]) -> StoreResult<Option<Bytes>> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_hash()?.get(field).cloned()),
            None => Ok(None),
        }
    }

    /// `HGETALL`
    pub(crate) fn hash_entries(&self, key: &str) -> StoreResult<Vec<(Bytes, Bytes)>> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry
                .value
                .as_hash()?
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// `HMGET`
    pub(crate) fn hash_get_many(
        &self,
        key: &str,
        fields: &[Bytes],
    ) -> StoreResult<Vec<Option<Bytes>>> {
        let map = self.read_shard(key);
        let hash = match live(&map, key) {
            Some(entry) => entry.value.as_hash()?,
            None => return Ok(vec![None; fields.len()]),
        };
        Ok(fields.iter().map(|f| hash.get(f).cloned()).collect())
    }

    /// `HSET`, returns the number of fields that were added.
    pub fn hash_put(&self, key: &str, pairs: &[(Bytes, Bytes)]) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        if pairs.is_empty() {
            return Ok(0);
        }
        let hash = Self::entry_or_insert(&mut map, key, || Value::Hash(HashMap::new()))
            .value
            .as_hash_mut()?;

        let added = pairs
            .iter()
            .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
            .count();
        Ok(added as u64)
    }

    /// `HSETNX`
    pub(crate) fn hash_put_nx(&self, key: &str, field: Bytes, value: Bytes) -> StoreResult<bool> {
        let mut map = self.write_shard(key);
        let hash = Self::entry_or_insert(&mut map, key, || Value::Hash(HashMap::new()))
            .value
            .as_hash_mut()?;
        if hash.contains_key(&field) {
            return Ok(false);
        }
        hash.insert(field, value);
        Ok(true)
    }

    /// `HDEL`
    pub(crate) fn hash_delete(&self, key: &str, fields: &[Bytes]) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(0);
        };
        let hash = entry.value.as_hash_mut()?;
        let removed = fields.iter().filter(|f| hash.remove(*f).is_some()).count();
        Self::drop_if_empty(&mut map, key);
        Ok(removed as u64)
    }

    /// `HINCRBY`
    pub(crate) fn hash_increment(&self, key: &str, field: &[u8], delta: i64) -> StoreResult<i64> {
        let mut map = self.write_shard(key);
        let hash = Self::entry_or_insert(&mut map, key, || Value::Hash(HashMap::new()))
            .value
            .as_hash_mut()?;

        let current = match hash.get(field) {
            Some(v) => parse_int(v)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(StoreError::Overflow)?;
        hash.insert(Bytes::copy_from_slice(field), Bytes::from(next.to_string()));
        Ok(next)
    }

    /// `HINCRBYFLOAT`
    pub(crate) fn hash_increment_float(
        &self,
        key: &str,
        field: &[u8],
        delta: f64,
    ) -> StoreResult<f64> {
        let mut map = self.write_shard(key);
        let hash = Self::entry_or_insert(&mut map, key, || Value::Hash(HashMap::new()))
            .value
            .as_hash_mut()?;

        let current = match hash.get(field) {
            Some(v) => parse_float(v)?,
            None => 0.0,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Err(StoreError::NotFloat);
        }
        hash.insert(Bytes::copy_from_slice(field), format_float(next));
        Ok(next)
    }

    /// `HLEN`
    pub(crate) fn hash_len(&self, key: &str) -> StoreResult<u64> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_hash()?.len() as u64),
            None => Ok(0),
        }
    }

    /// `HSCAN`. The pattern applies to field names.
    pub(crate) fn hash_scan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<(Bytes, Bytes)>> {
        let entries = self.hash_entries(key)?;
        Ok(page(entries, cursor, options, |(field, _)| field.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(f: &str, v: &str) -> (Bytes, Bytes) {
        (Bytes::from(f.to_string()), Bytes::from(v.to_string()))
    }

    #[test]
    fn test_put_counts_new_fields() {
        let store = MemoryStore::new();
        assert_eq!(store.hash_put("h", &[pair("a", "1"), pair("b", "2")]).unwrap(), 2);
        assert_eq!(store.hash_put("h", &[pair("a", "3"), pair("c", "4")]).unwrap(), 1);
        assert_eq!(store.hash_get("h", b"a").unwrap(), Some(Bytes::from("3")));
        assert_eq!(store.hash_len("h").unwrap(), 3);
    }

    #[test]
    fn test_put_nx() {
        let store = MemoryStore::new();
        assert!(store.hash_put_nx("h", Bytes::from("f"), Bytes::from("1")).unwrap());
        assert!(!store.hash_put_nx("h", Bytes::from("f"), Bytes::from("2")).unwrap());
        assert_eq!(store.hash_get("h", b"f").unwrap(), Some(Bytes::from("1")));
    }

    #[test]
    fn test_get_many() {
        let store = MemoryStore::new();
        store.hash_put("h", &[pair("a", "1")]).unwrap();
        let values = store
            .hash_get_many("h", &[Bytes::from("a"), Bytes::from("z")])
            .unwrap();
        assert_eq!(values, vec![Some(Bytes::from("1")), None]);
        assert_eq!(
            store.hash_get_many("missing", &[Bytes::from("a")]).unwrap(),
            vec![None]
        );
    }

    #[test]
    fn test_delete_removes_empty_hash() {
        let store = MemoryStore::new();
        store.hash_put("h", &[pair("a", "1"), pair("b", "2")]).unwrap();
        assert_eq!(
            store
                .hash_delete("h", &[Bytes::from("a"), Bytes::from("x")])
                .unwrap(),
            1
        );
        assert_eq!(store.hash_delete("h", &[Bytes::from("b")]).unwrap(), 1);
        assert!(!store.exists_key("h"));
    }

    #[test]
    fn test_increments() {
        let store = MemoryStore::new();
        assert_eq!(store.hash_increment("h", b"n", 5).unwrap(), 5);
        assert_eq!(store.hash_increment("h", b"n", -2).unwrap(), 3);
        assert_eq!(store.hash_increment_float("h", b"f", 1.5).unwrap(), 1.5);

        store.hash_put("h", &[pair("s", "abc")]).unwrap();
        assert!(matches!(
            store.hash_increment("h", b"s", 1),
            Err(StoreError::NotInteger)
        ));
    }

    #[test]
    fn test_wrong_type() {
        let store = MemoryStore::new();
        store.set_value("s", Bytes::from("v"), None).unwrap();
        assert!(matches!(
            store.hash_put("s", &[pair("a", "1")]),
            Err(StoreError::WrongType)
        ));
    }

    #[test]
    fn test_scan_all_fields() {
        let store = MemoryStore::new();
        let pairs: Vec<_> = (0..30).map(|i| pair(&format!("f{i:02}"), "v")).collect();
        store.hash_put("h", &pairs).unwrap();

        let options = ScanOptions::new().count(7);
        let mut cursor = 0;
        let mut fields = Vec::new();
        loop {
            let page = store.hash_scan("h", cursor, &options).unwrap();
            fields.extend(page.items.into_iter().map(|(f, _)| f));
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(fields.len(), 30);
    }
}
