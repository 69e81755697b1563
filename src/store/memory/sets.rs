//! Set commands.

use super::{live, page, Entry, MemoryStore, SetOp, Value};
use crate::error::StoreResult;
use crate::store::{ScanOptions, ScanPage};
use bytes::Bytes;
use rand::seq::IndexedRandom;
use std::collections::HashSet;

impl MemoryStore {
    /// `SADD`, returns the number of members added.
    pub fn set_add(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        if members.is_empty() {
            return Ok(0);
        }
        let set = Self::entry_or_insert(&mut map, key, || Value::Set(HashSet::new()))
            .value
            .as_set_mut()?;
        let added = members.iter().filter(|m| set.insert((*m).clone())).count();
        Ok(added as u64)
    }

    /// `SREM`
    pub(crate) fn set_remove(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(0);
        };
        let set = entry.value.as_set_mut()?;
        let removed = members.iter().filter(|m| set.remove(*m)).count();
        Self::drop_if_empty(&mut map, key);
        Ok(removed as u64)
    }

    /// `SPOP`: removes and returns a random member.
    pub(crate) fn set_pop(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(None);
        };
        let set = entry.value.as_set_mut()?;

        let members: Vec<&Bytes> = set.iter().collect();
        let popped = members.choose(&mut rand::rng()).map(|m| (*m).clone());
        if let Some(member) = &popped {
            set.remove(member);
        }
        Self::drop_if_empty(&mut map, key);
        Ok(popped)
    }

    /// `SMOVE`
    pub(crate) fn set_move(
        &self,
        source: &str,
        destination: &str,
        member: &[u8],
    ) -> StoreResult<bool> {
        let mut lock = self.lock_many(&[source, destination]);

        for key in [source, destination] {
            if let Some(entry) = lock.map(key).get(key) {
                entry.value.as_set()?;
            }
        }

        let src_map = lock.map(source);
        let removed = match src_map.get_mut(source) {
            Some(entry) => entry.value.as_set_mut()?.remove(member),
            None => false,
        };
        if !removed {
            return Ok(false);
        }
        Self::drop_if_empty(src_map, source);

        Self::entry_or_insert(lock.map(destination), destination, || {
            Value::Set(HashSet::new())
        })
        .value
        .as_set_mut()?
        .insert(Bytes::copy_from_slice(member));
        Ok(true)
    }

    /// `SCARD`
    pub(crate) fn set_len(&self, key: &str) -> StoreResult<u64> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_set()?.len() as u64),
            None => Ok(0),
        }
    }

    /// `SISMEMBER`
    pub(crate) fn set_contains(&self, key: &str, member: &[u8]) -> StoreResult<bool> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_set()?.contains(member)),
            None => Ok(false),
        }
    }

    /// `SMEMBERS`
    pub fn set_members(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_set()?.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    /// `SRANDMEMBER key count`. Positive counts return distinct members,
    /// negative counts may repeat them.
    pub(crate) fn set_random(&self, key: &str, count: i64) -> StoreResult<Vec<Bytes>> {
        let members = self.set_members(key)?;
        if members.is_empty() || count == 0 {
            return Ok(Vec::new());
        }

        let mut rng = rand::rng();
        let wanted = count.unsigned_abs() as usize;
        let picked = if count > 0 {
            members.choose_multiple(&mut rng, wanted).cloned().collect()
        } else {
            (0..wanted)
                .filter_map(|_| members.choose(&mut rng).cloned())
                .collect()
        };
        Ok(picked)
    }

    /// `SINTER`, `SUNION` and `SDIFF`, optionally storing the result.
    ///
    /// A stored result replaces `destination`; an empty result deletes it.
    pub(crate) fn set_combine(
        &self,
        keys: &[String],
        op: SetOp,
        destination: Option<&str>,
    ) -> StoreResult<Vec<Bytes>> {
        let mut refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        if let Some(dest) = destination {
            refs.push(dest);
        }
        let mut lock = self.lock_many(&refs);

        let mut sets = Vec::with_capacity(keys.len());
        for key in keys {
            let set = match lock.map(key).get(key.as_str()) {
                Some(entry) => Some(entry.value.as_set()?.clone()),
                None => None,
            };
            sets.push(set);
        }

        let mut iter = sets.into_iter();
        let first = iter.next().flatten().unwrap_or_default();
        let result: HashSet<Bytes> = match op {
            SetOp::Union => iter.flatten().fold(first, |mut acc, set| {
                acc.extend(set);
                acc
            }),
            SetOp::Inter => iter.fold(first, |acc, set| match set {
                Some(set) => acc.intersection(&set).cloned().collect(),
                None => HashSet::new(),
            }),
            SetOp::Diff => iter.flatten().fold(first, |acc, set| {
                acc.difference(&set).cloned().collect()
            }),
        };

        if let Some(dest) = destination {
            let dest_map = lock.map(dest);
            if result.is_empty() {
                dest_map.remove(dest);
            } else {
                dest_map.insert(dest.to_string(), Entry::new(Value::Set(result.clone())));
            }
        }

        Ok(result.into_iter().collect())
    }

    /// `SSCAN`
    pub(crate) fn set_scan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<Bytes>> {
        let members = self.set_members(key)?;
        Ok(page(members, cursor, options, |m| m.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn members(values: &[&str]) -> Vec<Bytes> {
        values.iter().map(|v| Bytes::from(v.to_string())).collect()
    }

    fn sorted(mut values: Vec<Bytes>) -> Vec<Bytes> {
        values.sort();
        values
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_and_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.set_add("s", &members(&["a", "b", "a"])).unwrap(), 2);
        assert_eq!(store.set_len("s").unwrap(), 2);
        assert!(store.set_contains("s", b"a").unwrap());
        assert_eq!(store.set_remove("s", &members(&["a", "z"])).unwrap(), 1);
        assert_eq!(store.set_remove("s", &members(&["b"])).unwrap(), 1);
        assert!(!store.exists_key("s"));
    }

    #[test]
    fn test_pop_empties_set() {
        let store = MemoryStore::new();
        store.set_add("s", &members(&["only"])).unwrap();
        assert_eq!(store.set_pop("s").unwrap(), Some(Bytes::from("only")));
        assert_eq!(store.set_pop("s").unwrap(), None);
        assert!(!store.exists_key("s"));
    }

    #[test]
    fn test_move() {
        let store = MemoryStore::new();
        store.set_add("src", &members(&["a", "b"])).unwrap();
        assert!(store.set_move("src", "dst", b"a").unwrap());
        assert!(!store.set_move("src", "dst", b"zz").unwrap());
        assert!(store.set_contains("dst", b"a").unwrap());
        assert!(!store.set_contains("src", b"a").unwrap());

        store.set_value("str", Bytes::from("v"), None).unwrap();
        assert!(matches!(
            store.set_move("src", "str", b"b"),
            Err(StoreError::WrongType)
        ));
        assert!(store.set_contains("src", b"b").unwrap());
    }

    #[test]
    fn test_algebra() {
        let store = MemoryStore::new();
        store.set_add("a", &members(&["1", "2", "3"])).unwrap();
        store.set_add("b", &members(&["2", "3", "4"])).unwrap();

        let inter = store.set_combine(&keys(&["a", "b"]), SetOp::Inter, None).unwrap();
        assert_eq!(sorted(inter), members(&["2", "3"]));

        let union = store.set_combine(&keys(&["a", "b"]), SetOp::Union, None).unwrap();
        assert_eq!(sorted(union), members(&["1", "2", "3", "4"]));

        let diff = store.set_combine(&keys(&["a", "b"]), SetOp::Diff, None).unwrap();
        assert_eq!(diff, members(&["1"]));

        let inter = store
            .set_combine(&keys(&["a", "missing"]), SetOp::Inter, None)
            .unwrap();
        assert!(inter.is_empty());
    }

    #[test]
    fn test_store_variants() {
        let store = MemoryStore::new();
        store.set_add("a", &members(&["1", "2"])).unwrap();
        store.set_add("b", &members(&["2"])).unwrap();

        let stored = store
            .set_combine(&keys(&["a", "b"]), SetOp::Union, Some("out"))
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(sorted(store.set_members("out").unwrap()), members(&["1", "2"]));

        store
            .set_combine(&keys(&["b", "a"]), SetOp::Diff, Some("out"))
            .unwrap();
        assert!(!store.exists_key("out"));
    }

    #[test]
    fn test_random_members() {
        let store = MemoryStore::new();
        store.set_add("s", &members(&["a", "b", "c"])).unwrap();

        let distinct = store.set_random("s", 10).unwrap();
        assert_eq!(sorted(distinct), members(&["a", "b", "c"]));

        let repeated = store.set_random("s", -7).unwrap();
        assert_eq!(repeated.len(), 7);

        assert!(store.set_random("missing", 3).unwrap().is_empty());
    }
}
