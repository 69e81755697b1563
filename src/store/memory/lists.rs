//! List commands.

use super::{live, normalize_index, normalize_range, MemoryStore, Value};
use crate::error::{StoreError, StoreResult};
use crate::store::InsertPosition;
use bytes::Bytes;
use std::collections::VecDeque;

impl MemoryStore {
    /// `LINDEX`
    pub(crate) fn list_index(&self, key: &str, index: i64) -> StoreResult<Option<Bytes>> {
        let map = self.read_shard(key);
        let Some(entry) = live(&map, key) else {
            return Ok(None);
        };
        let list = entry.value.as_list()?;
        Ok(normalize_index(index, list.len()).and_then(|i| list.get(i).cloned()))
    }

    /// `LRANGE`
    pub(crate) fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        let map = self.read_shard(key);
        let Some(entry) = live(&map, key) else {
            return Ok(Vec::new());
        };
        let list = entry.value.as_list()?;
        Ok(match normalize_range(start, stop, list.len()) {
            Some((start, stop)) => list.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }

    /// `LPUSH`/`RPUSH`, or the `X` variants with `only_existing`.
    ///
    /// Returns the new length.
    pub fn list_push(
        &self,
        key: &str,
        values: &[Bytes],
        left: bool,
        only_existing: bool,
    ) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        if only_existing && !map.contains_key(key) {
            return Ok(0);
        }
        if values.is_empty() {
            return match map.get(key) {
                Some(entry) => Ok(entry.value.as_list()?.len() as u64),
                None => Ok(0),
            };
        }

        let list = Self::entry_or_insert(&mut map, key, || Value::List(VecDeque::new()))
            .value
            .as_list_mut()?;
        for value in values {
            if left {
                list.push_front(value.clone());
            } else {
                list.push_back(value.clone());
            }
        }
        Ok(list.len() as u64)
    }

    /// `LINSERT`. The pivot is matched by value.
    pub(crate) fn list_insert(
        &self,
        key: &str,
        position: InsertPosition,
        pivot: &[u8],
        value: Bytes,
    ) -> StoreResult<i64> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(0);
        };
        let list = entry.value.as_list_mut()?;

        let Some(at) = list.iter().position(|item| item.as_ref() == pivot) else {
            return Ok(-1);
        };
        let at = match position {
            InsertPosition::Before => at,
            InsertPosition::After => at + 1,
        };
        list.insert(at, value);
        Ok(list.len() as i64)
    }

    /// `LSET`
    pub(crate) fn list_set(&self, key: &str, index: i64, value: Bytes) -> StoreResult<()> {
        let mut map = self.write_shard(key);
        let entry = map.get_mut(key).ok_or(StoreError::NoSuchKey)?;
        let list = entry.value.as_list_mut()?;
        let i = normalize_index(index, list.len()).ok_or(StoreError::IndexOutOfRange)?;
        list[i] = value;
        Ok(())
    }

    /// `LPOP`/`RPOP`
    pub(crate) fn list_pop(&self, key: &str, left: bool) -> StoreResult<Option<Bytes>> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(None);
        };
        let list = entry.value.as_list_mut()?;
        let popped = if left {
            list.pop_front()
        } else {
            list.pop_back()
        };
        Self::drop_if_empty(&mut map, key);
        Ok(popped)
    }

    /// `RPOPLPUSH`: moves the tail of `source` to the head of `destination`.
    pub(crate) fn list_rotate(&self, source: &str, destination: &str) -> StoreResult<Option<Bytes>> {
        let mut lock = self.lock_many(&[source, destination]);

        if !lock.map(source).contains_key(source) {
            return Ok(None);
        }
        // Both sides must be lists before anything is popped.
        for key in [source, destination] {
            if let Some(entry) = lock.map(key).get(key) {
                entry.value.as_list()?;
            }
        }

        let src_map = lock.map(source);
        let popped = match src_map.get_mut(source) {
            Some(entry) => entry.value.as_list_mut()?.pop_back(),
            None => None,
        };
        Self::drop_if_empty(src_map, source);

        let Some(value) = popped else {
            return Ok(None);
        };
        let dst_map = lock.map(destination);
        Self::entry_or_insert(dst_map, destination, || Value::List(VecDeque::new()))
            .value
            .as_list_mut()?
            .push_front(value.clone());
        Ok(Some(value))
    }

    /// `LREM`. Positive counts remove from the head, negative from the tail,
    /// zero removes every match.
    pub(crate) fn list_remove(&self, key: &str, count: i64, value: &[u8]) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(0);
        };
        let list = entry.value.as_list_mut()?;

        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs() as usize
        };
        let mut removed = 0usize;

        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i].as_ref() == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i].as_ref() == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }

        Self::drop_if_empty(&mut map, key);
        Ok(removed as u64)
    }

    /// `LTRIM`. An empty range deletes the list.
    pub(crate) fn list_trim(&self, key: &str, start: i64, stop: i64) -> StoreResult<()> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(());
        };
        let list = entry.value.as_list_mut()?;

        match normalize_range(start, stop, list.len()) {
            Some((start, stop)) => {
                list.truncate(stop + 1);
                list.drain(..start);
            }
            None => list.clear(),
        }
        Self::drop_if_empty(&mut map, key);
        Ok(())
    }

    /// `LLEN`
    pub(crate) fn list_len(&self, key: &str) -> StoreResult<u64> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_list()?.len() as u64),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: &[&str]) -> Vec<Bytes> {
        values.iter().map(|v| Bytes::from(v.to_string())).collect()
    }

    #[test]
    fn test_push_order() {
        let store = MemoryStore::new();
        assert_eq!(store.list_push("l", &items(&["a", "b"]), true, false).unwrap(), 2);
        assert_eq!(store.list_push("l", &items(&["c"]), false, false).unwrap(), 3);
        assert_eq!(store.list_range("l", 0, -1).unwrap(), items(&["b", "a", "c"]));
    }

    #[test]
    fn test_pushx_requires_existing() {
        let store = MemoryStore::new();
        assert_eq!(store.list_push("l", &items(&["a"]), true, true).unwrap(), 0);
        assert!(!store.exists_key("l"));
    }

    #[test]
    fn test_range_and_index() {
        let store = MemoryStore::new();
        store
            .list_push("l", &items(&["a", "b", "c", "d"]), false, false)
            .unwrap();
        assert_eq!(store.list_range("l", 1, 2).unwrap(), items(&["b", "c"]));
        assert_eq!(store.list_range("l", -2, -1).unwrap(), items(&["c", "d"]));
        assert!(store.list_range("l", 5, 10).unwrap().is_empty());
        assert_eq!(store.list_index("l", -1).unwrap(), Some(Bytes::from("d")));
        assert_eq!(store.list_index("l", 10).unwrap(), None);
    }

    #[test]
    fn test_pop_deletes_empty_list() {
        let store = MemoryStore::new();
        store.list_push("l", &items(&["a", "b"]), false, false).unwrap();
        assert_eq!(store.list_pop("l", true).unwrap(), Some(Bytes::from("a")));
        assert_eq!(store.list_pop("l", false).unwrap(), Some(Bytes::from("b")));
        assert_eq!(store.list_pop("l", false).unwrap(), None);
        assert!(!store.exists_key("l"));
    }

    #[test]
    fn test_insert_around_pivot() {
        let store = MemoryStore::new();
        store.list_push("l", &items(&["a", "c"]), false, false).unwrap();
        assert_eq!(
            store
                .list_insert("l", InsertPosition::Before, b"c", Bytes::from("b"))
                .unwrap(),
            3
        );
        assert_eq!(
            store
                .list_insert("l", InsertPosition::After, b"c", Bytes::from("d"))
                .unwrap(),
            4
        );
        assert_eq!(store.list_range("l", 0, -1).unwrap(), items(&["a", "b", "c", "d"]));
        assert_eq!(
            store
                .list_insert("l", InsertPosition::After, b"zz", Bytes::from("x"))
                .unwrap(),
            -1
        );
        assert_eq!(
            store
                .list_insert("missing", InsertPosition::After, b"a", Bytes::from("x"))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_set_index() {
        let store = MemoryStore::new();
        store.list_push("l", &items(&["a", "b"]), false, false).unwrap();
        store.list_set("l", -1, Bytes::from("z")).unwrap();
        assert_eq!(store.list_range("l", 0, -1).unwrap(), items(&["a", "z"]));
        assert!(matches!(
            store.list_set("l", 5, Bytes::from("x")),
            Err(StoreError::IndexOutOfRange)
        ));
        assert!(matches!(
            store.list_set("missing", 0, Bytes::from("x")),
            Err(StoreError::NoSuchKey)
        ));
    }

    #[test]
    fn test_rotate() {
        let store = MemoryStore::new();
        store.list_push("src", &items(&["a", "b"]), false, false).unwrap();
        assert_eq!(store.list_rotate("src", "dst").unwrap(), Some(Bytes::from("b")));
        assert_eq!(store.list_rotate("src", "dst").unwrap(), Some(Bytes::from("a")));
        assert_eq!(store.list_rotate("src", "dst").unwrap(), None);
        assert_eq!(store.list_range("dst", 0, -1).unwrap(), items(&["a", "b"]));
        assert!(!store.exists_key("src"));

        assert_eq!(store.list_rotate("dst", "dst").unwrap(), Some(Bytes::from("b")));
        assert_eq!(store.list_range("dst", 0, -1).unwrap(), items(&["b", "a"]));
    }

    #[test]
    fn test_remove_directions() {
        let store = MemoryStore::new();
        store
            .list_push("l", &items(&["x", "a", "x", "b", "x"]), false, false)
            .unwrap();
        assert_eq!(store.list_remove("l", -1, b"x").unwrap(), 1);
        assert_eq!(store.list_range("l", 0, -1).unwrap(), items(&["x", "a", "x", "b"]));
        assert_eq!(store.list_remove("l", 1, b"x").unwrap(), 1);
        assert_eq!(store.list_range("l", 0, -1).unwrap(), items(&["a", "x", "b"]));
        assert_eq!(store.list_remove("l", 0, b"x").unwrap(), 1);
        assert_eq!(store.list_range("l", 0, -1).unwrap(), items(&["a", "b"]));
    }

    #[test]
    fn test_trim() {
        let store = MemoryStore::new();
        store
            .list_push("l", &items(&["a", "b", "c", "d"]), false, false)
            .unwrap();
        store.list_trim("l", 1, -2).unwrap();
        assert_eq!(store.list_range("l", 0, -1).unwrap(), items(&["b", "c"]));
        store.list_trim("l", 5, 10).unwrap();
        assert!(!store.exists_key("l"));
        assert_eq!(store.list_len("l").unwrap(), 0);
    }
}
