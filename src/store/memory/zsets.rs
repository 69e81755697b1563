//! Sorted set commands and the [`SortedSet`] value type.

use super::{live, normalize_range, page, Entry, MemoryStore, Value};
use crate::error::{StoreError, StoreResult};
use crate::store::{Limit, ScanOptions, ScanPage, ScoreRange, ScoredMember};
use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// An `f64` with a total order, so it can key a `BTreeSet`.
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Members ordered by `(score, member)`, with O(1) score lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct SortedSet {
    scores: HashMap<Bytes, f64>,
    order: BTreeSet<(Score, Bytes)>,
}

impl SortedSet {
    /// Adds or updates a member. Returns true if it was new.
    pub(crate) fn insert(&mut self, member: Bytes, score: f64) -> bool {
        match self.scores.insert(member.clone(), score) {
            Some(old) => {
                self.order.remove(&(Score(old), member.clone()));
                self.order.insert((Score(score), member));
                false
            }
            None => {
                self.order.insert((Score(score), member));
                true
            }
        }
    }

    pub(crate) fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.remove_entry(member) {
            Some((member, score)) => {
                self.order.remove(&(Score(score), member));
                true
            }
            None => false,
        }
    }

    pub(crate) fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// 0-based position in ascending order.
    pub(crate) fn rank(&self, member: &[u8]) -> Option<usize> {
        let score = self.score(member)?;
        Some(
            self.order
                .range(..(Score(score), Bytes::copy_from_slice(member)))
                .count(),
        )
    }

    pub(crate) fn len(&self) -> usize {
        self.scores.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Members in ascending `(score, member)` order.
    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = (&Bytes, f64)> + '_ {
        self.order.iter().map(|(score, member)| (member, score.0))
    }
}

fn scored(member: &Bytes, score: f64) -> ScoredMember {
    ScoredMember::new(member.clone(), score)
}

impl MemoryStore {
    /// `ZADD`. NaN scores are rejected before anything is written.
    pub fn zset_add(&self, key: &str, members: &[ScoredMember]) -> StoreResult<u64> {
        if members.iter().any(|m| m.score.is_nan()) {
            return Err(StoreError::NotFloat);
        }

        let mut map = self.write_shard(key);
        if members.is_empty() {
            return Ok(0);
        }
        let zset = Self::entry_or_insert(&mut map, key, || Value::ZSet(SortedSet::default()))
            .value
            .as_zset_mut()?;

        let added = members
            .iter()
            .filter(|m| zset.insert(m.member.clone(), m.score))
            .count();
        Ok(added as u64)
    }

    /// `ZREM`
    pub(crate) fn zset_remove(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(0);
        };
        let zset = entry.value.as_zset_mut()?;
        let removed = members.iter().filter(|m| zset.remove(m)).count();
        Self::drop_if_empty(&mut map, key);
        Ok(removed as u64)
    }

    /// `ZINCRBY`
    pub(crate) fn zset_increment(&self, key: &str, delta: f64, member: Bytes) -> StoreResult<f64> {
        let mut map = self.write_shard(key);
        let zset = Self::entry_or_insert(&mut map, key, || Value::ZSet(SortedSet::default()))
            .value
            .as_zset_mut()?;

        let next = zset.score(&member).unwrap_or(0.0) + delta;
        if next.is_nan() {
            Self::drop_if_empty(&mut map, key);
            return Err(StoreError::NotFloat);
        }
        zset.insert(member, next);
        Ok(next)
    }

    /// `ZRANK`/`ZREVRANK`
    pub(crate) fn zset_rank(&self, key: &str, member: &[u8], rev: bool) -> StoreResult<Option<u64>> {
        let map = self.read_shard(key);
        let Some(entry) = live(&map, key) else {
            return Ok(None);
        };
        let zset = entry.value.as_zset()?;
        Ok(zset.rank(member).map(|rank| {
            let rank = if rev { zset.len() - 1 - rank } else { rank };
            rank as u64
        }))
    }

    /// `ZRANGE`/`ZREVRANGE` with scores.
    pub(crate) fn zset_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        rev: bool,
    ) -> StoreResult<Vec<ScoredMember>> {
        let map = self.read_shard(key);
        let Some(entry) = live(&map, key) else {
            return Ok(Vec::new());
        };
        let zset = entry.value.as_zset()?;
        let Some((start, stop)) = normalize_range(start, stop, zset.len()) else {
            return Ok(Vec::new());
        };

        let take = stop - start + 1;
        let members = if rev {
            zset.iter()
                .rev()
                .skip(start)
                .take(take)
                .map(|(m, s)| scored(m, s))
                .collect()
        } else {
            zset.iter()
                .skip(start)
                .take(take)
                .map(|(m, s)| scored(m, s))
                .collect()
        };
        Ok(members)
    }

    /// `ZRANGEBYSCORE`/`ZREVRANGEBYSCORE` with scores.
    pub(crate) fn zset_range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        limit: Option<Limit>,
        rev: bool,
    ) -> StoreResult<Vec<ScoredMember>> {
        let map = self.read_shard(key);
        let Some(entry) = live(&map, key) else {
            return Ok(Vec::new());
        };
        let zset = entry.value.as_zset()?;

        let (offset, count) = limit
            .map(|l| (l.offset, l.count))
            .unwrap_or((0, usize::MAX));
        let in_range = |&(_, score): &(&Bytes, f64)| range.contains(score);

        let members = if rev {
            zset.iter()
                .rev()
                .filter(in_range)
                .skip(offset)
                .take(count)
                .map(|(m, s)| scored(m, s))
                .collect()
        } else {
            zset.iter()
                .filter(in_range)
                .skip(offset)
                .take(count)
                .map(|(m, s)| scored(m, s))
                .collect()
        };
        Ok(members)
    }

    /// `ZCARD`
    pub(crate) fn zset_len(&self, key: &str) -> StoreResult<u64> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_zset()?.len() as u64),
            None => Ok(0),
        }
    }

    /// `ZSCORE`
    pub fn zset_score(&self, key: &str, member: &[u8]) -> StoreResult<Option<f64>> {
        let map = self.read_shard(key);
        match live(&map, key) {
            Some(entry) => Ok(entry.value.as_zset()?.score(member)),
            None => Ok(None),
        }
    }

    /// `ZREMRANGEBYRANK`
    pub(crate) fn zset_remove_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<u64> {
        self.zset_remove_where(key, |zset| match normalize_range(start, stop, zset.len()) {
            Some((start, stop)) => zset
                .iter()
                .skip(start)
                .take(stop - start + 1)
                .map(|(m, _)| m.clone())
                .collect(),
            None => Vec::new(),
        })
    }

    /// `ZREMRANGEBYSCORE`
    pub(crate) fn zset_remove_by_score(&self, key: &str, range: ScoreRange) -> StoreResult<u64> {
        self.zset_remove_where(key, |zset| {
            zset.iter()
                .filter(|(_, score)| range.contains(*score))
                .map(|(m, _)| m.clone())
                .collect()
        })
    }

    fn zset_remove_where(
        &self,
        key: &str,
        select: impl FnOnce(&SortedSet) -> Vec<Bytes>,
    ) -> StoreResult<u64> {
        let mut map = self.write_shard(key);
        let Some(entry) = map.get_mut(key) else {
            return Ok(0);
        };
        let zset = entry.value.as_zset_mut()?;
        let doomed = select(zset);
        for member in &doomed {
            zset.remove(member);
        }
        Self::drop_if_empty(&mut map, key);
        Ok(doomed.len() as u64)
    }

    /// `ZUNIONSTORE`/`ZINTERSTORE` with SUM aggregation and unit weights.
    ///
    /// Plain sets take part with every member scored 1.
    pub(crate) fn zset_combine_store(
        &self,
        destination: &str,
        keys: &[String],
        intersect: bool,
    ) -> StoreResult<u64> {
        let mut refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        refs.push(destination);
        let mut lock = self.lock_many(&refs);

        let mut inputs: Vec<HashMap<Bytes, f64>> = Vec::with_capacity(keys.len());
        for key in keys {
            let scores = match lock.map(key).get(key.as_str()).map(|e| &e.value) {
                None => HashMap::new(),
                Some(Value::ZSet(z)) => z.iter().map(|(m, s)| (m.clone(), s)).collect(),
                Some(Value::Set(s)) => s.iter().map(|m| (m.clone(), 1.0)).collect(),
                Some(_) => return Err(StoreError::WrongType),
            };
            inputs.push(scores);
        }

        let mut totals: HashMap<Bytes, f64> = HashMap::new();
        if intersect {
            if let Some((first, rest)) = inputs.split_first() {
                for (member, score) in first {
                    let others: Option<f64> =
                        rest.iter().map(|other| other.get(member).copied()).sum();
                    if let Some(sum) = others {
                        totals.insert(member.clone(), score + sum);
                    }
                }
            }
        } else {
            for input in inputs {
                for (member, score) in input {
                    *totals.entry(member).or_insert(0.0) += score;
                }
            }
        }

        let mut result = SortedSet::default();
        for (member, score) in totals {
            // inf + -inf
            let score = if score.is_nan() { 0.0 } else { score };
            result.insert(member, score);
        }
        let len = result.len() as u64;

        let dest_map = lock.map(destination);
        if result.is_empty() {
            dest_map.remove(destination);
        } else {
            dest_map.insert(destination.to_string(), Entry::new(Value::ZSet(result)));
        }
        Ok(len)
    }

    /// `ZSCAN`. The pattern applies to members.
    pub(crate) fn zset_scan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<ScoredMember>> {
        let members = self.zset_range(key, 0, -1, false)?;
        Ok(page(members, cursor, options, |m| m.member.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(store: &MemoryStore, key: &str, members: &[(&str, f64)]) -> u64 {
        let members: Vec<_> = members
            .iter()
            .map(|(m, s)| ScoredMember::new(Bytes::from(m.to_string()), *s))
            .collect();
        store.zset_add(key, &members).unwrap()
    }

    fn names(members: &[ScoredMember]) -> Vec<&[u8]> {
        members.iter().map(|m| m.member.as_ref()).collect()
    }

    #[test]
    fn test_sorted_set_order_and_rank() {
        let mut set = SortedSet::default();
        assert!(set.insert(Bytes::from("b"), 2.0));
        assert!(set.insert(Bytes::from("a"), 2.0));
        assert!(set.insert(Bytes::from("c"), 1.0));
        assert!(!set.insert(Bytes::from("c"), 3.0));

        let order: Vec<_> = set.iter().map(|(m, _)| m.clone()).collect();
        assert_eq!(order, vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
        assert_eq!(set.rank(b"a"), Some(0));
        assert_eq!(set.rank(b"c"), Some(2));
        assert_eq!(set.rank(b"zz"), None);

        assert!(set.remove(b"a"));
        assert!(!set.remove(b"a"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_add_and_update() {
        let store = MemoryStore::new();
        assert_eq!(add(&store, "z", &[("a", 1.0), ("b", 2.0)]), 2);
        assert_eq!(add(&store, "z", &[("a", 5.0), ("c", 3.0)]), 1);
        assert_eq!(store.zset_score("z", b"a").unwrap(), Some(5.0));
        assert_eq!(store.zset_len("z").unwrap(), 3);
    }

    #[test]
    fn test_nan_rejected() {
        let store = MemoryStore::new();
        let result = store.zset_add("z", &[ScoredMember::new(Bytes::from("a"), f64::NAN)]);
        assert!(matches!(result, Err(StoreError::NotFloat)));
        assert!(!store.exists_key("z"));
    }

    #[test]
    fn test_ranges() {
        let store = MemoryStore::new();
        add(&store, "z", &[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);

        let range = store.zset_range("z", 0, 1, false).unwrap();
        assert_eq!(names(&range), vec![b"a".as_ref(), b"b".as_ref()]);
        let range = store.zset_range("z", 0, 1, true).unwrap();
        assert_eq!(names(&range), vec![b"d".as_ref(), b"c".as_ref()]);

        let by_score = store
            .zset_range_by_score("z", ScoreRange::new(2.0, 3.0), None, false)
            .unwrap();
        assert_eq!(names(&by_score), vec![b"b".as_ref(), b"c".as_ref()]);

        let limited = store
            .zset_range_by_score("z", ScoreRange::all(), Some(Limit::new(1, 2)), true)
            .unwrap();
        assert_eq!(names(&limited), vec![b"c".as_ref(), b"b".as_ref()]);
    }

    #[test]
    fn test_ranks() {
        let store = MemoryStore::new();
        add(&store, "z", &[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        assert_eq!(store.zset_rank("z", b"a", false).unwrap(), Some(0));
        assert_eq!(store.zset_rank("z", b"a", true).unwrap(), Some(2));
        assert_eq!(store.zset_rank("z", b"x", false).unwrap(), None);
    }

    #[test]
    fn test_increment() {
        let store = MemoryStore::new();
        assert_eq!(store.zset_increment("z", 2.5, Bytes::from("a")).unwrap(), 2.5);
        assert_eq!(store.zset_increment("z", 1.0, Bytes::from("a")).unwrap(), 3.5);
    }

    #[test]
    fn test_remove_ranges() {
        let store = MemoryStore::new();
        add(&store, "z", &[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);
        assert_eq!(store.zset_remove_range("z", 0, 1).unwrap(), 2);
        assert_eq!(store.zset_remove_by_score("z", ScoreRange::new(4.0, 10.0)).unwrap(), 1);
        let rest = store.zset_range("z", 0, -1, false).unwrap();
        assert_eq!(names(&rest), vec![b"c".as_ref()]);
        assert_eq!(store.zset_remove("z",&[Bytes::from("c")]).unwrap(), 1);
        assert!(!store.exists_key("z"));
    }

    #[test]
    fn test_union_and_inter_store() {
        let store = MemoryStore::new();
        add(&store, "a", &[("x", 1.0), ("y", 2.0)]);
        add(&store, "b", &[("y", 3.0), ("z", 4.0)]);
        let keys = vec!["a".to_string(), "b".to_string()];

        assert_eq!(store.zset_combine_store("u", &keys, false).unwrap(), 3);
        assert_eq!(store.zset_score("u", b"y").unwrap(), Some(5.0));

        assert_eq!(store.zset_combine_store("i", &keys, true).unwrap(), 1);
        assert_eq!(store.zset_score("i", b"y").unwrap(), Some(5.0));
        assert_eq!(store.zset_score("i", b"x").unwrap(), None);

        let missing = vec!["a".to_string(), "nope".to_string()];
        assert_eq!(store.zset_combine_store("i", &missing, true).unwrap(), 0);
        assert!(!store.exists_key("i"));
    }
}
