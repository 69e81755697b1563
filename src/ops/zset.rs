//! Sorted set facade.
//!
//! Ranks are 0-based in ascending score order. Rank ranges are inclusive and
//! `-1` means the last member. Score ranges are inclusive on both ends.

use crate::error::Result;
use crate::ops::{scan_to_end, KeyCommands, Scope};
use crate::store::{Limit, ScanOptions, ScanPage, ScoreRange, ScoredMember};
use bytes::Bytes;

/// Sorted set operations on one table.
#[derive(Debug, Clone)]
pub struct ZSetOps {
    scope: Scope,
}

impl KeyCommands for ZSetOps {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

fn members_only(scored: Vec<ScoredMember>) -> Vec<Bytes> {
    scored.into_iter().map(|m| m.member).collect()
}

impl ZSetOps {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }

    /// Adds or updates one member. Returns true if it was new.
    pub async fn add(&self, key: &str, member: impl Into<Bytes>, score: f64) -> Result<bool> {
        let added = self
            .add_all(key, &[ScoredMember::new(member, score)])
            .await?;
        Ok(added > 0)
    }

    /// Returns the number of new members.
    pub async fn add_all(&self, key: &str, members: &[ScoredMember]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        Ok(self.scope.store().zadd(&self.scope.key(key), members).await?)
    }

    pub async fn remove(&self, key: &str, members: &[Bytes]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        Ok(self.scope.store().zrem(&self.scope.key(key), members).await?)
    }

    /// Returns the new score.
    pub async fn increment_score(
        &self,
        key: &str,
        member: impl Into<Bytes>,
        delta: f64,
    ) -> Result<f64> {
        Ok(self
            .scope
            .store()
            .zincr_by(&self.scope.key(key), delta, member.into())
            .await?)
    }

    pub async fn rank(&self, key: &str, member: impl AsRef<[u8]>) -> Result<Option<u64>> {
        Ok(self
            .scope
            .store()
            .zrank(&self.scope.key(key), member.as_ref())
            .await?)
    }

    pub async fn reverse_rank(&self, key: &str, member: impl AsRef<[u8]>) -> Result<Option<u64>> {
        Ok(self
            .scope
            .store()
            .zrevrank(&self.scope.key(key), member.as_ref())
            .await?)
    }

    pub async fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        Ok(members_only(self.range_with_scores(key, start, end).await?))
    }

    pub async fn range_with_scores(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<ScoredMember>> {
        Ok(self
            .scope
            .store()
            .zrange(&self.scope.key(key), start, end)
            .await?)
    }

    pub async fn range_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<Bytes>> {
        Ok(members_only(
            self.range_by_score_with_scores(key, min, max).await?,
        ))
    }

    pub async fn range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<ScoredMember>> {
        Ok(self
            .scope
            .store()
            .zrange_by_score(&self.scope.key(key), ScoreRange::new(min, max), None)
            .await?)
    }

    /// Like [`range_by_score`](Self::range_by_score), skipping `offset`
    /// matches and returning at most `count`.
    pub async fn range_by_score_limit(
        &self,
        key: &str,
        min: f64,
        max: f64,
        offset: usize,
        count: usize,
    ) -> Result<Vec<Bytes>> {
        let found = self
            .scope
            .store()
            .zrange_by_score(
                &self.scope.key(key),
                ScoreRange::new(min, max),
                Some(Limit::new(offset, count)),
            )
            .await?;
        Ok(members_only(found))
    }

    pub async fn reverse_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        Ok(members_only(
            self.reverse_range_with_scores(key, start, end).await?,
        ))
    }

    pub async fn reverse_range_with_scores(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<ScoredMember>> {
        Ok(self
            .scope
            .store()
            .zrevrange(&self.scope.key(key), start, end)
            .await?)
    }

    pub async fn reverse_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<Bytes>> {
        Ok(members_only(
            self.reverse_range_by_score_with_scores(key, min, max).await?,
        ))
    }

    pub async fn reverse_range_by_score_with_scores(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<ScoredMember>> {
        Ok(self
            .scope
            .store()
            .zrevrange_by_score(&self.scope.key(key), ScoreRange::new(min, max), None)
            .await?)
    }

    pub async fn reverse_range_by_score_limit(
        &self,
        key: &str,
        min: f64,
        max: f64,
        offset: usize,
        count: usize,
    ) -> Result<Vec<Bytes>> {
        let found = self
            .scope
            .store()
            .zrevrange_by_score(
                &self.scope.key(key),
                ScoreRange::new(min, max),
                Some(Limit::new(offset, count)),
            )
            .await?;
        Ok(members_only(found))
    }

    /// Number of members with a score in `min..=max`.
    pub async fn count(&self, key: &str, min: f64, max: f64) -> Result<u64> {
        Ok(self
            .scope
            .store()
            .zcount(&self.scope.key(key), ScoreRange::new(min, max))
            .await?)
    }

    pub async fn size(&self, key: &str) -> Result<u64> {
        Ok(self.scope.store().zcard(&self.scope.key(key)).await?)
    }

    pub async fn score(&self, key: &str, member: impl AsRef<[u8]>) -> Result<Option<f64>> {
        Ok(self
            .scope
            .store()
            .zscore(&self.scope.key(key), member.as_ref())
            .await?)
    }

    /// Removes members by rank, returning how many were removed.
    pub async fn remove_range(&self, key: &str, start: i64, end: i64) -> Result<u64> {
        Ok(self
            .scope
            .store()
            .zremrange_by_rank(&self.scope.key(key), start, end)
            .await?)
    }

    pub async fn remove_range_by_score(&self, key: &str, min: f64, max: f64) -> Result<u64> {
        Ok(self
            .scope
            .store()
            .zremrange_by_score(&self.scope.key(key), ScoreRange::new(min, max))
            .await?)
    }

    /// Stores the union of `key` and `others` in `destination`, summing
    /// scores. Returns the size of the result.
    pub async fn union_and_store(
        &self,
        key: &str,
        others: &[&str],
        destination: &str,
    ) -> Result<u64> {
        let keys = self.scope.keys_with(key, others);
        Ok(self
            .scope
            .store()
            .zunion_store(&self.scope.key(destination), &keys)
            .await?)
    }

    pub async fn intersect_and_store(
        &self,
        key: &str,
        others: &[&str],
        destination: &str,
    ) -> Result<u64> {
        let keys = self.scope.keys_with(key, others);
        Ok(self
            .scope
            .store()
            .zinter_store(&self.scope.key(destination), &keys)
            .await?)
    }

    pub async fn scan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> Result<ScanPage<ScoredMember>> {
        Ok(self
            .scope
            .store()
            .zscan(&self.scope.key(key), cursor, options)
            .await?)
    }

    pub async fn scan_all(&self, key: &str, options: &ScanOptions) -> Result<Vec<ScoredMember>> {
        scan_to_end(options, |cursor, options| async move {
            self.scan(key, cursor, &options).await
        })
        .await
    }
}
