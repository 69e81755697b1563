//! List facade.
//!
//! Insert pivots are element values and are passed through untouched; only
//! keys are namespaced.

use crate::error::Result;
use crate::ops::{KeyCommands, Scope};
use crate::store::InsertPosition;
use bytes::Bytes;
use std::time::Duration;

/// List operations on one table.
#[derive(Debug, Clone)]
pub struct ListOps {
    scope: Scope,
}

impl KeyCommands for ListOps {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl ListOps {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub async fn index(&self, key: &str, index: i64) -> Result<Option<Bytes>> {
        Ok(self.scope.store().lindex(&self.scope.key(key), index).await?)
    }

    /// Inclusive range; `-1` is the last element.
    pub async fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        Ok(self
            .scope
            .store()
            .lrange(&self.scope.key(key), start, end)
            .await?)
    }

    /// Returns the new length.
    pub async fn left_push(&self, key: &str, value: impl Into<Bytes>) -> Result<u64> {
        self.left_push_all(key, &[value.into()]).await
    }

    /// Pushes each value to the head in turn, so the last one ends up first.
    pub async fn left_push_all(&self, key: &str, values: &[Bytes]) -> Result<u64> {
        Ok(self.scope.store().lpush(&self.scope.key(key), values).await?)
    }

    /// Pushes only if the list already exists. Returns the length, 0 if absent.
    pub async fn left_push_if_present(&self, key: &str, value: impl Into<Bytes>) -> Result<u64> {
        Ok(self
            .scope
            .store()
            .lpush_x(&self.scope.key(key), &[value.into()])
            .await?)
    }

    /// Returns the new length, `-1` if the pivot is missing, 0 if the list is.
    pub async fn insert_before(
        &self,
        key: &str,
        pivot: impl AsRef<[u8]>,
        value: impl Into<Bytes>,
    ) -> Result<i64> {
        self.insert(key, InsertPosition::Before, pivot.as_ref(), value.into())
            .await
    }

    pub async fn right_push(&self, key: &str, value: impl Into<Bytes>) -> Result<u64> {
        self.right_push_all(key, &[value.into()]).await
    }

    pub async fn right_push_all(&self, key: &str, values: &[Bytes]) -> Result<u64> {
        Ok(self.scope.store().rpush(&self.scope.key(key), values).await?)
    }

    pub async fn right_push_if_present(&self, key: &str, value: impl Into<Bytes>) -> Result<u64> {
        Ok(self
            .scope
            .store()
            .rpush_x(&self.scope.key(key), &[value.into()])
            .await?)
    }

    pub async fn insert_after(
        &self,
        key: &str,
        pivot: impl AsRef<[u8]>,
        value: impl Into<Bytes>,
    ) -> Result<i64> {
        self.insert(key, InsertPosition::After, pivot.as_ref(), value.into())
            .await
    }

    async fn insert(
        &self,
        key: &str,
        position: InsertPosition,
        pivot: &[u8],
        value: Bytes,
    ) -> Result<i64> {
        Ok(self
            .scope
            .store()
            .linsert(&self.scope.key(key), position, pivot, value)
            .await?)
    }

    /// Replaces the element at `index`.
    pub async fn set(&self, key: &str, index: i64, value: impl Into<Bytes>) -> Result<()> {
        Ok(self
            .scope
            .store()
            .lset(&self.scope.key(key), index, value.into())
            .await?)
    }

    pub async fn left_pop(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.scope.store().lpop(&self.scope.key(key)).await?)
    }

    /// Waits up to `timeout` for an element. A zero timeout waits forever.
    pub async fn left_pop_timeout(&self, key: &str, timeout: Duration) -> Result<Option<Bytes>> {
        Ok(self.scope.store().blpop(&self.scope.key(key), timeout).await?)
    }

    pub async fn right_pop(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.scope.store().rpop(&self.scope.key(key)).await?)
    }

    pub async fn right_pop_timeout(&self, key: &str, timeout: Duration) -> Result<Option<Bytes>> {
        Ok(self.scope.store().brpop(&self.scope.key(key), timeout).await?)
    }

    /// Moves the tail of `source` to the head of `destination`, both in
    /// this table.
    pub async fn right_pop_and_left_push(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<Option<Bytes>> {
        Ok(self
            .scope
            .store()
            .rpoplpush(&self.scope.key(source), &self.scope.key(destination))
            .await?)
    }

    pub async fn right_pop_and_left_push_timeout(
        &self,
        source: &str,
        destination: &str,
        timeout: Duration,
    ) -> Result<Option<Bytes>> {
        Ok(self
            .scope
            .store()
            .brpoplpush(&self.scope.key(source), &self.scope.key(destination), timeout)
            .await?)
    }

    /// Removes up to `count` occurrences of `value`: from the head when
    /// positive, from the tail when negative, all when 0.
    pub async fn remove(&self, key: &str, count: i64, value: impl AsRef<[u8]>) -> Result<u64> {
        Ok(self
            .scope
            .store()
            .lrem(&self.scope.key(key), count, value.as_ref())
            .await?)
    }

    /// Keeps only the inclusive range `start..=end`.
    pub async fn trim(&self, key: &str, start: i64, end: i64) -> Result<()> {
        Ok(self
            .scope
            .store()
            .ltrim(&self.scope.key(key), start, end)
            .await?)
    }

    pub async fn size(&self, key: &str) -> Result<u64> {
        Ok(self.scope.store().llen(&self.scope.key(key)).await?)
    }
}
