//! Scalar Facade
//!
//! The only facade that applies the table's expiration policy:
//!
//! - writes without a TTL argument (`set`, `set_typed`, `set_if_absent`,
//!   `multi_set`, `multi_set_if_absent`) carry the TTL chosen by
//!   [`ExpirationPolicy::write_ttl`]
//! - reads (`get`, `get_range`, `get_and_set`, `multi_get`, `incr_by`,
//!   `incr_by_float`, `append`) refresh the key by the sliding window, when
//!   one is set, with a second command after the read
//!
//! The refresh is not atomic with the read.

use crate::error::Result;
use crate::namespace::ExpirationPolicy;
use crate::ops::{Codec, JsonCodec, KeyCommands, Scope};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Scalar (string) operations on one table.
#[derive(Debug)]
pub struct ValueOps<C: Codec = JsonCodec> {
    scope: Scope,
    policy: Arc<ExpirationPolicy>,
    codec: Arc<C>,
}

impl<C: Codec> Clone for ValueOps<C> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            policy: Arc::clone(&self.policy),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<C: Codec> KeyCommands for ValueOps<C> {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl<C: Codec> ValueOps<C> {
    pub(crate) fn new(scope: Scope, policy: Arc<ExpirationPolicy>, codec: Arc<C>) -> Self {
        Self {
            scope,
            policy,
            codec,
        }
    }

    /// Stores a value with the table's default TTL.
    pub async fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        let ttl = self.policy.write_ttl().await?;
        self.scope
            .store()
            .set(&self.scope.key(key), value.into(), ttl)
            .await?;
        Ok(())
    }

    /// Stores a value with an explicit TTL, ignoring the table policy.
    pub async fn set_with_ttl(&self, key: &str, value: impl Into<Bytes>, ttl: Duration) -> Result<()> {
        self.scope
            .store()
            .set(&self.scope.key(key), value.into(), Some(ttl))
            .await?;
        Ok(())
    }

    /// Encodes `value` with the database codec and stores it like [`set`](Self::set).
    pub async fn set_typed<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let bytes = self.codec.encode(value)?;
        self.set(key, bytes).await
    }

    /// Reads and decodes a value stored with [`set_typed`](Self::set_typed).
    pub async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let storage_key = self.scope.key(key);
        let value = self.scope.store().get(&storage_key).await?;
        self.renew(&[storage_key]).await?;
        Ok(value)
    }

    /// Substring by inclusive byte offsets; negative offsets count from the end.
    pub async fn get_range(&self, key: &str, start: i64, end: i64) -> Result<Bytes> {
        let storage_key = self.scope.key(key);
        let value = self.scope.store().get_range(&storage_key, start, end).await?;
        self.renew(&[storage_key]).await?;
        Ok(value)
    }

    /// Replaces the value and returns the previous one.
    pub async fn get_and_set(&self, key: &str, value: impl Into<Bytes>) -> Result<Option<Bytes>> {
        let storage_key = self.scope.key(key);
        let old = self.scope.store().get_set(&storage_key, value.into()).await?;
        self.renew(&[storage_key]).await?;
        Ok(old)
    }

    pub async fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<Bytes>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let storage_keys: Vec<String> = keys.iter().map(|k| self.scope.key(k)).collect();
        let values = self.scope.store().mget(&storage_keys).await?;
        self.renew(&storage_keys).await?;
        Ok(values)
    }

    /// Sets one bit, returning its previous state.
    pub async fn set_bit(&self, key: &str, offset: u64, on: bool) -> Result<bool> {
        Ok(self
            .scope
            .store()
            .set_bit(&self.scope.key(key), offset, on)
            .await?)
    }

    pub async fn get_bit(&self, key: &str, offset: u64) -> Result<bool> {
        Ok(self.scope.store().get_bit(&self.scope.key(key), offset).await?)
    }

    /// Stores the value only if the key does not exist. The table's default
    /// TTL is applied when the key is created.
    pub async fn set_if_absent(&self, key: &str, value: impl Into<Bytes>) -> Result<bool> {
        let ttl = self.policy.write_ttl().await?;
        Ok(self
            .scope
            .store()
            .set_nx(&self.scope.key(key), value.into(), ttl)
            .await?)
    }

    /// Overwrites part of the value starting at `offset`. Returns the new length.
    pub async fn set_range(&self, key: &str, offset: usize, value: impl Into<Bytes>) -> Result<usize> {
        Ok(self
            .scope
            .store()
            .set_range(&self.scope.key(key), offset, value.into())
            .await?)
    }

    /// Length of the value in bytes.
    pub async fn size(&self, key: &str) -> Result<usize> {
        Ok(self.scope.store().strlen(&self.scope.key(key)).await?)
    }

    /// Stores several values, then applies the table's default TTL to each.
    pub async fn multi_set(&self, pairs: &[(&str, Bytes)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let pairs = self.storage_pairs(pairs);
        self.scope.store().mset(&pairs).await?;
        self.apply_write_ttl(&pairs).await
    }

    /// Stores every value only if none of the keys exist.
    pub async fn multi_set_if_absent(&self, pairs: &[(&str, Bytes)]) -> Result<bool> {
        if pairs.is_empty() {
            return Ok(false);
        }
        let pairs = self.storage_pairs(pairs);
        let stored = self.scope.store().mset_nx(&pairs).await?;
        if stored {
            self.apply_write_ttl(&pairs).await?;
        }
        Ok(stored)
    }

    pub async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let storage_key = self.scope.key(key);
        let value = self.scope.store().incr_by(&storage_key, delta).await?;
        self.renew(&[storage_key]).await?;
        Ok(value)
    }

    pub async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64> {
        let storage_key = self.scope.key(key);
        let value = self.scope.store().incr_by_float(&storage_key, delta).await?;
        self.renew(&[storage_key]).await?;
        Ok(value)
    }

    /// Appends to the value, returning the new length.
    pub async fn append(&self, key: &str, value: impl Into<Bytes>) -> Result<usize> {
        let storage_key = self.scope.key(key);
        let len = self.scope.store().append(&storage_key, value.into()).await?;
        self.renew(&[storage_key]).await?;
        Ok(len)
    }

    fn storage_pairs(&self, pairs: &[(&str, Bytes)]) -> Vec<(String, Bytes)> {
        pairs
            .iter()
            .map(|(k, v)| (self.scope.key(k), v.clone()))
            .collect()
    }

    /// MSET can't carry a TTL, so each key gets its own PEXPIRE.
    async fn apply_write_ttl(&self, pairs: &[(String, Bytes)]) -> Result<()> {
        let Some(ttl) = self.policy.write_ttl().await? else {
            return Ok(());
        };
        for (key, _) in pairs {
            self.scope.store().pexpire(key, ttl).await?;
        }
        Ok(())
    }

    async fn renew(&self, storage_keys: &[String]) -> Result<()> {
        let Some(window) = self.policy.renewal().await? else {
            return Ok(());
        };
        for key in storage_keys {
            self.scope.store().pexpire(key, window).await?;
            trace!(key = %key, window_ms = window.as_millis() as u64, "sliding window renewed");
        }
        Ok(())
    }
}
