//! Hash facade.

use crate::error::Result;
use crate::ops::{scan_to_end, KeyCommands, Scope};
use crate::store::{ScanOptions, ScanPage};
use bytes::Bytes;

/// Hash operations on one table.
#[derive(Debug, Clone)]
pub struct HashOps {
    scope: Scope,
}

impl KeyCommands for HashOps {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl HashOps {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub async fn get(&self, key: &str, field: impl AsRef<[u8]>) -> Result<Option<Bytes>> {
        Ok(self
            .scope
            .store()
            .hget(&self.scope.key(key), field.as_ref())
            .await?)
    }

    pub async fn get_all(&self, key: &str) -> Result<Vec<(Bytes, Bytes)>> {
        Ok(self.scope.store().hget_all(&self.scope.key(key)).await?)
    }

    pub async fn multi_get(&self, key: &str, fields: &[Bytes]) -> Result<Vec<Option<Bytes>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.scope.store().hmget(&self.scope.key(key), fields).await?)
    }

    /// Returns true if the field is new.
    pub async fn put(
        &self,
        key: &str,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Result<bool> {
        Ok(self
            .scope
            .store()
            .hset(&self.scope.key(key), field.into(), value.into())
            .await?)
    }

    /// Returns the number of new fields.
    pub async fn put_all(&self, key: &str, pairs: &[(Bytes, Bytes)]) -> Result<u64> {
        if pairs.is_empty() {
            return Ok(0);
        }
        Ok(self
            .scope
            .store()
            .hset_many(&self.scope.key(key), pairs)
            .await?)
    }

    pub async fn put_if_absent(
        &self,
        key: &str,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Result<bool> {
        Ok(self
            .scope
            .store()
            .hset_nx(&self.scope.key(key), field.into(), value.into())
            .await?)
    }

    pub async fn delete_fields(&self, key: &str, fields: &[Bytes]) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        Ok(self.scope.store().hdel(&self.scope.key(key), fields).await?)
    }

    pub async fn exists(&self, key: &str, field: impl AsRef<[u8]>) -> Result<bool> {
        Ok(self
            .scope
            .store()
            .hexists(&self.scope.key(key), field.as_ref())
            .await?)
    }

    pub async fn increment(&self, key: &str, field: impl AsRef<[u8]>, delta: i64) -> Result<i64> {
        Ok(self
            .scope
            .store()
            .hincr_by(&self.scope.key(key), field.as_ref(), delta)
            .await?)
    }

    pub async fn increment_float(
        &self,
        key: &str,
        field: impl AsRef<[u8]>,
        delta: f64,
    ) -> Result<f64> {
        Ok(self
            .scope
            .store()
            .hincr_by_float(&self.scope.key(key), field.as_ref(), delta)
            .await?)
    }

    pub async fn fields(&self, key: &str) -> Result<Vec<Bytes>> {
        Ok(self.scope.store().hkeys(&self.scope.key(key)).await?)
    }

    pub async fn size(&self, key: &str) -> Result<u64> {
        Ok(self.scope.store().hlen(&self.scope.key(key)).await?)
    }

    pub async fn values(&self, key: &str) -> Result<Vec<Bytes>> {
        Ok(self.scope.store().hvals(&self.scope.key(key)).await?)
    }

    /// One page of `HSCAN`. Field patterns are not namespaced.
    pub async fn scan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> Result<ScanPage<(Bytes, Bytes)>> {
        Ok(self
            .scope
            .store()
            .hscan(&self.scope.key(key), cursor, options)
            .await?)
    }

    /// Every field matching `options`, following the cursor to the end.
    pub async fn scan_all(&self, key: &str, options: &ScanOptions) -> Result<Vec<(Bytes, Bytes)>> {
        scan_to_end(options, |cursor, options| async move {
            self.scan(key, cursor, &options).await
        })
        .await
    }
}
