//! Key commands shared by every facade.

use crate::error::Result;
use crate::ops::Scope;
use crate::store::{KeyTtl, KeyType};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::{Duration, SystemTime};

/// Generic key commands. Every argument is a logical key of the facade's
/// table.
///
/// Implementors only provide [`scope`](KeyCommands::scope).
#[async_trait]
pub trait KeyCommands: Send + Sync {
    fn scope(&self) -> &Scope;

    /// Deletes one key. Returns true if it existed.
    async fn delete(&self, key: &str) -> Result<bool> {
        let scope = self.scope();
        Ok(scope.store().del(&[scope.key(key)]).await? > 0)
    }

    /// Deletes several keys, returning how many existed.
    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        let scope = self.scope();
        if keys.is_empty() {
            return Ok(0);
        }
        let storage: Vec<String> = keys.iter().map(|k| scope.key(k)).collect();
        Ok(scope.store().del(&storage).await?)
    }

    async fn dump(&self, key: &str) -> Result<Option<Bytes>> {
        let scope = self.scope();
        Ok(scope.store().dump(&scope.key(key)).await?)
    }

    /// Restores a payload produced by [`dump`](KeyCommands::dump). `None`
    /// restores without an expiry.
    async fn restore(
        &self,
        key: &str,
        ttl: Option<Duration>,
        payload: Bytes,
        replace: bool,
    ) -> Result<()> {
        let scope = self.scope();
        Ok(scope
            .store()
            .restore(&scope.key(key), ttl, payload, replace)
            .await?)
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let scope = self.scope();
        Ok(scope.store().exists(&scope.key(key)).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let scope = self.scope();
        Ok(scope.store().pexpire(&scope.key(key), ttl).await?)
    }

    async fn expire_at(&self, key: &str, at: SystemTime) -> Result<bool> {
        let scope = self.scope();
        Ok(scope.store().pexpire_at(&scope.key(key), at).await?)
    }

    async fn persist(&self, key: &str) -> Result<bool> {
        let scope = self.scope();
        Ok(scope.store().persist(&scope.key(key)).await?)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let scope = self.scope();
        Ok(scope.store().pttl(&scope.key(key)).await?)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let scope = self.scope();
        Ok(scope.store().rename(&scope.key(from), &scope.key(to)).await?)
    }

    async fn rename_if_absent(&self, from: &str, to: &str) -> Result<bool> {
        let scope = self.scope();
        Ok(scope
            .store()
            .rename_nx(&scope.key(from), &scope.key(to))
            .await?)
    }

    async fn key_type(&self, key: &str) -> Result<KeyType> {
        let scope = self.scope();
        Ok(scope.store().key_type(&scope.key(key)).await?)
    }

    /// Moves the key to another numbered database of the underlying engine.
    async fn move_to(&self, key: &str, db: u32) -> Result<bool> {
        let scope = self.scope();
        Ok(scope.store().move_key(&scope.key(key), db).await?)
    }

    /// Logical keys of this table matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let scope = self.scope();
        let keyspace = scope.keyspace();
        let found = scope.store().keys(&keyspace.pattern(pattern)).await?;
        Ok(found
            .iter()
            .filter_map(|k| keyspace.logical_key(k))
            .map(str::to_string)
            .collect())
    }

    /// A random key of the whole store, not limited to this table. The raw
    /// storage key is returned.
    async fn random_key(&self) -> Result<Option<String>> {
        Ok(self.scope().store().random_key().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, StoreError};
    use crate::namespace::KeySpace;
    use crate::store::{MemoryStore, Store, StoreHandle};
    use std::sync::Arc;

    struct Keys(Scope);

    impl KeyCommands for Keys {
        fn scope(&self) -> &Scope {
            &self.0
        }
    }

    fn setup() -> (StoreHandle, Keys) {
        let store: StoreHandle = Arc::new(MemoryStore::new());
        let keys = Keys(Scope::new(Arc::clone(&store), KeySpace::new("app", "users")));
        (store, keys)
    }

    #[tokio::test]
    async fn test_keys_are_scoped() {
        let (store, keys) = setup();
        store.set("app:users:a1", "x".into(), None).await.unwrap();
        store.set("app:users:a2", "x".into(), None).await.unwrap();
        store.set("app:users:b1", "x".into(), None).await.unwrap();
        store.set("app:posts:a3", "x".into(), None).await.unwrap();

        let mut found = keys.keys("a*").await.unwrap();
        found.sort();
        assert_eq!(found, vec!["a1", "a2"]);
        assert_eq!(keys.keys("*").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let (store, keys) = setup();
        store.set("app:users:1", "x".into(), None).await.unwrap();
        store.set("app:users:2", "x".into(), None).await.unwrap();

        assert!(keys.has_key("1").await.unwrap());
        assert!(keys.delete("1").await.unwrap());
        assert!(!keys.delete("1").await.unwrap());
        assert_eq!(keys.delete_many(&["1", "2", "3"]).await.unwrap(), 1);
        assert_eq!(keys.delete_many(&[]).await.unwrap(), 0);
        assert!(!keys.has_key("2").await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_and_persist() {
        let (store, keys) = setup();
        store.set("app:users:1", "x".into(), None).await.unwrap();

        assert_eq!(keys.ttl("1").await.unwrap(), KeyTtl::Persistent);
        assert!(keys.expire("1", Duration::from_secs(60)).await.unwrap());
        assert!(keys.ttl("1").await.unwrap().duration().is_some());
        assert!(keys.persist("1").await.unwrap());
        assert_eq!(keys.ttl("1").await.unwrap(), KeyTtl::Persistent);
        assert_eq!(keys.ttl("missing").await.unwrap(), KeyTtl::Missing);

        let at = SystemTime::now() + Duration::from_secs(60);
        assert!(keys.expire_at("1", at).await.unwrap());
        assert!(keys.ttl("1").await.unwrap().duration().is_some());
    }

    #[tokio::test]
    async fn test_rename_within_table() {
        let (store, keys) = setup();
        store.set("app:users:old", "x".into(), None).await.unwrap();
        store.set("app:users:taken", "y".into(), None).await.unwrap();

        assert!(!keys.rename_if_absent("old", "taken").await.unwrap());
        keys.rename("old", "new").await.unwrap();
        assert_eq!(store.get("app:users:new").await.unwrap(), Some("x".into()));

        let err = keys.rename("old", "other").await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NoSuchKey)));
    }

    #[tokio::test]
    async fn test_type_dump_restore() {
        let (store, keys) = setup();
        store.rpush("app:users:l", &["a".into(), "b".into()]).await.unwrap();

        assert_eq!(keys.key_type("l").await.unwrap(), KeyType::List);
        assert_eq!(keys.key_type("nope").await.unwrap(), KeyType::None);

        let payload = keys.dump("l").await.unwrap().unwrap();
        keys.restore("copy", None, payload, false).await.unwrap();
        assert_eq!(
            store.lrange("app:users:copy", 0, -1).await.unwrap(),
            vec![bytes::Bytes::from("a"), bytes::Bytes::from("b")]
        );
    }

    #[tokio::test]
    async fn test_random_key_is_raw() {
        let (store, keys) = setup();
        assert_eq!(keys.random_key().await.unwrap(), None);
        store.set("other:t:k", "x".into(), None).await.unwrap();
        assert_eq!(keys.random_key().await.unwrap(), Some("other:t:k".to_string()));
    }

    #[tokio::test]
    async fn test_move_is_forwarded() {
        let (store, keys) = setup();
        store.set("app:users:1", "x".into(), None).await.unwrap();
        let err = keys.move_to("1", 1).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Unsupported("MOVE"))));
    }
}
