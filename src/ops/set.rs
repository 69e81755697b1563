//! Set facade.

use crate::error::Result;
use crate::ops::{scan_to_end, KeyCommands, Scope};
use crate::store::{ScanOptions, ScanPage};
use bytes::Bytes;
use std::collections::HashSet;

/// Set operations on one table. Every key argument, including the other
/// operands and destinations of the combining commands, is a key of this
/// table.
#[derive(Debug, Clone)]
pub struct SetOps {
    scope: Scope,
}

impl KeyCommands for SetOps {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl SetOps {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }

    /// Returns how many members were new.
    pub async fn add(&self, key: &str, members: &[Bytes]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        Ok(self.scope.store().sadd(&self.scope.key(key), members).await?)
    }

    pub async fn remove(&self, key: &str, members: &[Bytes]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        Ok(self.scope.store().srem(&self.scope.key(key), members).await?)
    }

    pub async fn pop(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.scope.store().spop(&self.scope.key(key)).await?)
    }

    pub async fn move_member(
        &self,
        key: &str,
        destination: &str,
        member: impl AsRef<[u8]>,
    ) -> Result<bool> {
        Ok(self
            .scope
            .store()
            .smove(
                &self.scope.key(key),
                &self.scope.key(destination),
                member.as_ref(),
            )
            .await?)
    }

    pub async fn size(&self, key: &str) -> Result<u64> {
        Ok(self.scope.store().scard(&self.scope.key(key)).await?)
    }

    pub async fn is_member(&self, key: &str, member: impl AsRef<[u8]>) -> Result<bool> {
        Ok(self
            .scope
            .store()
            .sismember(&self.scope.key(key), member.as_ref())
            .await?)
    }

    pub async fn intersect(&self, key: &str, others: &[&str]) -> Result<HashSet<Bytes>> {
        let keys = self.scope.keys_with(key, others);
        Ok(self.scope.store().sinter(&keys).await?.into_iter().collect())
    }

    /// Stores the intersection in `destination`, returning its size.
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
            .sinter_store(&self.scope.key(destination), &keys)
            .await?)
    }

    pub async fn union(&self, key: &str, others: &[&str]) -> Result<HashSet<Bytes>> {
        let keys = self.scope.keys_with(key, others);
        Ok(self.scope.store().sunion(&keys).await?.into_iter().collect())
    }

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
            .sunion_store(&self.scope.key(destination), &keys)
            .await?)
    }

    /// Members of `key` that are in none of `others`.
    pub async fn difference(&self, key: &str, others: &[&str]) -> Result<HashSet<Bytes>> {
        let keys = self.scope.keys_with(key, others);
        Ok(self.scope.store().sdiff(&keys).await?.into_iter().collect())
    }

    pub async fn difference_and_store(
        &self,
        key: &str,
        others: &[&str],
        destination: &str,
    ) -> Result<u64> {
        let keys = self.scope.keys_with(key, others);
        Ok(self
            .scope
            .store()
            .sdiff_store(&self.scope.key(destination), &keys)
            .await?)
    }

    pub async fn members(&self, key: &str) -> Result<HashSet<Bytes>> {
        Ok(self
            .scope
            .store()
            .smembers(&self.scope.key(key))
            .await?
            .into_iter()
            .collect())
    }

    pub async fn random_member(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.scope.store().srandmember(&self.scope.key(key)).await?)
    }

    /// `count` random members; the same member may be picked more than once.
    pub async fn random_members(&self, key: &str, count: usize) -> Result<Vec<Bytes>> {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        Ok(self
            .scope
            .store()
            .srandmember_count(&self.scope.key(key), -count)
            .await?)
    }

    /// Up to `count` distinct random members.
    pub async fn distinct_random_members(&self, key: &str, count: usize) -> Result<HashSet<Bytes>> {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        Ok(self
            .scope
            .store()
            .srandmember_count(&self.scope.key(key), count)
            .await?
            .into_iter()
            .collect())
    }

    pub async fn scan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> Result<ScanPage<Bytes>> {
        Ok(self
            .scope
            .store()
            .sscan(&self.scope.key(key), cursor, options)
            .await?)
    }

    pub async fn scan_all(&self, key: &str, options: &ScanOptions) -> Result<Vec<Bytes>> {
        scan_to_end(options, |cursor, options| async move {
            self.scan(key, cursor, &options).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::KeySpace;
    use crate::store::{MemoryStore, Store, StoreHandle};
    use std::sync::Arc;

    fn setup() -> (StoreHandle, SetOps) {
        let store: StoreHandle = Arc::new(MemoryStore::new());
        let ops = SetOps::new(Scope::new(Arc::clone(&store), KeySpace::new("app", "tags")));
        (store, ops)
    }

    fn members(values: &[&'static str]) -> Vec<Bytes> {
        values.iter().map(|v| Bytes::from(*v)).collect()
    }

    fn set_of(values: &[&'static str]) -> HashSet<Bytes> {
        members(values).into_iter().collect()
    }

    #[tokio::test]
    async fn test_add_remove_membership() {
        let (store, ops) = setup();
        assert_eq!(ops.add("t", &members(&["a", "b", "a"])).await.unwrap(), 2);
        assert_eq!(store.scard("app:tags:t").await.unwrap(), 2);
        assert!(ops.is_member("t", "a").await.unwrap());
        assert!(!ops.is_member("t", "z").await.unwrap());
        assert_eq!(ops.remove("t", &members(&["a", "z"])).await.unwrap(), 1);
        assert_eq!(ops.members("t").await.unwrap(), set_of(&["b"]));
        assert_eq!(ops.pop("t").await.unwrap(), Some(Bytes::from("b")));
        assert_eq!(ops.size("t").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_move_member() {
        let (_, ops) = setup();
        ops.add("from", &members(&["a"])).await.unwrap();
        assert!(ops.move_member("from", "to", "a").await.unwrap());
        assert!(!ops.move_member("from", "to", "a").await.unwrap());
        assert_eq!(ops.members("to").await.unwrap(), set_of(&["a"]));
    }

    #[tokio::test]
    async fn test_combinations_stay_in_table() {
        let (store, ops) = setup();
        ops.add("x", &members(&["a", "b", "c"])).await.unwrap();
        ops.add("y", &members(&["b", "c", "d"])).await.unwrap();
        ops.add("z", &members(&["c"])).await.unwrap();
        // Same logical name in another table must not take part.
        store.sadd("app:other:y", &members(&["a"])).await.unwrap();

        assert_eq!(ops.intersect("x", &["y"]).await.unwrap(), set_of(&["b", "c"]));
        assert_eq!(ops.intersect("x", &["y", "z"]).await.unwrap(), set_of(&["c"]));
        assert_eq!(ops.union("x", &["y"]).await.unwrap(), set_of(&["a", "b", "c", "d"]));
        assert_eq!(ops.difference("x", &["y"]).await.unwrap(), set_of(&["a"]));
        assert_eq!(ops.difference("x", &[]).await.unwrap(), set_of(&["a", "b", "c"]));

        assert_eq!(ops.intersect_and_store("x", &["y"], "i").await.unwrap(), 2);
        assert_eq!(ops.union_and_store("x", &["y"], "u").await.unwrap(), 4);
        assert_eq!(ops.difference_and_store("x", &["y", "z"], "d").await.unwrap(), 1);
        assert_eq!(store.scard("app:tags:u").await.unwrap(), 4);
        assert_eq!(ops.members("d").await.unwrap(), set_of(&["a"]));
    }

    #[tokio::test]
    async fn test_random_members() {
        let (_, ops) = setup();
        assert_eq!(ops.random_member("t").await.unwrap(), None);
        ops.add("t", &members(&["a", "b", "c"])).await.unwrap();

        let all = set_of(&["a", "b", "c"]);
        let one = ops.random_member("t").await.unwrap().unwrap();
        assert!(all.contains(&one));

        let repeated = ops.random_members("t", 10).await.unwrap();
        assert_eq!(repeated.len(), 10);
        assert!(repeated.iter().all(|m| all.contains(m)));

        let distinct = ops.distinct_random_members("t", 10).await.unwrap();
        assert_eq!(distinct, all);
        assert_eq!(ops.distinct_random_members("t", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_scan_all() {
        let (_, ops) = setup();
        let many: Vec<Bytes> = (0..30).map(|i| Bytes::from(format!("m{i}"))).collect();
        ops.add("big", &many).await.unwrap();

        let page = ops.scan("big", 0, &ScanOptions::new()).await.unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(ops.scan_all("big", &ScanOptions::new()).await.unwrap().len(), 30);
    }
}
