//! Table: a namespace under a database, with its own expiration policy.

use crate::error::Result;
use crate::namespace::{delete_matching, ExpirationPolicy, KeySpace, PolicyReads, TableOptions};
use crate::ops::{Codec, HashOps, JsonCodec, ListOps, Scope, SetOps, ValueOps, ZSetOps};
use crate::store::StoreHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A table handle.
///
/// Built by [`Database::create_table`](crate::Database::create_table). The
/// key prefix is fixed at construction and the five facades are built once
/// and shared by every call to the accessors.
///
/// Handles do not share policy state. In [`PolicyReads::Cached`] mode a
/// sliding window set through one handle is not seen by another handle of
/// the same table until that one is rebuilt or calls
/// [`refresh_policy`](Table::refresh_policy).
#[derive(Debug)]
pub struct Table<C: Codec = JsonCodec> {
    name: Arc<str>,
    database: Arc<str>,
    keyspace: KeySpace,
    store: StoreHandle,
    policy: Arc<ExpirationPolicy>,
    value: ValueOps<C>,
    hash: HashOps,
    list: ListOps,
    set: SetOps,
    zset: ZSetOps,
}

impl<C: Codec> Table<C> {
    /// Loads the policy and builds the facades. The name is already validated.
    pub(crate) async fn open(
        database: Arc<str>,
        name: &str,
        store: StoreHandle,
        codec: Arc<C>,
        options: TableOptions,
    ) -> Result<Self> {
        let keyspace = KeySpace::new(&database, name);
        let policy = Arc::new(
            ExpirationPolicy::load(Arc::clone(&store), &database, name, options.policy_reads)
                .await?,
        );
        let scope = Scope::new(Arc::clone(&store), keyspace.clone());

        debug!(table = %keyspace.prefix(), "table opened");
        Ok(Self {
            name: name.into(),
            database,
            value: ValueOps::new(scope.clone(), Arc::clone(&policy), codec),
            hash: HashOps::new(scope.clone()),
            list: ListOps::new(scope.clone()),
            set: SetOps::new(scope.clone()),
            zset: ZSetOps::new(scope),
            keyspace,
            store,
            policy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `<db>:<table>:`
    pub fn table_key(&self) -> &str {
        self.keyspace.prefix()
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    pub fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    pub fn policy_reads(&self) -> PolicyReads {
        self.policy.reads()
    }

    /// Sets the TTL applied to scalar writes that don't carry their own.
    /// Zero clears it.
    pub async fn set_expire(&self, ttl: Duration) -> Result<()> {
        self.policy.set_expire(ttl).await
    }

    /// The explicit TTL in milliseconds, read from the store. 0 when unset.
    pub async fn table_expire(&self) -> Result<i64> {
        self.policy.table_expire().await
    }

    /// Sets the sliding window. Zero disables renewal on reads.
    pub async fn set_auto_window(&self, window: Duration) -> Result<()> {
        self.policy.set_auto_window(window).await
    }

    /// The sliding window in milliseconds as this handle knows it, -1 when
    /// unset.
    pub fn auto_window(&self) -> i64 {
        self.policy.cached_window()
    }

    /// Re-reads the persisted sliding window into this handle.
    pub async fn refresh_policy(&self) -> Result<i64> {
        self.policy.reload_window().await
    }

    /// Whether a scalar read of `key` renews its TTL.
    ///
    /// Decided the same way the value facade decides it, so under
    /// [`PolicyReads::Fresh`] the persisted window is read.
    pub async fn is_update_expire(&self, _key: &str) -> Result<bool> {
        Ok(self.policy.renewal().await?.is_some())
    }

    /// Deletes every key of this table and returns how many were removed.
    ///
    /// Keys are listed first and deleted afterwards, so the deletion is not
    /// atomic. The table's policy under `root` is kept.
    pub async fn delete(&self) -> Result<u64> {
        let deleted = delete_matching(&self.store, &self.keyspace.everything()).await?;
        info!(table = %self.keyspace.prefix(), deleted, "table deleted");
        Ok(deleted)
    }

    pub fn value_ops(&self) -> &ValueOps<C> {
        &self.value
    }

    pub fn hash_ops(&self) -> &HashOps {
        &self.hash
    }

    pub fn list_ops(&self) -> &ListOps {
        &self.list
    }

    pub fn set_ops(&self) -> &SetOps {
        &self.set
    }

    pub fn zset_ops(&self) -> &ZSetOps {
        &self.zset
    }
}
