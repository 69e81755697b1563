//! Database: the top-level namespace.

use crate::error::{NameKind, NamespaceError, Result};
use crate::namespace::{delete_matching, validate_name, Table, TableOptions};
use crate::ops::{Codec, JsonCodec};
use crate::store::{escape_glob, StoreHandle};
use crate::{ADMIN_DATABASE, KEY_SEPARATOR, MAX_NAME_LENGTH};
use std::sync::Arc;
use tracing::{debug, info};

/// A named top-level namespace bound to a store.
///
/// # Example
///
/// ```
/// use nskv::{Database, MemoryStore};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let db = Database::new("app", Arc::new(MemoryStore::new())).unwrap();
/// let users = db.create_table("users").await.unwrap();
/// users.value_ops().set("1", "Ariz").await.unwrap();
/// assert_eq!(users.value_ops().get("1").await.unwrap(), Some("Ariz".into()));
/// # });
/// ```
#[derive(Debug)]
pub struct Database<C: Codec = JsonCodec> {
    name: Arc<str>,
    store: StoreHandle,
    codec: Arc<C>,
}

impl Database<JsonCodec> {
    /// Validates `name` and binds it to `store`, encoding typed values as JSON.
    pub fn new(name: &str, store: StoreHandle) -> Result<Self> {
        Self::with_codec(name, store, JsonCodec)
    }
}

impl<C: Codec> Database<C> {
    /// Like [`Database::new`] with a custom codec for typed scalar values.
    ///
    /// [`ADMIN_DATABASE`] holds every table's policy and can't be opened.
    pub fn with_codec(name: &str, store: StoreHandle, codec: C) -> Result<Self> {
        validate_name(NameKind::Database, name, MAX_NAME_LENGTH)?;
        if name == ADMIN_DATABASE {
            return Err(NamespaceError::ReservedName(name.to_string()).into());
        }
        debug!(database = name, "database opened");
        Ok(Self {
            name: name.into(),
            store,
            codec: Arc::new(codec),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Opens a table with default options.
    pub async fn create_table(&self, name: &str) -> Result<Table<C>> {
        self.create_table_with(name, TableOptions::default()).await
    }

    /// Validates `name` and loads the table's persisted policy.
    pub async fn create_table_with(&self, name: &str, options: TableOptions) -> Result<Table<C>> {
        validate_name(NameKind::Table, name, MAX_NAME_LENGTH)?;
        Table::open(
            Arc::clone(&self.name),
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.codec),
            options,
        )
        .await
    }

    /// Deletes every key of every table in this database and returns how
    /// many were removed.
    ///
    /// Keys are listed first and deleted afterwards, so a key written by a
    /// concurrent client in between may survive. Table policies under `root`
    /// are not touched.
    pub async fn delete(&self) -> Result<u64> {
        let pattern = format!("{}{KEY_SEPARATOR}*", escape_glob(&self.name));
        let deleted = delete_matching(&self.store, &pattern).await?;
        info!(database = %self.name, deleted, "database deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::{MemoryStore, Store};
    use bytes::Bytes;

    fn memory() -> (Arc<MemoryStore>, StoreHandle) {
        let memory = Arc::new(MemoryStore::new());
        let store: StoreHandle = memory.clone();
        (memory, store)
    }

    #[test]
    fn test_invalid_names() {
        let (_, store) = memory();
        let err = Database::new("a:b", Arc::clone(&store)).unwrap_err();
        assert!(matches!(
            err,
            Error::Namespace(NamespaceError::InvalidName {
                kind: NameKind::Database,
                ..
            })
        ));

        let err = Database::new("abcdefghijk", Arc::clone(&store)).unwrap_err();
        assert!(matches!(
            err,
            Error::Namespace(NamespaceError::NameTooLong { max: 10, .. })
        ));

        assert!(Database::new("abcdefghij", store).is_ok());
    }

    #[tokio::test]
    async fn test_admin_database_is_reserved() {
        let (memory, store) = memory();
        store
            .set("root:awt:app:users", Bytes::from("1000"), None)
            .await
            .unwrap();

        assert!(matches!(
            Database::new("root", Arc::clone(&store)),
            Err(Error::Namespace(NamespaceError::ReservedName(_)))
        ));
        assert!(Database::new("rooted", store).is_ok());
        assert!(memory.get_value("root:awt:app:users").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_table_names() {
        let (_, store) = memory();
        let db = Database::new("app", store).unwrap();

        assert!(matches!(
            db.create_table("x:y").await,
            Err(Error::Namespace(NamespaceError::InvalidName {
                kind: NameKind::Table,
                ..
            }))
        ));
        assert!(matches!(
            db.create_table("abcdefghijk").await,
            Err(Error::Namespace(NamespaceError::NameTooLong { .. }))
        ));
        assert!(db.create_table("abcdefghij").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_only_own_keys() {
        let (memory, store) = memory();
        for key in ["app:users:1", "app:users:2", "app:posts:1", "apple:x:1", "other:t:1"] {
            store.set(key, Bytes::from("v"), None).await.unwrap();
        }
        store
            .set("root:awt:app:users", Bytes::from("1000"), None)
            .await
            .unwrap();

        let db = Database::new("app", store).unwrap();
        assert_eq!(db.delete().await.unwrap(), 3);

        assert!(memory.get_value("app:users:1").unwrap().is_none());
        assert!(memory.get_value("apple:x:1").unwrap().is_some());
        assert!(memory.get_value("other:t:1").unwrap().is_some());
        assert!(memory.get_value("root:awt:app:users").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_empty_database_is_a_no_op() {
        let (memory, store) = memory();
        let db = Database::new("empty", store).unwrap();

        assert_eq!(db.delete().await.unwrap(), 0);
        assert_eq!(memory.stats().del_ops, 0);
    }

    #[tokio::test]
    async fn test_delete_escapes_glob_characters() {
        let (memory, store) = memory();
        store.set("a*:t:1", Bytes::from("v"), None).await.unwrap();
        store.set("ab:t:1", Bytes::from("v"), None).await.unwrap();

        let db = Database::new("a*", store).unwrap();
        assert_eq!(db.delete().await.unwrap(), 1);
        assert!(memory.get_value("ab:t:1").unwrap().is_some());
    }
}
