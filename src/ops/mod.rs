//! Operation Facades
//!
//! Each table hands out five typed facades. They all hold a [`Scope`], the
//! pairing of a store handle with the table's [`KeySpace`], and rewrite every
//! logical key they receive into a storage key before forwarding to the
//! store.
//!
//! ```text
//!   value_ops().get("42")
//!        │
//!        ▼  scope.key("42")
//!   store.get("app:users:42")
//! ```
//!
//! Only [`ValueOps`] consults the table's expiration policy. The generic key
//! commands shared by every facade live in [`KeyCommands`].

pub mod codec;
pub mod hash;
pub mod keys;
pub mod list;
pub mod set;
pub mod value;
pub mod zset;

pub use codec::{Codec, JsonCodec};
pub use hash::HashOps;
pub use keys::KeyCommands;
pub use list::ListOps;
pub use set::SetOps;
pub use value::ValueOps;
pub use zset::ZSetOps;

use crate::error::Result;
use crate::namespace::KeySpace;
use crate::store::{ScanOptions, ScanPage, StoreHandle};
use std::future::Future;

/// A store handle bound to one table's key prefix.
#[derive(Debug, Clone)]
pub struct Scope {
    store: StoreHandle,
    keyspace: KeySpace,
}

impl Scope {
    pub(crate) fn new(store: StoreHandle, keyspace: KeySpace) -> Self {
        Self { store, keyspace }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    /// The storage key for a logical key.
    #[inline]
    pub fn key(&self, key: &str) -> String {
        self.keyspace.storage_key(key)
    }

    /// Storage keys for `first` followed by `rest`.
    pub fn keys_with(&self, first: &str, rest: &[&str]) -> Vec<String> {
        std::iter::once(first)
            .chain(rest.iter().copied())
            .map(|k| self.key(k))
            .collect()
    }
}

/// Drives a cursor scan to completion, collecting every page.
pub(crate) async fn scan_to_end<T, F, Fut>(options: &ScanOptions, mut next: F) -> Result<Vec<T>>
where
    F: FnMut(u64, ScanOptions) -> Fut,
    Fut: Future<Output = Result<ScanPage<T>>>,
{
    let mut items = Vec::new();
    let mut cursor = 0;
    loop {
        let page = next(cursor, options.clone()).await?;
        items.extend(page.items);
        if page.cursor == 0 {
            return Ok(items);
        }
        cursor = page.cursor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_scope_keys() {
        let scope = Scope::new(Arc::new(MemoryStore::new()), KeySpace::new("app", "users"));
        assert_eq!(scope.key("1"), "app:users:1");
        assert_eq!(
            scope.keys_with("a", &["b", "c"]),
            vec!["app:users:a", "app:users:b", "app:users:c"]
        );
    }

    #[test]
    fn test_scan_to_end_follows_cursor() {
        let pages = tokio_test::block_on(scan_to_end(&ScanOptions::new(), |cursor, _| async move {
            Ok(match cursor {
                0 => ScanPage { cursor: 7, items: vec![1, 2] },
                7 => ScanPage { cursor: 0, items: vec![3] },
                _ => unreachable!(),
            })
        }))
        .unwrap();
        assert_eq!(pages, vec![1, 2, 3]);
    }
}
