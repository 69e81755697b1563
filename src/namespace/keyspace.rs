//! Name validation and storage key composition.

use crate::error::{NameKind, NamespaceError};
use crate::store::escape_glob;
use crate::KEY_SEPARATOR;
use std::sync::Arc;

/// Checks a Database or Table name.
///
/// Fails with `InvalidName` if the name contains the key separator and with
/// `NameTooLong` if it has more than `max_len` characters.
pub fn validate_name(kind: NameKind, name: &str, max_len: usize) -> Result<(), NamespaceError> {
    if name.contains(KEY_SEPARATOR) {
        return Err(NamespaceError::InvalidName {
            kind,
            name: name.to_string(),
            separator: KEY_SEPARATOR,
        });
    }
    if name.chars().count() > max_len {
        return Err(NamespaceError::NameTooLong {
            kind,
            name: name.to_string(),
            max: max_len,
        });
    }
    Ok(())
}

/// The key prefix of one table: `<db>:<table>:`.
///
/// Cheap to clone; every facade of a table holds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySpace {
    prefix: Arc<str>,
}

impl KeySpace {
    /// Builds the prefix for an already validated database and table name.
    pub fn new(database: &str, table: &str) -> Self {
        Self {
            prefix: format!("{database}{KEY_SEPARATOR}{table}{KEY_SEPARATOR}").into(),
        }
    }

    /// `<db>:<table>:`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Rewrites a logical key into its storage key.
    pub fn storage_key(&self, key: &str) -> String {
        let mut full = String::with_capacity(self.prefix.len() + key.len());
        full.push_str(&self.prefix);
        full.push_str(key);
        full
    }

    pub fn storage_keys<I, K>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|k| self.storage_key(k.as_ref()))
            .collect()
    }

    /// Strips the prefix from a storage key, if it belongs to this table.
    pub fn logical_key<'a>(&self, storage_key: &'a str) -> Option<&'a str> {
        storage_key.strip_prefix(&*self.prefix)
    }

    /// A glob pattern over this table's storage keys. The prefix is escaped
    /// so only `pattern` itself is interpreted.
    pub fn pattern(&self, pattern: &str) -> String {
        format!("{}{}", escape_glob(&self.prefix), pattern)
    }

    /// A pattern matching every key of the table.
    pub fn everything(&self) -> String {
        self.pattern("*")
    }
}
