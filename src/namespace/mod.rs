//! Namespace Layer
//!
//! Logical keys live in a two level hierarchy. A storage key is always
//!
//! ```text
//! <database>:<table>:<logical key>
//! ```
//!
//! Database and table names may not contain `:` and are at most ten
//! characters long. Each table carries an [`ExpirationPolicy`] whose
//! settings live under the reserved `root` database.
//!
//! ## Modules
//!
//! - `keyspace`: name validation and the `KeySpace` prefix type
//! - `policy`: explicit TTL and sliding window per table
//! - `database`: `Database`, the factory for tables
//! - `table`: `Table`, the factory for operation facades

pub mod database;
pub mod keyspace;
pub mod policy;
pub mod table;

pub use database::Database;
pub use keyspace::{validate_name, KeySpace};
pub use policy::{resolve_write_ttl, ExpirationPolicy, PolicyReads, TableOptions, NO_WINDOW};
pub use table::Table;

use crate::error::Result;
use crate::store::StoreHandle;

/// Enumerates keys matching `pattern`, then deletes them in one command.
///
/// The two steps are separate round trips. Keys written in between may or
/// may not be deleted.
pub(crate) async fn delete_matching(store: &StoreHandle, pattern: &str) -> Result<u64> {
    let keys = store.keys(pattern).await?;
    if keys.is_empty() {
        return Ok(0);
    }
    Ok(store.del(&keys).await?)
}
