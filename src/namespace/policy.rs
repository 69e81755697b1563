//! Table Expiration Policy
//!
//! Every table may carry two TTL settings, persisted as decimal millisecond
//! strings under the reserved `root` database:
//!
//! ```text
//! root:expt:<db>:<table>   explicit TTL for scalar writes     (absent = 0)
//! root:awt:<db>:<table>    sliding window, renewed on reads   (absent = -1)
//! ```
//!
//! A scalar write without its own TTL gets the explicit TTL if it is
//! positive, else the sliding window if that is positive, else none. A
//! scalar read renews the key by the sliding window when it is positive.
//!
//! The explicit TTL is read from the store on every write. The sliding
//! window is loaded once when the table handle is built and then served from
//! the handle, unless the table was opened with [`PolicyReads::Fresh`].

use crate::error::{Result, StoreError};
use crate::namespace::KeySpace;
use crate::store::StoreHandle;
use crate::{ADMIN_DATABASE, AUTO_WINDOW_TABLE, EXPIRE_TABLE, KEY_SEPARATOR};
use bytes::Bytes;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// Sliding window value meaning "no window".
pub const NO_WINDOW: i64 = -1;

/// How a table handle answers sliding-window queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyReads {
    /// Serve the window loaded at construction, updated only by this
    /// handle's own setter. Other handles' changes are not seen.
    #[default]
    Cached,
    /// Read the window from the store on every query.
    Fresh,
}

/// Options for [`Database::create_table_with`](crate::Database::create_table_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub policy_reads: PolicyReads,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy_reads(mut self, reads: PolicyReads) -> Self {
        self.policy_reads = reads;
        self
    }
}

/// Picks the TTL for a scalar write that did not specify one.
///
/// The explicit table TTL wins when positive, then the sliding window when
/// positive; otherwise the write is persistent.
///
/// ```
/// use nskv::namespace::resolve_write_ttl;
/// use std::time::Duration;
///
/// assert_eq!(resolve_write_ttl(5000, 2000), Some(Duration::from_millis(5000)));
/// assert_eq!(resolve_write_ttl(0, 2000), Some(Duration::from_millis(2000)));
/// assert_eq!(resolve_write_ttl(0, 0), None);
/// ```
pub fn resolve_write_ttl(explicit_ms: i64, window_ms: i64) -> Option<Duration> {
    let ms = if explicit_ms > 0 { explicit_ms } else { window_ms };
    (ms > 0).then(|| Duration::from_millis(ms as u64))
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// The expiration settings of one table, as seen by one handle.
#[derive(Debug)]
pub struct ExpirationPolicy {
    store: StoreHandle,
    expire_key: String,
    window_key: String,
    reads: PolicyReads,
    window_ms: AtomicI64,
}

impl ExpirationPolicy {
    /// Reads the persisted sliding window for `database:table`.
    pub(crate) async fn load(
        store: StoreHandle,
        database: &str,
        table: &str,
        reads: PolicyReads,
    ) -> Result<Self> {
        let qualified = format!("{database}{KEY_SEPARATOR}{table}");
        let expire_key = KeySpace::new(ADMIN_DATABASE, EXPIRE_TABLE).storage_key(&qualified);
        let window_key = KeySpace::new(ADMIN_DATABASE, AUTO_WINDOW_TABLE).storage_key(&qualified);

        let window_ms = read_millis(&store, &window_key).await?.unwrap_or(NO_WINDOW);
        debug!(table = %qualified, window_ms, ?reads, "loaded table policy");

        Ok(Self {
            store,
            expire_key,
            window_key,
            reads,
            window_ms: AtomicI64::new(window_ms),
        })
    }

    /// `root:expt:<db>:<table>`
    pub fn expire_key(&self) -> &str {
        &self.expire_key
    }

    /// `root:awt:<db>:<table>`
    pub fn window_key(&self) -> &str {
        &self.window_key
    }

    pub fn reads(&self) -> PolicyReads {
        self.reads
    }

    /// Persists the explicit TTL.
    pub async fn set_expire(&self, ttl: Duration) -> Result<()> {
        let ms = duration_millis(ttl);
        self.store
            .set(&self.expire_key, Bytes::from(ms.to_string()), None)
            .await?;
        debug!(key = %self.expire_key, ms, "table expire set");
        Ok(())
    }

    /// The persisted explicit TTL in milliseconds, 0 if unset.
    pub async fn table_expire(&self) -> Result<i64> {
        Ok(read_millis(&self.store, &self.expire_key).await?.unwrap_or(0))
    }

    /// Updates this handle's window and persists it.
    pub async fn set_auto_window(&self, window: Duration) -> Result<()> {
        let ms = duration_millis(window);
        self.store
            .set(&self.window_key, Bytes::from(ms.to_string()), None)
            .await?;
        self.window_ms.store(ms, Ordering::Relaxed);
        debug!(key = %self.window_key, ms, "table auto window set");
        Ok(())
    }

    /// The window as this handle last saw it.
    pub fn cached_window(&self) -> i64 {
        self.window_ms.load(Ordering::Relaxed)
    }

    /// The window according to the configured [`PolicyReads`].
    pub async fn auto_window(&self) -> Result<i64> {
        match self.reads {
            PolicyReads::Cached => Ok(self.cached_window()),
            PolicyReads::Fresh => self.reload_window().await,
        }
    }

    /// Re-reads the persisted window into this handle.
    pub async fn reload_window(&self) -> Result<i64> {
        let ms = read_millis(&self.store, &self.window_key)
            .await?
            .unwrap_or(NO_WINDOW);
        self.window_ms.store(ms, Ordering::Relaxed);
        Ok(ms)
    }

    /// TTL for a scalar write without an explicit TTL argument.
    pub async fn write_ttl(&self) -> Result<Option<Duration>> {
        let explicit = self.table_expire().await?;
        let window = if explicit > 0 {
            // Not needed, and Fresh mode would cost a round trip.
            NO_WINDOW
        } else {
            self.auto_window().await?
        };
        let ttl = resolve_write_ttl(explicit, window);
        trace!(explicit, window, ?ttl, "write ttl resolved");
        Ok(ttl)
    }

    /// The TTL a read should refresh the key to, if any.
    pub async fn renewal(&self) -> Result<Option<Duration>> {
        let window = self.auto_window().await?;
        Ok((window > 0).then(|| Duration::from_millis(window as u64)))
    }
}

/// Reads a decimal millisecond value. Absent and empty values are `None`.
async fn read_millis(store: &StoreHandle, key: &str) -> Result<Option<i64>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let ms = std::str::from_utf8(&raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or(StoreError::NotInteger)?;
    Ok(Some(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::{MemoryStore, Store};
    use std::sync::Arc;

    fn store() -> StoreHandle {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(resolve_write_ttl(5000, 2000), Some(Duration::from_millis(5000)));
        assert_eq!(resolve_write_ttl(0, 2000), Some(Duration::from_millis(2000)));
        assert_eq!(resolve_write_ttl(0, 0), None);
        assert_eq!(resolve_write_ttl(0, NO_WINDOW), None);
        assert_eq!(resolve_write_ttl(-5, 300), Some(Duration::from_millis(300)));
    }

    #[tokio::test]
    async fn test_admin_keys() {
        let policy = ExpirationPolicy::load(store(), "app", "users", PolicyReads::Cached)
            .await
            .unwrap();
        assert_eq!(policy.expire_key(), "root:expt:app:users");
        assert_eq!(policy.window_key(), "root:awt:app:users");
    }

    #[tokio::test]
    async fn test_defaults_without_metadata() {
        let policy = ExpirationPolicy::load(store(), "app", "users", PolicyReads::Cached)
            .await
            .unwrap();
        assert_eq!(policy.cached_window(), NO_WINDOW);
        assert_eq!(policy.table_expire().await.unwrap(), 0);
        assert_eq!(policy.write_ttl().await.unwrap(), None);
        assert_eq!(policy.renewal().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_metadata_reads_as_unset() {
        let store = store();
        store.set("root:awt:app:users", Bytes::new(), None).await.unwrap();
        store.set("root:expt:app:users", Bytes::new(), None).await.unwrap();

        let policy = ExpirationPolicy::load(store, "app", "users", PolicyReads::Cached)
            .await
            .unwrap();
        assert_eq!(policy.cached_window(), NO_WINDOW);
        assert_eq!(policy.table_expire().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_metadata_is_a_store_fault() {
        let store = store();
        store
            .set("root:awt:app:users", Bytes::from("soon"), None)
            .await
            .unwrap();

        let result = ExpirationPolicy::load(store, "app", "users", PolicyReads::Cached).await;
        assert!(matches!(result, Err(Error::Store(StoreError::NotInteger))));
    }

    #[tokio::test]
    async fn test_setters_persist_decimal_millis() {
        let store = store();
        let policy = ExpirationPolicy::load(Arc::clone(&store), "app", "users", PolicyReads::Cached)
            .await
            .unwrap();

        policy.set_expire(Duration::from_secs(5)).await.unwrap();
        policy.set_auto_window(Duration::from_secs(2)).await.unwrap();

        assert_eq!(
            store.get("root:expt:app:users").await.unwrap(),
            Some(Bytes::from("5000"))
        );
        assert_eq!(
            store.get("root:awt:app:users").await.unwrap(),
            Some(Bytes::from("2000"))
        );
        assert_eq!(policy.cached_window(), 2000);
        assert_eq!(policy.write_ttl().await.unwrap(), Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_cached_and_fresh_reads() {
        let store = store();
        let cached = ExpirationPolicy::load(Arc::clone(&store), "app", "users", PolicyReads::Cached)
            .await
            .unwrap();
        let fresh = ExpirationPolicy::load(Arc::clone(&store), "app", "users", PolicyReads::Fresh)
            .await
            .unwrap();
        let writer = ExpirationPolicy::load(Arc::clone(&store), "app", "users", PolicyReads::Cached)
            .await
            .unwrap();

        writer.set_auto_window(Duration::from_millis(1500)).await.unwrap();

        assert_eq!(cached.auto_window().await.unwrap(), NO_WINDOW);
        assert_eq!(fresh.auto_window().await.unwrap(), 1500);
        assert_eq!(cached.reload_window().await.unwrap(), 1500);
        assert_eq!(cached.auto_window().await.unwrap(), 1500);
    }

    #[tokio::test]
    async fn test_failed_window_write_keeps_cache() {
        use crate::protocol::{ClientConfig, RespClient};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        // Answers the load's GET, then refuses the write.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 512];
            let replies: [&[u8]; 2] = [
                b"$-1\r\n",
                b"-READONLY You can't write against a read only replica.\r\n",
            ];
            for reply in replies {
                socket.read(&mut buf).await.unwrap();
                socket.write_all(reply).await.unwrap();
            }
        });

        let store: StoreHandle = Arc::new(RespClient::new(ClientConfig::new("127.0.0.1", port)));
        let policy = ExpirationPolicy::load(store, "app", "users", PolicyReads::Cached)
            .await
            .unwrap();
        assert_eq!(policy.cached_window(), NO_WINDOW);

        assert!(policy
            .set_auto_window(Duration::from_millis(1000))
            .await
            .is_err());
        assert_eq!(policy.cached_window(), NO_WINDOW);
    }
}
