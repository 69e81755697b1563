//! RESP Client
//!
//! [`RespClient`] implements [`Store`] by sending each primitive as one RESP
//! command to a Redis-compatible server and decoding the reply.
//!
//! ## Connection Handling
//!
//! ```text
//!   execute(cmd)
//!        │
//!        ▼
//!   lock connection ──► none yet? ──► connect (connect_timeout)
//!        │
//!        ▼
//!   write command, read until one full reply (command_timeout)
//!        │
//!        ├── ok / error reply ──► keep connection
//!        └── I/O, protocol or timeout failure ──► drop connection,
//!                                                 reconnect next call
//! ```
//!
//! One connection is shared and commands are serialized on it. A blocking
//! pop therefore holds the connection for its whole wait.

use crate::error::{StoreError, StoreResult};
use crate::protocol::{Command, RespParser, RespValue};
use crate::store::{
    InsertPosition, KeyTtl, KeyType, Limit, ScanOptions, ScanPage, ScoreRange, ScoredMember,
    Store,
};
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Initial read buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Where and how to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Limit on establishing the TCP connection
    pub connect_timeout: Duration,
    /// Limit on one command round trip. Blocking pops add their own wait.
    pub command_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    parser: RespParser,
}

impl Connection {
    async fn open(config: &ClientConfig) -> StoreResult<Self> {
        let addr = config.addr();
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| StoreError::Timeout(config.connect_timeout))??;
        stream.set_nodelay(true)?;
        debug!(%addr, "connected to store");

        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::new(),
        })
    }

    async fn round_trip(&mut self, command: &Command) -> StoreResult<RespValue> {
        self.stream.write_all(&command.encode()).await?;

        loop {
            if let Some((reply, consumed)) = self.parser.parse(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(reply);
            }
            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(StoreError::ConnectionClosed);
            }
        }
    }
}

/// A [`Store`] backed by a Redis-compatible server.
///
/// # Example
///
/// ```no_run
/// use nskv::protocol::{ClientConfig, RespClient};
/// use nskv::store::Store;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RespClient::connect(ClientConfig::new("127.0.0.1", 6379)).await?;
/// client.set("app:users:1", "Ariz".into(), None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RespClient {
    config: ClientConfig,
    connection: Mutex<Option<Connection>>,
}

impl RespClient {
    /// Creates a client that connects on first use.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// Creates a client and connects immediately.
    pub async fn connect(config: ClientConfig) -> StoreResult<Self> {
        let connection = Connection::open(&config).await?;
        Ok(Self {
            config,
            connection: Mutex::new(Some(connection)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `command` and returns the raw reply.
    ///
    /// Error replies are returned as [`RespValue::Error`]; the typed
    /// conversions on `RespValue` turn them into [`StoreError`]s.
    pub async fn execute(&self, command: Command) -> StoreResult<RespValue> {
        self.execute_within(command, Some(self.config.command_timeout))
            .await
    }

    /// `PING`
    pub async fn ping(&self) -> StoreResult<()> {
        match self.execute(Command::new("PING")).await?.into_result()? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(StoreError::UnexpectedReply(other.to_string())),
        }
    }

    async fn execute_within(
        &self,
        command: Command,
        limit: Option<Duration>,
    ) -> StoreResult<RespValue> {
        let mut slot = self.connection.lock().await;
        let mut connection = match slot.take() {
            Some(connection) => connection,
            None => Connection::open(&self.config).await?,
        };

        trace!(command = command.name(), "sending command");
        let outcome = match limit {
            Some(limit) => tokio::time::timeout(limit, connection.round_trip(&command))
                .await
                .unwrap_or(Err(StoreError::Timeout(limit))),
            None => connection.round_trip(&command).await,
        };

        match outcome {
            Ok(reply) => {
                *slot = Some(connection);
                Ok(reply)
            }
            Err(e) => {
                // The stream may hold a partial reply; start over next time.
                warn!(command = command.name(), error = %e, "dropping store connection");
                Err(e)
            }
        }
    }

    /// Blocking commands may legitimately wait `wait` before replying.
    async fn execute_blocking(&self, command: Command, wait: Duration) -> StoreResult<RespValue> {
        if wait.is_zero() {
            return self.execute_within(command, None).await;
        }
        let limit = wait
            .checked_add(self.config.command_timeout)
            .ok_or(StoreError::TimeoutOutOfRange)?;
        self.execute_within(command, Some(limit)).await
    }
}

/// Millisecond argument for a TTL, rounded up so a non-zero TTL never
/// becomes `0`. Values past `i64::MAX` ms are rejected like Redis does.
fn ttl_millis(ttl: Duration) -> StoreResult<i64> {
    let mut ms = ttl.as_millis();
    if ttl.subsec_nanos() % 1_000_000 != 0 {
        ms += 1;
    }
    i64::try_from(ms).map_err(|_| StoreError::InvalidExpireTime)
}

/// Seconds argument for blocking commands. Fractions are supported by
/// Redis 6 and later.
fn blocking_secs(timeout: Duration) -> String {
    format!("{:.3}", timeout.as_secs_f64())
}

fn score_range_args(command: Command, low: f64, high: f64) -> Command {
    command.float(low).float(high)
}

fn with_limit(command: Command, limit: Option<Limit>) -> Command {
    match limit {
        Some(limit) => command
            .arg("LIMIT")
            .uint(limit.offset as u64)
            .uint(limit.count as u64),
        None => command,
    }
}

fn with_scan_options(command: Command, options: &ScanOptions) -> Command {
    let command = match &options.pattern {
        Some(pattern) => command.arg("MATCH").arg(pattern),
        None => command,
    };
    match options.count {
        Some(count) => command.arg("COUNT").uint(count as u64),
        None => command,
    }
}

fn opt_count(reply: RespValue) -> StoreResult<Option<u64>> {
    match reply.into_result()? {
        RespValue::Null => Ok(None),
        other => other.into_count().map(Some),
    }
}

/// `BLPOP`/`BRPOP` reply: null or `[key, value]`.
fn popped_value(reply: RespValue) -> StoreResult<Option<Bytes>> {
    Ok(reply.into_bytes_vec()?.pop())
}

#[async_trait]
impl Store for RespClient {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.execute(Command::new("EXISTS").arg(key)).await?.into_bool()
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        self.execute(Command::new("DEL").args(keys)).await?.into_count()
    }

    async fn pexpire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let ms = ttl_millis(ttl)?;
        self.execute(Command::new("PEXPIRE").arg(key).int(ms))
            .await?
            .into_bool()
    }

    async fn pexpire_at(&self, key: &str, at: SystemTime) -> StoreResult<bool> {
        let ms = ttl_millis(at.duration_since(UNIX_EPOCH).unwrap_or_default())?;
        self.execute(Command::new("PEXPIREAT").arg(key).int(ms))
            .await?
            .into_bool()
    }

    async fn persist(&self, key: &str) -> StoreResult<bool> {
        self.execute(Command::new("PERSIST").arg(key)).await?.into_bool()
    }

    async fn pttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let ms = self.execute(Command::new("PTTL").arg(key)).await?.into_int()?;
        Ok(KeyTtl::from_millis(ms))
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let keys = self
            .execute(Command::new("KEYS").arg(pattern))
            .await?
            .into_bytes_vec()?;
        Ok(keys
            .iter()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect())
    }

    async fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        self.execute(Command::new("RENAME").arg(from).arg(to))
            .await?
            .into_ok()
    }

    async fn rename_nx(&self, from: &str, to: &str) -> StoreResult<bool> {
        self.execute(Command::new("RENAMENX").arg(from).arg(to))
            .await?
            .into_bool()
    }

    async fn key_type(&self, key: &str) -> StoreResult<KeyType> {
        self.execute(Command::new("TYPE").arg(key))
            .await?
            .into_key_type()
    }

    async fn dump(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("DUMP").arg(key))
            .await?
            .into_opt_bytes()
    }

    async fn restore(
        &self,
        key: &str,
        ttl: Option<Duration>,
        payload: Bytes,
        replace: bool,
    ) -> StoreResult<()> {
        let ms = ttl.map(ttl_millis).transpose()?.unwrap_or(0);
        let mut command = Command::new("RESTORE").arg(key).int(ms).bulk(payload);
        if replace {
            command = command.arg("REPLACE");
        }
        self.execute(command).await?.into_ok()
    }

    async fn move_key(&self, key: &str, db: u32) -> StoreResult<bool> {
        self.execute(Command::new("MOVE").arg(key).uint(db as u64))
            .await?
            .into_bool()
    }

    async fn random_key(&self) -> StoreResult<Option<String>> {
        let key = self.execute(Command::new("RANDOMKEY")).await?.into_opt_bytes()?;
        Ok(key.map(|k| String::from_utf8_lossy(&k).into_owned()))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("GET").arg(key)).await?.into_opt_bytes()
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> StoreResult<()> {
        let mut command = Command::new("SET").arg(key).bulk(value);
        if let Some(ttl) = ttl {
            command = command.arg("PX").int(ttl_millis(ttl)?);
        }
        self.execute(command).await?.into_ok()
    }

    async fn set_nx(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> StoreResult<bool> {
        let mut command = Command::new("SET").arg(key).bulk(value).arg("NX");
        if let Some(ttl) = ttl {
            command = command.arg("PX").int(ttl_millis(ttl)?);
        }
        Ok(self.execute(command).await?.into_opt_bytes()?.is_some())
    }

    async fn get_range(&self, key: &str, start: i64, end: i64) -> StoreResult<Bytes> {
        self.execute(Command::new("GETRANGE").arg(key).int(start).int(end))
            .await?
            .into_bytes()
    }

    async fn set_range(&self, key: &str, offset: usize, value: Bytes) -> StoreResult<usize> {
        let len = self
            .execute(Command::new("SETRANGE").arg(key).uint(offset as u64).bulk(value))
            .await?
            .into_count()?;
        Ok(len as usize)
    }

    async fn get_set(&self, key: &str, value: Bytes) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("GETSET").arg(key).bulk(value))
            .await?
            .into_opt_bytes()
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<Bytes>>> {
        self.execute(Command::new("MGET").args(keys))
            .await?
            .into_opt_bytes_vec()
    }

    async fn mset(&self, pairs: &[(String, Bytes)]) -> StoreResult<()> {
        let command = pairs.iter().fold(Command::new("MSET"), |cmd, (k, v)| {
            cmd.arg(k).bulk(v.clone())
        });
        self.execute(command).await?.into_ok()
    }

    async fn mset_nx(&self, pairs: &[(String, Bytes)]) -> StoreResult<bool> {
        let command = pairs.iter().fold(Command::new("MSETNX"), |cmd, (k, v)| {
            cmd.arg(k).bulk(v.clone())
        });
        self.execute(command).await?.into_bool()
    }

    async fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        self.execute(Command::new("INCRBY").arg(key).int(delta))
            .await?
            .into_int()
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> StoreResult<f64> {
        self.execute(Command::new("INCRBYFLOAT").arg(key).float(delta))
            .await?
            .into_float()
    }

    async fn append(&self, key: &str, value: Bytes) -> StoreResult<usize> {
        let len = self
            .execute(Command::new("APPEND").arg(key).bulk(value))
            .await?
            .into_count()?;
        Ok(len as usize)
    }

    async fn strlen(&self, key: &str) -> StoreResult<usize> {
        let len = self.execute(Command::new("STRLEN").arg(key)).await?.into_count()?;
        Ok(len as usize)
    }

    async fn get_bit(&self, key: &str, offset: u64) -> StoreResult<bool> {
        self.execute(Command::new("GETBIT").arg(key).uint(offset))
            .await?
            .into_bool()
    }

    async fn set_bit(&self, key: &str, offset: u64, on: bool) -> StoreResult<bool> {
        let bit = if on { "1" } else { "0" };
        self.execute(Command::new("SETBIT").arg(key).uint(offset).arg(bit))
            .await?
            .into_bool()
    }

    async fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("HGET").arg(key).arg(field))
            .await?
            .into_opt_bytes()
    }

    async fn hget_all(&self, key: &str) -> StoreResult<Vec<(Bytes, Bytes)>> {
        self.execute(Command::new("HGETALL").arg(key)).await?.into_pairs()
    }

    async fn hmget(&self, key: &str, fields: &[Bytes]) -> StoreResult<Vec<Option<Bytes>>> {
        self.execute(Command::new("HMGET").arg(key).args(fields))
            .await?
            .into_opt_bytes_vec()
    }

    async fn hset(&self, key: &str, field: Bytes, value: Bytes) -> StoreResult<bool> {
        self.execute(Command::new("HSET").arg(key).bulk(field).bulk(value))
            .await?
            .into_bool()
    }

    async fn hset_many(&self, key: &str, pairs: &[(Bytes, Bytes)]) -> StoreResult<u64> {
        let command = pairs
            .iter()
            .fold(Command::new("HSET").arg(key), |cmd, (f, v)| {
                cmd.bulk(f.clone()).bulk(v.clone())
            });
        self.execute(command).await?.into_count()
    }

    async fn hset_nx(&self, key: &str, field: Bytes, value: Bytes) -> StoreResult<bool> {
        self.execute(Command::new("HSETNX").arg(key).bulk(field).bulk(value))
            .await?
            .into_bool()
    }

    async fn hdel(&self, key: &str, fields: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("HDEL").arg(key).args(fields))
            .await?
            .into_count()
    }

    async fn hexists(&self, key: &str, field: &[u8]) -> StoreResult<bool> {
        self.execute(Command::new("HEXISTS").arg(key).arg(field))
            .await?
            .into_bool()
    }

    async fn hincr_by(&self, key: &str, field: &[u8], delta: i64) -> StoreResult<i64> {
        self.execute(Command::new("HINCRBY").arg(key).arg(field).int(delta))
            .await?
            .into_int()
    }

    async fn hincr_by_float(&self, key: &str, field: &[u8], delta: f64) -> StoreResult<f64> {
        self.execute(Command::new("HINCRBYFLOAT").arg(key).arg(field).float(delta))
            .await?
            .into_float()
    }

    async fn hkeys(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("HKEYS").arg(key)).await?.into_bytes_vec()
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        self.execute(Command::new("HLEN").arg(key)).await?.into_count()
    }

    async fn hvals(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("HVALS").arg(key)).await?.into_bytes_vec()
    }

    async fn hscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<(Bytes, Bytes)>> {
        let command = with_scan_options(Command::new("HSCAN").arg(key).uint(cursor), options);
        self.execute(command).await?.into_scan(RespValue::into_pairs)
    }

    async fn lindex(&self, key: &str, index: i64) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("LINDEX").arg(key).int(index))
            .await?
            .into_opt_bytes()
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("LRANGE").arg(key).int(start).int(stop))
            .await?
            .into_bytes_vec()
    }

    async fn lpush(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("LPUSH").arg(key).args(values))
            .await?
            .into_count()
    }

    async fn lpush_x(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("LPUSHX").arg(key).args(values))
            .await?
            .into_count()
    }

    async fn rpush(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("RPUSH").arg(key).args(values))
            .await?
            .into_count()
    }

    async fn rpush_x(&self, key: &str, values: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("RPUSHX").arg(key).args(values))
            .await?
            .into_count()
    }

    async fn linsert(
        &self,
        key: &str,
        position: InsertPosition,
        pivot: &[u8],
        value: Bytes,
    ) -> StoreResult<i64> {
        let position = match position {
            InsertPosition::Before => "BEFORE",
            InsertPosition::After => "AFTER",
        };
        self.execute(
            Command::new("LINSERT")
                .arg(key)
                .arg(position)
                .arg(pivot)
                .bulk(value),
        )
        .await?
        .into_int()
    }

    async fn lset(&self, key: &str, index: i64, value: Bytes) -> StoreResult<()> {
        self.execute(Command::new("LSET").arg(key).int(index).bulk(value))
            .await?
            .into_ok()
    }

    async fn lpop(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("LPOP").arg(key)).await?.into_opt_bytes()
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("RPOP").arg(key)).await?.into_opt_bytes()
    }

    async fn blpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<Bytes>> {
        let command = Command::new("BLPOP").arg(key).arg(blocking_secs(timeout));
        popped_value(self.execute_blocking(command, timeout).await?)
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> StoreResult<Option<Bytes>> {
        let command = Command::new("BRPOP").arg(key).arg(blocking_secs(timeout));
        popped_value(self.execute_blocking(command, timeout).await?)
    }

    async fn rpoplpush(&self, source: &str, destination: &str) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("RPOPLPUSH").arg(source).arg(destination))
            .await?
            .into_opt_bytes()
    }

    async fn brpoplpush(
        &self,
        source: &str,
        destination: &str,
        timeout: Duration,
    ) -> StoreResult<Option<Bytes>> {
        let command = Command::new("BRPOPLPUSH")
            .arg(source)
            .arg(destination)
            .arg(blocking_secs(timeout));
        self.execute_blocking(command, timeout)
            .await?
            .into_opt_bytes()
    }

    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> StoreResult<u64> {
        self.execute(Command::new("LREM").arg(key).int(count).arg(value))
            .await?
            .into_count()
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> StoreResult<()> {
        self.execute(Command::new("LTRIM").arg(key).int(start).int(stop))
            .await?
            .into_ok()
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        self.execute(Command::new("LLEN").arg(key)).await?.into_count()
    }

    async fn sadd(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("SADD").arg(key).args(members))
            .await?
            .into_count()
    }

    async fn srem(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("SREM").arg(key).args(members))
            .await?
            .into_count()
    }

    async fn spop(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("SPOP").arg(key)).await?.into_opt_bytes()
    }

    async fn smove(&self, source: &str, destination: &str, member: &[u8]) -> StoreResult<bool> {
        self.execute(Command::new("SMOVE").arg(source).arg(destination).arg(member))
            .await?
            .into_bool()
    }

    async fn scard(&self, key: &str) -> StoreResult<u64> {
        self.execute(Command::new("SCARD").arg(key)).await?.into_count()
    }

    async fn sismember(&self, key: &str, member: &[u8]) -> StoreResult<bool> {
        self.execute(Command::new("SISMEMBER").arg(key).arg(member))
            .await?
            .into_bool()
    }

    async fn sinter(&self, keys: &[String]) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("SINTER").args(keys))
            .await?
            .into_bytes_vec()
    }

    async fn sinter_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.execute(Command::new("SINTERSTORE").arg(destination).args(keys))
            .await?
            .into_count()
    }

    async fn sunion(&self, keys: &[String]) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("SUNION").args(keys))
            .await?
            .into_bytes_vec()
    }

    async fn sunion_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.execute(Command::new("SUNIONSTORE").arg(destination).args(keys))
            .await?
            .into_count()
    }

    async fn sdiff(&self, keys: &[String]) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("SDIFF").args(keys))
            .await?
            .into_bytes_vec()
    }

    async fn sdiff_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        self.execute(Command::new("SDIFFSTORE").arg(destination).args(keys))
            .await?
            .into_count()
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("SMEMBERS").arg(key))
            .await?
            .into_bytes_vec()
    }

    async fn srandmember(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.execute(Command::new("SRANDMEMBER").arg(key))
            .await?
            .into_opt_bytes()
    }

    async fn srandmember_count(&self, key: &str, count: i64) -> StoreResult<Vec<Bytes>> {
        self.execute(Command::new("SRANDMEMBER").arg(key).int(count))
            .await?
            .into_bytes_vec()
    }

    async fn sscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<Bytes>> {
        let command = with_scan_options(Command::new("SSCAN").arg(key).uint(cursor), options);
        self.execute(command).await?.into_scan(RespValue::into_bytes_vec)
    }

    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> StoreResult<u64> {
        let command = members.iter().fold(Command::new("ZADD").arg(key), |cmd, m| {
            cmd.float(m.score).bulk(m.member.clone())
        });
        self.execute(command).await?.into_count()
    }

    async fn zrem(&self, key: &str, members: &[Bytes]) -> StoreResult<u64> {
        self.execute(Command::new("ZREM").arg(key).args(members))
            .await?
            .into_count()
    }

    async fn zincr_by(&self, key: &str, delta: f64, member: Bytes) -> StoreResult<f64> {
        self.execute(Command::new("ZINCRBY").arg(key).float(delta).bulk(member))
            .await?
            .into_float()
    }

    async fn zrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>> {
        opt_count(self.execute(Command::new("ZRANK").arg(key).arg(member)).await?)
    }

    async fn zrevrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>> {
        opt_count(self.execute(Command::new("ZREVRANK").arg(key).arg(member)).await?)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<ScoredMember>> {
        let command = Command::new("ZRANGE")
            .arg(key)
            .int(start)
            .int(stop)
            .arg("WITHSCORES");
        self.execute(command).await?.into_scored()
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<ScoredMember>> {
        let command = Command::new("ZREVRANGE")
            .arg(key)
            .int(start)
            .int(stop)
            .arg("WITHSCORES");
        self.execute(command).await?.into_scored()
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        limit: Option<Limit>,
    ) -> StoreResult<Vec<ScoredMember>> {
        let command = score_range_args(Command::new("ZRANGEBYSCORE").arg(key), range.min, range.max)
            .arg("WITHSCORES");
        self.execute(with_limit(command, limit)).await?.into_scored()
    }

    async fn zrevrange_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        limit: Option<Limit>,
    ) -> StoreResult<Vec<ScoredMember>> {
        let command =
            score_range_args(Command::new("ZREVRANGEBYSCORE").arg(key), range.max, range.min)
                .arg("WITHSCORES");
        self.execute(with_limit(command, limit)).await?.into_scored()
    }

    async fn zcount(&self, key: &str, range: ScoreRange) -> StoreResult<u64> {
        let command = score_range_args(Command::new("ZCOUNT").arg(key), range.min, range.max);
        self.execute(command).await?.into_count()
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.execute(Command::new("ZCARD").arg(key)).await?.into_count()
    }

    async fn zscore(&self, key: &str, member: &[u8]) -> StoreResult<Option<f64>> {
        self.execute(Command::new("ZSCORE").arg(key).arg(member))
            .await?
            .into_opt_float()
    }

    async fn zremrange_by_rank(&self, key: &str, start: i64, stop: i64) -> StoreResult<u64> {
        self.execute(Command::new("ZREMRANGEBYRANK").arg(key).int(start).int(stop))
            .await?
            .into_count()
    }

    async fn zremrange_by_score(&self, key: &str, range: ScoreRange) -> StoreResult<u64> {
        let command =
            score_range_args(Command::new("ZREMRANGEBYSCORE").arg(key), range.min, range.max);
        self.execute(command).await?.into_count()
    }

    async fn zunion_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        let command = Command::new("ZUNIONSTORE")
            .arg(destination)
            .uint(keys.len() as u64)
            .args(keys);
        self.execute(command).await?.into_count()
    }

    async fn zinter_store(&self, destination: &str, keys: &[String]) -> StoreResult<u64> {
        let command = Command::new("ZINTERSTORE")
            .arg(destination)
            .uint(keys.len() as u64)
            .args(keys);
        self.execute(command).await?.into_count()
    }

    async fn zscan(
        &self,
        key: &str,
        cursor: u64,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage<ScoredMember>> {
        let command = with_scan_options(Command::new("ZSCAN").arg(key).uint(cursor), options);
        self.execute(command).await?.into_scan(RespValue::into_scored)
    }
}
