//! # Redis Store
//!
//! Redis-backed [`CacheStore`] over a multiplexed async connection. Every
//! command runs under the configured operation timeout so an outage turns
//! into an error the decorators can degrade on, never a hung request.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};

use super::{CacheStore, ttl_seconds};
use crate::error::{CacheError, Result};

/// Keys fetched per SCAN round trip.
const SCAN_COUNT: usize = 500;

/// Keys removed per DEL command during prefix deletion.
const DELETE_BATCH: usize = 500;

/// Redis cache store
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Open a connection and probe it with `PING`.
    ///
    /// No retries: a failure is reported to the caller as is.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = tokio::time::timeout(connect_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| timeout_error(connect_timeout))??;

        let store = Self {
            conn,
            operation_timeout,
        };
        store.ping().await?;
        Ok(store)
    }

    /// Get raw connection for advanced operations
    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    async fn run<T>(&self, fut: impl Future<Output = RedisResult<T>>) -> Result<T> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(timeout_error(self.operation_timeout)),
        }
    }
}

fn timeout_error(after: Duration) -> CacheError {
    CacheError::Timeout {
        timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = self.run(redis::cmd("PING").query_async(&mut conn)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = self.run(conn.get(key)).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = self
            .run(conn.set_ex(key, value, ttl_seconds(ttl)))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self.run(conn.del(key)).await?;
        Ok(deleted > 0)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT);
            let (next, batch): (u64, Vec<String>) = self.run(cmd.query_async(&mut conn)).await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let keys = self.scan_prefix(prefix).await?;
        let mut conn = self.conn.clone();
        let mut deleted: u64 = 0;

        for chunk in keys.chunks(DELETE_BATCH) {
            let removed: u64 = self.run(conn.del(chunk)).await?;
            deleted += removed;
        }

        Ok(deleted)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let secs: i64 = self.run(conn.ttl(key)).await?;
        // -2: no such key, -1: no expiry
        Ok(u64::try_from(secs).ok().map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("api-cache:users:"), "api-cache:users:");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[test]
    fn test_timeout_error_reports_millis() {
        let err = timeout_error(Duration::from_secs(5));
        assert!(matches!(err, CacheError::Timeout { timeout_ms: 5000 }));
    }
}
