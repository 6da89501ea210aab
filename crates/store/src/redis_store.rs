//! Redis queue store.
//!
//! Every [`QueueStore`] operation is one Redis command, so atomicity comes
//! from Redis itself:
//!
//! | Operation | Command |
//! |-----------|---------|
//! | `push_back` | `RPUSH` |
//! | `pop_front` | `LPOP` |
//! | `list_len` | `LLEN` |
//! | `list_items` | `LRANGE 0 -1` |
//! | `hash_set` | `HSET` |
//! | `hash_get` | `HGET` |
//! | `hash_entries` | `HGETALL` |
//!
//! Producers outside the gateway must also `RPUSH` for queues to stay FIFO.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use dispatch::{QueueStore, StoreError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

/// Failure to establish the initial Redis connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid Redis URL: {0}")]
    InvalidUrl(#[source] RedisError),

    #[error("Redis connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("Redis connection failed: {0}")]
    Connection(#[source] RedisError),
}

/// [`QueueStore`] backed by a Redis server.
///
/// The [`ConnectionManager`] multiplexes one connection and reconnects on its
/// own; it is cloned per command.
#[derive(Clone)]
pub struct RedisQueueStore {
    connection: ConnectionManager,
}

impl fmt::Debug for RedisQueueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueueStore").finish_non_exhaustive()
    }
}

impl RedisQueueStore {
    /// Opens a managed connection to `url`, giving up after `connect_timeout`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, ConnectError> {
        let client = redis::Client::open(url).map_err(ConnectError::InvalidUrl)?;
        let connection = timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| ConnectError::Timeout(connect_timeout))?
            .map_err(ConnectError::Connection)?;

        info!("Connected to Redis queue store");
        Ok(Self { connection })
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

/// Classifies a Redis failure: transport problems make the store
/// unavailable, anything else is a protocol error.
fn map_redis_error(operation: &'static str, error: RedisError) -> StoreError {
    warn!(operation, error = %error, "Redis operation failed");

    if error.is_io_error()
        || error.is_timeout()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
    {
        StoreError::Unavailable {
            operation,
            message: error.to_string(),
        }
    } else {
        StoreError::Protocol {
            operation,
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push_back(&self, list: &str, item: String) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: u64 = conn
            .rpush(list, item)
            .await
            .map_err(|e| map_redis_error("push_back", e))?;
        Ok(())
    }

    async fn pop_front(&self, list: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection();
        conn.lpop(list, None)
            .await
            .map_err(|e| map_redis_error("pop_front", e))
    }

    async fn list_len(&self, list: &str) -> Result<u64, StoreError> {
        let mut conn = self.connection();
        conn.llen(list)
            .await
            .map_err(|e| map_redis_error("list_len", e))
    }

    async fn list_items(&self, list: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection();
        conn.lrange(list, 0, -1)
            .await
            .map_err(|e| map_redis_error("list_items", e))
    }

    async fn hash_set(&self, hash: &str, field: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.connection();
        let _: u64 = conn
            .hset(hash, field, value)
            .await
            .map_err(|e| map_redis_error("hash_set", e))?;
        Ok(())
    }

    async fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection();
        conn.hget(hash, field)
            .await
            .map_err(|e| map_redis_error("hash_get", e))
    }

    async fn hash_entries(&self, hash: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let mut conn = self.connection();
        conn.hgetall(hash)
            .await
            .map_err(|e| map_redis_error("hash_entries", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let result = RedisQueueStore::connect("not-a-url", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(ConnectError::InvalidUrl(_))));
    }

    #[test]
    fn transport_failures_are_unavailable() {
        let io = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(
            map_redis_error("pop_front", io),
            StoreError::Unavailable { operation: "pop_front", .. }
        ));
    }

    #[test]
    fn type_errors_are_protocol_errors() {
        let wrong_type = RedisError::from((redis::ErrorKind::TypeError, "WRONGTYPE"));
        assert!(matches!(
            map_redis_error("pop_front", wrong_type),
            StoreError::Protocol { .. }
        ));
    }

    // Requires a running server: REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn round_trip_against_live_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let store = RedisQueueStore::connect(&url, Duration::from_secs(2))
            .await
            .unwrap();
        let list = format!("store-test:{}", std::process::id());

        store.push_back(&list, "first".to_string()).await.unwrap();
        store.push_back(&list, "second".to_string()).await.unwrap();
        assert_eq!(store.list_len(&list).await.unwrap(), 2);
        assert_eq!(store.pop_front(&list).await.unwrap().as_deref(), Some("first"));
        assert_eq!(store.pop_front(&list).await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.pop_front(&list).await.unwrap(), None);

        let hash = format!("{list}:hash");
        store.hash_set(&hash, "h", "1".to_string()).await.unwrap();
        store.hash_set(&hash, "h", "2".to_string()).await.unwrap();
        assert_eq!(store.hash_get(&hash, "h").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.hash_entries(&hash).await.unwrap().len(), 1);
    }
}
