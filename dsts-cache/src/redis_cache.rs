use crate::{Cache, CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::warn;

/// Per-request-operation deadline for cache round trips (spec §5: 1s
/// budget, with 5/3/3s dial/read/write timeouts backing the pool itself).
const OPERATION_TIMEOUT: Duration = Duration::from_secs(1);

pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let connection = client
            .get_tokio_connection_manager()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { connection })
    }

    async fn with_timeout<F, T>(fut: F) -> Result<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(OPERATION_TIMEOUT, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::Connection(e.to_string())),
            Err(_) => Err(CacheError::Connection("cache round trip timed out".to_string())),
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let result = Self::with_timeout(conn.get::<_, Option<String>>(key)).await;
        if let Err(ref e) = result {
            warn!(%key, error = %e, "cache get failed");
        }
        result
    }

    async fn put_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        let result = Self::with_timeout(conn.set_ex::<_, _, ()>(key, value, seconds)).await;
        if let Err(ref e) = result {
            warn!(%key, error = %e, "cache put failed");
        }
        result
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let result = Self::with_timeout(conn.del::<_, ()>(key)).await;
        if let Err(ref e) = result {
            warn!(%key, error = %e, "cache delete failed");
        }
        result
    }
}
