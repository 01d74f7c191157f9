//! The Volatile Cache (spec §4.4): a best-effort key/value front for the
//! Authoritative Store. The cache is a *capability*, not a layer the store
//! flows through — the [`Cache`] trait is deliberately narrow (raw
//! get/put/delete over strings) and callers in `dsts-sts`/`dsts-device`
//! own the fallback policy, per spec §9's design note.

pub mod error;
pub mod keys;
mod null;
mod redis_cache;

pub use error::{CacheError, Result};
pub use null::NullCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;
    async fn put_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Typed convenience helpers layered over the raw string cache. These are
/// not part of the `Cache` trait itself (object-safety, and because the
/// serialization concern is orthogonal to the backend).
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>> {
    match cache.get_raw(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn put_json<T: Serialize + Sync>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    cache.put_raw(key, raw, ttl).await
}
