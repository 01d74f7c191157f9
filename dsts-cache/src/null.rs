use crate::{Cache, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Disabled-cache mode (spec §9): every operation is a no-op that
/// reports success, so callers keep working unmodified with caching
/// turned off in configuration.
#[derive(Default)]
pub struct NullCache;

#[async_trait]
impl Cache for NullCache {
    async fn get_raw(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn put_raw(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}
