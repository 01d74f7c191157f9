use dsts_cache::{get_json, keys, put_json, Cache};
use dsts_error::{reasons, DstsError, Result};
use dsts_store::models::Device;
use dsts_store::Store;

/// The composite device read (spec §4.7): cache, then the authoritative
/// store, then the tombstone store. Shared with `dsts-sts`'s device-path
/// assertion pipeline, which needs the same lookup to resolve a device's
/// current certificate thumbprint.
pub async fn get_device(store: &Store, cache: &dyn Cache, tenant_id: &str, device_id: &str) -> Result<Device> {
    let key = keys::device_key(tenant_id, device_id);

    match get_json::<Device>(cache, &key).await {
        Ok(Some(device)) => return Ok(device),
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, tenant_id, device_id, "cache read failed, falling back to store");
        }
    }

    match store.get_device(tenant_id, device_id).await {
        Ok(device) => {
            cache_device(cache, &device).await;
            Ok(device)
        }
        Err(DstsError::NotFound) => {
            match store.get_tombstoned_device(tenant_id, device_id).await {
                Ok(_) => Err(DstsError::gone(reasons::TOMBSTONED_DEVICE)),
                Err(DstsError::NotFound) => Err(DstsError::NotFound),
                Err(other) => Err(other),
            }
        }
        Err(other) => Err(other),
    }
}

/// Best-effort write-through into the cache. Never surfaces a failure to
/// the caller — the cache is a capability, not an authority (spec §4.4).
pub async fn cache_device(cache: &dyn Cache, device: &Device) {
    let key = keys::device_key(&device.tenant_id, &device.device_id);
    if let Err(err) = put_json(cache, &key, device, keys::DEVICE_TTL).await {
        tracing::warn!(error = %err, tenant_id = %device.tenant_id, device_id = %device.device_id, "failed to write device to cache");
    }
}

pub async fn evict_device(cache: &dyn Cache, tenant_id: &str, device_id: &str) {
    let key = keys::device_key(tenant_id, device_id);
    if let Err(err) = cache.delete(&key).await {
        tracing::warn!(error = %err, tenant_id, device_id, "failed to evict device from cache");
    }
}
