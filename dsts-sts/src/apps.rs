use dsts_cache::{get_json, keys, put_json, Cache};
use dsts_error::Result;
use dsts_store::models::RegisteredApp;
use dsts_store::Store;

/// Cache-aside read for a registered app: cache, then the authoritative
/// store. Apps have no tombstone concept — deletion is immediate.
pub async fn get_registered_app(store: &Store, cache: &dyn Cache, app_id: &str) -> Result<RegisteredApp> {
    let key = keys::app_key(app_id);

    match get_json::<RegisteredApp>(cache, &key).await {
        Ok(Some(app)) => return Ok(app),
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, app_id, "cache read failed, falling back to store");
        }
    }

    let app = store.get_registered_app(app_id).await?;
    if let Err(err) = put_json(cache, &key, &app, keys::APP_TTL).await {
        tracing::warn!(error = %err, app_id, "failed to write registered app to cache");
    }
    Ok(app)
}
