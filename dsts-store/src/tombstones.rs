use crate::error_map::map_sqlx_error;
use crate::models::TombstonedDevice;
use crate::pool::with_deadline;
use crate::Store;
use dsts_error::{DstsError, Result};

impl Store {
    pub async fn get_tombstoned_device(
        &self,
        tenant_id: &str,
        device_id: &str,
    ) -> Result<TombstonedDevice> {
        with_deadline(async {
            sqlx::query_as::<_, TombstonedDevice>(
                "SELECT * FROM tombstoned_devices WHERE tenant_id = $1 AND device_id = $2",
            )
            .bind(tenant_id)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(DstsError::NotFound)
        })
        .await
    }
}
