use crate::error_map::map_sqlx_error;
use crate::models::{
    Device, DeviceFilter, DeviceUpdate, NewDevice, Pagination, UpdatedDevice,
};
use crate::pool::with_deadline;
use crate::Store;
use dsts_error::{DstsError, Result};

impl Store {
    /// Create a device within a tenant. Resolves an unspecified
    /// `service_id` to the configured default management service, then
    /// inserts the row. A device/tenant pair that already exists maps to
    /// `DuplicateEntry` (unique violation on the primary key).
    pub async fn create_device(&self, new_device: NewDevice) -> Result<Device> {
        let service_id = match new_device.service_id {
            Some(id) if !id.is_empty() => id,
            _ => self.default_management_service_id().await?,
        };

        with_deadline(async {
            sqlx::query_as::<_, Device>(
                r#"
                INSERT INTO devices (
                    device_id, tenant_id, is_enabled, is_lost,
                    certificate_thumbprint, certificate_issued_at, certificate_expires_at,
                    service_id, hardware_hash
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(&new_device.device_id)
            .bind(&new_device.tenant_id)
            .bind(new_device.is_enabled)
            .bind(new_device.is_lost)
            .bind(&new_device.certificate_thumbprint)
            .bind(new_device.certificate_issued_at)
            .bind(new_device.certificate_expires_at)
            .bind(&service_id)
            .bind(&new_device.hardware_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
        })
        .await
    }

    async fn default_management_service_id(&self) -> Result<String> {
        let services = self.list_management_services().await?;
        services
            .into_iter()
            .find(|s| s.is_default)
            .map(|s| s.service_id)
            .ok_or_else(|| DstsError::invalid_request("no management service was specified"))
    }

    pub async fn get_device(&self, tenant_id: &str, device_id: &str) -> Result<Device> {
        with_deadline(async {
            sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE tenant_id = $1 AND device_id = $2")
                .bind(tenant_id)
                .bind(device_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(DstsError::NotFound)
        })
        .await
    }

    pub async fn list_devices_paginated(
        &self,
        tenant_id: &str,
        filter: DeviceFilter,
        pagination: Pagination,
    ) -> Result<Vec<Device>> {
        let limit = pagination.limit();
        let offset = pagination.offset();

        with_deadline(async {
            let rows = match filter {
                DeviceFilter::None => {
                    sqlx::query_as::<_, Device>(
                        "SELECT * FROM devices WHERE tenant_id = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
                    )
                    .bind(tenant_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
                }
                DeviceFilter::Enabled(state) => {
                    sqlx::query_as::<_, Device>(
                        "SELECT * FROM devices WHERE tenant_id = $1 AND is_enabled = $2 ORDER BY created_at ASC LIMIT $3 OFFSET $4",
                    )
                    .bind(tenant_id)
                    .bind(state)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
                }
            };
            rows.map_err(map_sqlx_error)
        })
        .await
    }

    /// Apply a partial update to a device inside a single transaction,
    /// capturing the certificate thumbprint that was in place immediately
    /// before any rollover so the caller can finish the rollover protocol
    /// (deleting the previous certificate once the new one has been seen
    /// in use). Capturing the prior value in the same transaction as the
    /// swap closes the race a read-then-write sequence would leave open.
    pub async fn update_device(
        &self,
        tenant_id: &str,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<UpdatedDevice> {
        if update.is_empty() {
            return Err(DstsError::invalid_request("no fields to update were specified"));
        }

        with_deadline(async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            let before = sqlx::query_as::<_, Device>(
                "SELECT * FROM devices WHERE tenant_id = $1 AND device_id = $2 FOR UPDATE",
            )
            .bind(tenant_id)
            .bind(device_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(DstsError::NotFound)?;

            if let Some(is_enabled) = update.is_enabled {
                sqlx::query("UPDATE devices SET updated_at = now(), is_enabled = $3 WHERE tenant_id = $1 AND device_id = $2")
                    .bind(tenant_id)
                    .bind(device_id)
                    .bind(is_enabled)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }

            if let Some(is_lost) = update.is_lost {
                sqlx::query("UPDATE devices SET updated_at = now(), is_lost = $3 WHERE tenant_id = $1 AND device_id = $2")
                    .bind(tenant_id)
                    .bind(device_id)
                    .bind(is_lost)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }

            if let Some(cert) = &update.certificate {
                sqlx::query(
                    r#"
                    UPDATE devices SET
                        updated_at = now(),
                        previous_certificate_thumbprint = certificate_thumbprint,
                        certificate_thumbprint = $3,
                        certificate_issued_at = $4,
                        certificate_expires_at = $5
                    WHERE tenant_id = $1 AND device_id = $2
                    "#,
                )
                .bind(tenant_id)
                .bind(device_id)
                .bind(&cert.thumbprint)
                .bind(cert.issued_at)
                .bind(cert.expires_at)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            }

            let after = sqlx::query_as::<_, Device>(
                "SELECT * FROM devices WHERE tenant_id = $1 AND device_id = $2",
            )
            .bind(tenant_id)
            .bind(device_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            tx.commit().await.map_err(map_sqlx_error)?;

            Ok(UpdatedDevice {
                prior_certificate_thumbprint: if update.certificate.is_some() {
                    Some(before.certificate_thumbprint)
                } else {
                    None
                },
                device: after,
            })
        })
        .await
    }

    /// Clear the previous certificate thumbprint once a rollover is
    /// confirmed complete (the new certificate has been seen presented by
    /// the device at least once).
    pub async fn clear_previous_certificate(&self, tenant_id: &str, device_id: &str) -> Result<()> {
        with_deadline(async {
            sqlx::query(
                "UPDATE devices SET updated_at = now(), previous_certificate_thumbprint = NULL WHERE tenant_id = $1 AND device_id = $2",
            )
            .bind(tenant_id)
            .bind(device_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
            Ok(())
        })
        .await
    }

    /// Delete a device, tombstoning it so future lookups can distinguish
    /// "never existed" from "was deleted".
    pub async fn delete_device(&self, tenant_id: &str, device_id: &str) -> Result<()> {
        with_deadline(async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            let result = sqlx::query("DELETE FROM devices WHERE tenant_id = $1 AND device_id = $2")
                .bind(tenant_id)
                .bind(device_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            if result.rows_affected() == 0 {
                return Err(DstsError::NotFound);
            }

            sqlx::query(
                "INSERT INTO tombstoned_devices (tenant_id, device_id) VALUES ($1, $2) ON CONFLICT (tenant_id, device_id) DO UPDATE SET tombstoned_at = now()",
            )
            .bind(tenant_id)
            .bind(device_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            tx.commit().await.map_err(map_sqlx_error)?;
            Ok(())
        })
        .await
    }
}
