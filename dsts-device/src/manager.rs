use crate::lookup::{self, cache_device};
use crate::registry::ManagementServiceRegistry;
use chrono::Utc;
use dsts_cache::Cache;
use dsts_crypto::certificate::{verify_certificate, verify_device_identity, ParsedCertificate};
use dsts_error::{DstsError, Result};
use dsts_store::models::{Device, DeviceFilter, DeviceUpdate, NewDevice, Pagination};
use dsts_store::Store;
use std::sync::Arc;

/// Request to enroll a new device, as received at the facade boundary.
pub struct CreateDeviceRequest {
    pub tenant_id: String,
    pub device_id: String,
    pub device_certificate_der: Vec<u8>,
    pub management_service: Option<String>,
    pub hardware_hash: Option<String>,
}

/// Thin orchestration layer over the authoritative store, owning the
/// create-time certificate verification and the cache-aside composite
/// read (spec §4.7). Holds no state of its own beyond its collaborators.
pub struct DeviceManager {
    store: Store,
    cache: Arc<dyn Cache>,
    services: ManagementServiceRegistry,
}

impl DeviceManager {
    pub fn new(store: Store, cache: Arc<dyn Cache>, services: ManagementServiceRegistry) -> Self {
        Self { store, cache, services }
    }

    pub async fn create_device(&self, request: CreateDeviceRequest) -> Result<Device> {
        if request.tenant_id.is_empty() || request.device_id.is_empty() {
            return Err(DstsError::invalid_request("tenant id or device id was not specified"));
        }

        let service_id = self.services.resolve(request.management_service.as_deref())?;

        let cert = ParsedCertificate::parse_der(&request.device_certificate_der)
            .map_err(|e| DstsError::invalid_request(e.to_string()))?;
        verify_certificate(&cert, Utc::now()).map_err(|e| DstsError::invalid_request(e.to_string()))?;
        verify_device_identity(&cert, &request.device_id, &request.tenant_id)
            .map_err(|e| DstsError::invalid_request(e.to_string()))?;

        let new_device = NewDevice {
            device_id: request.device_id,
            tenant_id: request.tenant_id,
            is_enabled: true,
            is_lost: false,
            certificate_thumbprint: cert.thumbprint(),
            certificate_issued_at: cert.not_before,
            certificate_expires_at: cert.not_after,
            service_id: Some(service_id),
            hardware_hash: request.hardware_hash,
        };

        let device = self.store.create_device(new_device).await?;
        cache_device(self.cache.as_ref(), &device).await;
        Ok(device)
    }

    /// Composite read (spec §4.7): cache, then store, then tombstone
    /// store. A tombstone hit surfaces as [`DstsError::Gone`], which the
    /// facades already map to 410 on HTTP and `NotFound` on RPC.
    pub async fn get_device(&self, tenant_id: &str, device_id: &str) -> Result<Device> {
        lookup::get_device(&self.store, self.cache.as_ref(), tenant_id, device_id).await
    }

    pub async fn list_devices(
        &self,
        tenant_id: &str,
        filter: DeviceFilter,
        pagination: Pagination,
    ) -> Result<Vec<Device>> {
        self.store.list_devices_paginated(tenant_id, filter, pagination).await
    }

    pub async fn update_device(&self, tenant_id: &str, device_id: &str, update: DeviceUpdate) -> Result<Device> {
        let updated = self.store.update_device(tenant_id, device_id, update).await?;
        cache_device(self.cache.as_ref(), &updated.device).await;
        Ok(updated.device)
    }

    pub async fn delete_device(&self, tenant_id: &str, device_id: &str) -> Result<()> {
        self.store.delete_device(tenant_id, device_id).await?;
        lookup::evict_device(self.cache.as_ref(), tenant_id, device_id).await;
        Ok(())
    }
}
