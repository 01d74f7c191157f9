use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub device_id: String,
    pub tenant_id: String,
    pub is_enabled: bool,
    pub is_lost: bool,
    pub certificate_thumbprint: String,
    pub previous_certificate_thumbprint: Option<String>,
    pub certificate_issued_at: DateTime<Utc>,
    pub certificate_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub service_id: String,
    pub hardware_hash: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TombstonedDevice {
    pub device_id: String,
    pub tenant_id: String,
    pub tombstoned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnrollmentToken {
    pub tenant_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegisteredApp {
    pub app_id: String,
    pub name: String,
    pub enabled: bool,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SigningKey {
    pub key_id: String,
    pub private_key: String,
    pub enabled: bool,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ManagementService {
    pub service_id: String,
    pub name: String,
    pub is_default: bool,
}

/// A request to create a new device. Timestamps and the resolved service
/// id are filled in by the store on insert.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub device_id: String,
    pub tenant_id: String,
    pub is_enabled: bool,
    pub is_lost: bool,
    pub certificate_thumbprint: String,
    pub certificate_issued_at: DateTime<Utc>,
    pub certificate_expires_at: DateTime<Utc>,
    pub service_id: Option<String>,
    pub hardware_hash: Option<String>,
}

/// Partial update to an existing device. `None` fields are left
/// untouched; at least one field must be `Some` for the update to be
/// accepted.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub is_enabled: Option<bool>,
    pub is_lost: Option<bool>,
    pub certificate: Option<CertificateUpdate>,
}

#[derive(Debug, Clone)]
pub struct CertificateUpdate {
    pub thumbprint: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DeviceUpdate {
    pub fn is_empty(&self) -> bool {
        self.is_enabled.is_none() && self.is_lost.is_none() && self.certificate.is_none()
    }
}

/// Result of an [`DeviceUpdate`] that touched the certificate: the
/// thumbprint that was in place immediately before the swap, captured
/// atomically within the same transaction that performed the update.
#[derive(Debug, Clone)]
pub struct UpdatedDevice {
    pub device: Device,
    pub prior_certificate_thumbprint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub limit: i64,
    pub page: i64,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

impl Pagination {
    pub fn limit(&self) -> i64 {
        match self.limit {
            l if l > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            l if l <= 0 => DEFAULT_PAGE_SIZE,
            l => l,
        }
    }

    pub fn page(&self) -> i64 {
        if self.page <= 0 {
            1
        } else {
            self.page
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DeviceFilter {
    None,
    Enabled(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_page_size_when_unspecified() {
        let p = Pagination { limit: 0, page: 0 };
        assert_eq!(p.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(p.page(), 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_clamps_oversized_page_size() {
        let p = Pagination { limit: 10_000, page: 1 };
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn pagination_computes_offset_from_page() {
        let p = Pagination { limit: 20, page: 3 };
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn empty_device_update_is_detected() {
        assert!(DeviceUpdate::default().is_empty());
        let update = DeviceUpdate {
            is_enabled: Some(true),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
