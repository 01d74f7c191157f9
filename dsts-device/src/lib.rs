//! The Device Lifecycle Manager (spec §4.7): create/get/list/update/delete
//! orchestration over the authoritative store, plus the cache-aside
//! composite read shared with `dsts-sts`'s device-path assertion pipeline.

pub mod lookup;
pub mod manager;
pub mod registry;

pub use manager::{CreateDeviceRequest, DeviceManager};
pub use registry::ManagementServiceRegistry;
