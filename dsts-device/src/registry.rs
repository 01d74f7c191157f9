use dsts_error::{DstsError, Result};
use dsts_store::models::ManagementService;
use std::collections::HashMap;

/// In-memory lookaside for device management services, loaded once at
/// startup from the store (spec §5: "load management services"). Lookups
/// are case-insensitive, matching the source's `strings.ToLower` keying.
pub struct ManagementServiceRegistry {
    by_id: HashMap<String, ManagementService>,
    default_service_id: Option<String>,
}

impl ManagementServiceRegistry {
    pub fn load(services: Vec<ManagementService>) -> Self {
        let mut by_id = HashMap::with_capacity(services.len());
        let mut default_service_id = None;
        for service in services {
            if default_service_id.is_none() && service.is_default {
                default_service_id = Some(service.service_id.clone());
            }
            by_id.insert(service.service_id.to_lowercase(), service);
        }
        Self { by_id, default_service_id }
    }

    /// Resolve a caller-specified management service id: an empty/absent
    /// id substitutes the configured default, an unknown id is rejected.
    pub fn resolve(&self, requested: Option<&str>) -> Result<String> {
        let requested = requested.filter(|id| !id.is_empty());
        let lookup_id = match requested {
            Some(id) => id.to_string(),
            None => self
                .default_service_id
                .clone()
                .ok_or_else(|| DstsError::invalid_request("no default management service is configured"))?,
        };

        self.by_id
            .get(&lookup_id.to_lowercase())
            .map(|service| service.service_id.clone())
            .ok_or_else(|| DstsError::invalid_request("specified management service was not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, is_default: bool) -> ManagementService {
        ManagementService { service_id: id.to_string(), name: id.to_string(), is_default }
    }

    #[test]
    fn empty_request_resolves_to_default() {
        let registry = ManagementServiceRegistry::load(vec![service("svc-a", false), service("svc-b", true)]);
        assert_eq!(registry.resolve(None).unwrap(), "svc-b");
        assert_eq!(registry.resolve(Some("")).unwrap(), "svc-b");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = ManagementServiceRegistry::load(vec![service("Svc-A", false)]);
        assert_eq!(registry.resolve(Some("svc-a")).unwrap(), "Svc-A");
    }

    #[test]
    fn unknown_service_is_rejected() {
        let registry = ManagementServiceRegistry::load(vec![service("svc-a", true)]);
        assert!(registry.resolve(Some("nonexistent")).is_err());
    }
}
