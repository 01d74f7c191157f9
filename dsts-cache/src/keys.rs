use std::time::Duration;

pub fn device_key(tenant_id: &str, device_id: &str) -> String {
    format!("device:{tenant_id}:{device_id}")
}

pub fn app_key(app_id: &str) -> String {
    format!("app:{app_id}")
}

pub fn enrollment_token_by_tenant_key(tenant_id: &str) -> String {
    format!("enroll_token:tenant:{tenant_id}")
}

pub fn enrollment_token_by_value_key(token: &str) -> String {
    format!("enroll_token:value:{token}")
}

pub fn challenge_key(subject_id: &str) -> String {
    format!("challenge:{subject_id}")
}

pub const DEVICE_TTL: Duration = Duration::from_secs(2 * 3600);
pub const APP_TTL: Duration = Duration::from_secs(6 * 3600);
pub const CHALLENGE_TTL: Duration = Duration::from_secs(60);
pub const ENROLLMENT_TOKEN_TTL: Duration = Duration::from_secs(2 * 3600);
