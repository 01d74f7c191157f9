use crate::signer::TokenSigner;
use chrono::{DateTime, Duration, Utc};
use dsts_error::{DstsError, Result};
use dsts_store::models::{Device, RegisteredApp};
use jsonwebtoken::{encode, Algorithm, Header};
use serde::Serialize;

pub const ISSUER: &str = "HP Device Token Service";
pub const TOKEN_TYPE_DEVICE: &str = "device";
pub const TOKEN_TYPE_APP: &str = "app";

/// Devices that aren't under any device management service are stamped
/// with this sentinel `service_id`; tokens for those devices omit the
/// `ms` claim entirely rather than carrying it.
pub const MANAGEMENT_SERVICE_NONE: &str = "none";

fn device_access_token_lifetime() -> Duration {
    Duration::hours(1)
}

fn app_access_token_lifetime() -> Duration {
    Duration::hours(3)
}

#[derive(Debug, Serialize)]
pub struct DeviceTokenClaims {
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    pub sub: String,
    pub typ: &'static str,
    pub tid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ms: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AppTokenClaims {
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    pub sub: String,
    pub typ: &'static str,
}

fn rs512_header(key_id: &str) -> Header {
    let mut header = Header::new(Algorithm::RS512);
    header.kid = Some(key_id.to_string());
    header
}

/// Mint a new device access token (spec §4.2): 1-hour lifetime, `tid`
/// always present, `ms` present only when the device is under active
/// management.
pub fn new_device_access_token(signer: &TokenSigner, device: &Device) -> Result<(String, DateTime<Utc>)> {
    let issued_at = Utc::now();
    let expires_at = issued_at + device_access_token_lifetime();

    let claims = DeviceTokenClaims {
        iss: ISSUER.to_string(),
        iat: issued_at.timestamp(),
        nbf: issued_at.timestamp(),
        exp: expires_at.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        sub: device.device_id.clone(),
        typ: TOKEN_TYPE_DEVICE,
        tid: device.tenant_id.clone(),
        ms: if device.service_id == MANAGEMENT_SERVICE_NONE {
            None
        } else {
            Some(device.service_id.clone())
        },
    };

    let token = encode(&rs512_header(signer.key_id()), &claims, signer.encoding_key())
        .map_err(|e| DstsError::internal(e.to_string()))?;
    Ok((token, expires_at))
}

#[cfg(test)]
fn decode_payload(token: &str) -> serde_json::Value {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let payload_segment = token.split('.').nth(1).expect("jwt has three segments");
    let raw = URL_SAFE_NO_PAD.decode(payload_segment).expect("base64url payload");
    serde_json::from_slice(&raw).expect("json payload")
}

/// Mint a new app access token (spec §4.2): 3-hour lifetime, no extra
/// claims beyond the registered claims shared with device tokens.
pub fn new_app_access_token(signer: &TokenSigner, app: &RegisteredApp) -> Result<(String, DateTime<Utc>)> {
    let issued_at = Utc::now();
    let expires_at = issued_at + app_access_token_lifetime();

    let claims = AppTokenClaims {
        iss: ISSUER.to_string(),
        iat: issued_at.timestamp(),
        nbf: issued_at.timestamp(),
        exp: expires_at.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        sub: app.app_id.clone(),
        typ: TOKEN_TYPE_APP,
    };

    let token = encode(&rs512_header(signer.key_id()), &claims, signer.encoding_key())
        .map_err(|e| DstsError::internal(e.to_string()))?;
    Ok((token, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device(service_id: &str) -> Device {
        let now = Utc::now();
        Device {
            device_id: "device-1".to_string(),
            tenant_id: "tenant-a".to_string(),
            is_enabled: true,
            is_lost: false,
            certificate_thumbprint: "thumb".to_string(),
            previous_certificate_thumbprint: None,
            certificate_issued_at: now,
            certificate_expires_at: now + Duration::days(365),
            created_at: now,
            updated_at: now,
            service_id: service_id.to_string(),
            hardware_hash: None,
        }
    }

    fn sample_app() -> RegisteredApp {
        let now = Utc::now();
        RegisteredApp {
            app_id: "app-1".to_string(),
            name: "Sample App".to_string(),
            enabled: true,
            public_key: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn device_token_carries_ms_claim_when_managed() {
        let signer = TokenSigner::for_test().await;
        let device = sample_device("fleet-east");
        let (token, expires_at) = new_device_access_token(&signer, &device).expect("mint token");

        let claims = decode_payload(&token);
        assert_eq!(claims["iss"], ISSUER);
        assert_eq!(claims["sub"], "device-1");
        assert_eq!(claims["tid"], "tenant-a");
        assert_eq!(claims["typ"], TOKEN_TYPE_DEVICE);
        assert_eq!(claims["ms"], "fleet-east");
        assert_eq!(claims["exp"].as_i64().unwrap(), expires_at.timestamp());
    }

    #[tokio::test]
    async fn device_token_omits_ms_claim_when_unmanaged() {
        let signer = TokenSigner::for_test().await;
        let device = sample_device(MANAGEMENT_SERVICE_NONE);
        let (token, _) = new_device_access_token(&signer, &device).expect("mint token");

        let claims = decode_payload(&token);
        assert!(claims.get("ms").is_none());
    }

    #[tokio::test]
    async fn device_token_expires_one_hour_after_issue() {
        let signer = TokenSigner::for_test().await;
        let device = sample_device(MANAGEMENT_SERVICE_NONE);
        let (token, expires_at) = new_device_access_token(&signer, &device).expect("mint token");

        let claims = decode_payload(&token);
        let iat = claims["iat"].as_i64().unwrap();
        assert_eq!(expires_at.timestamp() - iat, 3600);
    }

    #[tokio::test]
    async fn app_token_has_no_tid_or_ms_claims() {
        let signer = TokenSigner::for_test().await;
        let app = sample_app();
        let (token, expires_at) = new_app_access_token(&signer, &app).expect("mint token");

        let claims = decode_payload(&token);
        assert_eq!(claims["sub"], "app-1");
        assert_eq!(claims["typ"], TOKEN_TYPE_APP);
        assert!(claims.get("tid").is_none());
        assert!(claims.get("ms").is_none());
        let iat = claims["iat"].as_i64().unwrap();
        assert_eq!(expires_at.timestamp() - iat, 3 * 3600);
    }
}
