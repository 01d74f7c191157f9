//! The assertion validation pipeline (spec §4.5.2), shared shape for both
//! the device and app authentication paths: header decode, signing-key
//! resolution, signature + temporal claim verification, nonce binding,
//! and token minting. First failure halts the pipeline.

use crate::apps;
use crate::challenge;
use crate::signer::TokenSigner;
use crate::tokens;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use dsts_cache::Cache;
use dsts_crypto::certificate::{verify_certificate, ParsedCertificate};
use dsts_error::{reasons, DstsError, Result};
use dsts_store::Store;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AssertionClaims {
    #[allow(dead_code)]
    iss: String,
    sub: String,
    #[allow(dead_code)]
    jti: String,
    nonce: String,
}

pub struct MintedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Device-path authentication: the device certificate travels in the
/// assertion's `x5c` header, so signing-key resolution, identity
/// extraction, and certificate rollover all happen before the signature
/// itself is checked.
pub async fn authenticate_device(
    store: &Store,
    cache: &dyn Cache,
    signer: &TokenSigner,
    assertion: &str,
) -> Result<MintedToken> {
    let header = decode_device_assertion_header(assertion)?;
    if header.alg != Algorithm::RS512 {
        return Err(DstsError::invalid_request(reasons::UNSUPPORTED_SIGNING_ALG));
    }

    let x5c = header
        .x5c
        .filter(|chain| !chain.is_empty())
        .ok_or_else(|| DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE))?;

    let cert_der = BASE64_STANDARD
        .decode(&x5c[0])
        .map_err(|_| DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE))?;

    let cert = ParsedCertificate::parse_der(&cert_der)
        .map_err(|_| DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE))?;
    verify_certificate(&cert, Utc::now()).map_err(|_| DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE))?;

    let device_id = cert.common_name.clone();
    let tenant_id = cert.organization.clone();
    if device_id.is_empty() || tenant_id.is_empty() {
        return Err(DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE));
    }

    let device = dsts_device::lookup::get_device(store, cache, &tenant_id, &device_id)
        .await
        .map_err(|_| DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE))?;

    if !device.is_enabled || device.is_lost {
        return Err(DstsError::unauthorized(reasons::AUTHENTICATION_BLOCKED));
    }

    let presented_thumbprint = cert.thumbprint();
    if presented_thumbprint == device.certificate_thumbprint {
        if device.previous_certificate_thumbprint.is_some() {
            // Rotation observed: the new certificate just authenticated
            // successfully, so the rollover window closes now.
            store.clear_previous_certificate(&tenant_id, &device_id).await?;
        }
    } else {
        match &device.previous_certificate_thumbprint {
            Some(prev) if *prev == presented_thumbprint => {}
            _ => return Err(DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE)),
        }
    }

    let decoding_key = DecodingKey::from_rsa_der(cert.public_key_der());
    let claims = verify_signature_and_claims(assertion, &decoding_key, &device_id)?;
    if claims.sub != device_id {
        return Err(DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE));
    }

    check_nonce(cache, &device_id, &claims.nonce).await?;

    let (access_token, expires_at) = tokens::new_device_access_token(signer, &device)?;
    Ok(MintedToken { access_token, expires_at })
}

/// App-path authentication: the subject is named out-of-band by
/// `app_id`, so signing-key resolution is a direct store/cache lookup.
pub async fn authenticate_app(
    store: &Store,
    cache: &dyn Cache,
    signer: &TokenSigner,
    app_id: &str,
    assertion: &str,
) -> Result<MintedToken> {
    if app_id.is_empty() {
        return Err(DstsError::invalid_request(reasons::APP_ID_NOT_SPECIFIED));
    }

    let header = decode_header(assertion).map_err(|e| DstsError::invalid_request(e.to_string()))?;
    if header.alg != Algorithm::RS512 {
        return Err(DstsError::invalid_request(reasons::UNSUPPORTED_SIGNING_ALG));
    }

    let app = apps::get_registered_app(store, cache, app_id)
        .await
        .map_err(|_| DstsError::unauthorized(reasons::AUTHENTICATION_BLOCKED))?;

    if !app.enabled {
        return Err(DstsError::unauthorized(reasons::AUTHENTICATION_BLOCKED));
    }

    let decoding_key =
        DecodingKey::from_rsa_pem(app.public_key.as_bytes()).map_err(|e| DstsError::internal(e.to_string()))?;
    let claims = verify_signature_and_claims(assertion, &decoding_key, app_id)?;
    if claims.sub != app_id {
        return Err(DstsError::unauthorized(reasons::AUTHENTICATION_BLOCKED));
    }

    check_nonce(cache, app_id, &claims.nonce).await?;

    let (access_token, expires_at) = tokens::new_app_access_token(signer, &app)?;
    Ok(MintedToken { access_token, expires_at })
}

/// Step 1 of the device-path pipeline: decode the header carrying the
/// device's certificate chain (`x5c`). Any decode failure here —
/// including a bare-string `x5c` that fails to deserialize as the
/// expected array — is a bad credential, not a malformed request.
fn decode_device_assertion_header(assertion: &str) -> Result<jsonwebtoken::Header> {
    decode_header(assertion).map_err(|_| DstsError::unauthorized(reasons::INVALID_DEVICE_CERTIFICATE))
}

/// Step 3 of the pipeline: verify the signature with the resolved key and
/// the claim requirements shared by both paths (`iss = sub = subject_id`,
/// `jti` present, `exp`/`nbf` within bounds).
fn verify_signature_and_claims(assertion: &str, key: &DecodingKey, subject_id: &str) -> Result<AssertionClaims> {
    let mut validation = Validation::new(Algorithm::RS512);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
    validation.set_issuer(&[subject_id]);
    validation.validate_nbf = true;

    let data = decode::<AssertionClaims>(assertion, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => DstsError::unauthorized(reasons::ASSERTION_EXPIRED),
        ErrorKind::ImmatureSignature => DstsError::unauthorized(reasons::ASSERTION_NOT_VALID_YET),
        _ => DstsError::unauthorized("failed to verify the presented client assertion"),
    })?;

    Ok(data.claims)
}

/// Step 4: the assertion's `nonce` claim must match the outstanding
/// challenge for the subject. A cache miss means no challenge was ever
/// issued (or it already expired) and is treated the same as a mismatch.
async fn check_nonce(cache: &dyn Cache, subject_id: &str, nonce: &str) -> Result<()> {
    match challenge::get_challenge(cache, subject_id).await? {
        Some(expected) if expected == nonce => Ok(()),
        _ => Err(DstsError::unauthorized(reasons::INVALID_DEVICE_CHALLENGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsts_cache::NullCache;
    use dsts_crypto::{encode_private_key_pem, encode_public_key_pem, generate_signing_keypair};
    use jsonwebtoken::{encode, Header};
    use std::collections::HashMap;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(serde::Serialize)]
    struct TestAssertionClaims<'a> {
        iss: &'a str,
        sub: &'a str,
        jti: String,
        nonce: &'a str,
        exp: i64,
        nbf: i64,
    }

    async fn test_keys() -> (EncodingKey, DecodingKey) {
        let (private_key, public_key) = generate_signing_keypair().await.expect("keygen");
        let encoding_key =
            EncodingKey::from_rsa_pem(encode_private_key_pem(&private_key).expect("private pem").as_bytes())
                .expect("encoding key");
        let decoding_key =
            DecodingKey::from_rsa_pem(encode_public_key_pem(&public_key).expect("public pem").as_bytes())
                .expect("decoding key");
        (encoding_key, decoding_key)
    }

    fn sign(encoding_key: &EncodingKey, subject_id: &str, nonce: &str, nbf_offset: i64, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = TestAssertionClaims {
            iss: subject_id,
            sub: subject_id,
            jti: uuid::Uuid::new_v4().to_string(),
            nonce,
            exp: now + exp_offset,
            nbf: now + nbf_offset,
        };
        encode(&Header::new(Algorithm::RS512), &claims, encoding_key).expect("sign assertion")
    }

    fn token_with_header(header_json: &str) -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header_b64 = URL_SAFE_NO_PAD.encode(header_json.as_bytes());
        format!("{header_b64}.e30.sig")
    }

    #[test]
    fn bare_string_x5c_is_rejected_as_invalid_device_certificate() {
        let token = token_with_header(r#"{"alg":"RS512","x5c":"not-an-array"}"#);

        let err = decode_device_assertion_header(&token).expect_err("should reject");
        assert!(matches!(err, DstsError::Unauthorized(reason) if reason == reasons::INVALID_DEVICE_CERTIFICATE));
    }

    #[tokio::test]
    async fn valid_assertion_yields_its_claims() {
        let (encoding_key, decoding_key) = test_keys().await;
        let token = sign(&encoding_key, "device-1", "nonce-abc", -5, 300);

        let claims = verify_signature_and_claims(&token, &decoding_key, "device-1").expect("should verify");
        assert_eq!(claims.sub, "device-1");
        assert_eq!(claims.nonce, "nonce-abc");
    }

    #[tokio::test]
    async fn expired_assertion_is_rejected() {
        let (encoding_key, decoding_key) = test_keys().await;
        let token = sign(&encoding_key, "device-1", "nonce-abc", -600, -10);

        let err = verify_signature_and_claims(&token, &decoding_key, "device-1").expect_err("should reject");
        assert!(matches!(err, DstsError::Unauthorized(reason) if reason == reasons::ASSERTION_EXPIRED));
    }

    #[tokio::test]
    async fn not_yet_valid_assertion_is_rejected() {
        let (encoding_key, decoding_key) = test_keys().await;
        let token = sign(&encoding_key, "device-1", "nonce-abc", 600, 900);

        let err = verify_signature_and_claims(&token, &decoding_key, "device-1").expect_err("should reject");
        assert!(matches!(err, DstsError::Unauthorized(reason) if reason == reasons::ASSERTION_NOT_VALID_YET));
    }

    #[tokio::test]
    async fn issuer_not_matching_subject_is_rejected() {
        let (encoding_key, decoding_key) = test_keys().await;
        let token = sign(&encoding_key, "someone-else", "nonce-abc", -5, 300);

        let err = verify_signature_and_claims(&token, &decoding_key, "device-1").expect_err("should reject");
        assert!(matches!(err, DstsError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn check_nonce_rejects_when_no_challenge_was_ever_issued() {
        let cache = NullCache;
        let err = check_nonce(&cache, "device-1", "nonce-abc").await.expect_err("no challenge outstanding");
        assert!(matches!(err, DstsError::Unauthorized(reason) if reason == reasons::INVALID_DEVICE_CHALLENGE));
    }

    /// A minimal in-memory `Cache` standing in for a real backend, so
    /// `check_nonce`'s match branch can be exercised without Redis.
    #[derive(Default)]
    struct FakeCache {
        entries: AsyncMutex<HashMap<String, String>>,
    }

    #[async_trait::async_trait]
    impl Cache for FakeCache {
        async fn get_raw(&self, key: &str) -> dsts_cache::Result<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn put_raw(&self, key: &str, value: String, _ttl: std::time::Duration) -> dsts_cache::Result<()> {
            self.entries.lock().await.insert(key.to_string(), value);
            Ok(())
        }

        async fn delete(&self, key: &str) -> dsts_cache::Result<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn check_nonce_accepts_a_matching_outstanding_challenge() {
        let cache = FakeCache::default();
        challenge::issue_challenge(&cache, "device-1").await.expect("issue challenge");
        let issued = challenge::get_challenge(&cache, "device-1")
            .await
            .expect("read back")
            .expect("challenge present");

        check_nonce(&cache, "device-1", &issued).await.expect("nonce matches");
    }

    #[tokio::test]
    async fn check_nonce_rejects_a_stale_nonce() {
        let cache = FakeCache::default();
        challenge::issue_challenge(&cache, "device-1").await.expect("issue challenge");

        let err = check_nonce(&cache, "device-1", "not-the-real-nonce")
            .await
            .expect_err("should reject");
        assert!(matches!(err, DstsError::Unauthorized(reason) if reason == reasons::INVALID_DEVICE_CHALLENGE));
    }
}
