use crate::error::{CryptoError, Result};
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Bit size used for every signing keypair this service generates. The
/// store never persists anything smaller.
pub const SIGNING_KEY_BITS: usize = 4096;

/// Generate a fresh RSA-4096 keypair on a blocking thread. Keygen is the
/// only CPU-bound cryptographic operation on the request path, and only at
/// startup (§5) — routing it through `spawn_blocking` keeps the async
/// runtime's worker threads free.
pub async fn generate_signing_keypair() -> Result<(RsaPrivateKey, RsaPublicKey)> {
    tokio::task::spawn_blocking(|| {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, SIGNING_KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok((private_key, public_key))
    })
    .await
    .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?
}

/// Key id used throughout the service (JOSE `kid`, store primary key): the
/// hex-encoded SHA-256 digest of the public key's PKCS#1 DER encoding.
pub fn key_id(public_key: &RsaPublicKey) -> Result<String> {
    let der = public_key
        .to_pkcs1_der()
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    let digest = Sha256::digest(der.as_bytes());
    Ok(hex::encode(digest))
}

/// PKCS#8 private key PEM, per spec §4.1/§4.2 (the public key stays
/// PKCS#1, matching `key_id`'s `PKCS1-DER(public_key)` hashing).
pub fn encode_private_key_pem(private_key: &RsaPrivateKey) -> Result<String> {
    private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

pub fn decode_private_key_pem(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::Encoding(e.to_string()))
}

pub fn encode_public_key_pem(public_key: &RsaPublicKey) -> Result<String> {
    public_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

pub fn decode_public_key_pem(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Base64url (no padding) big-endian encoding of an RSA public key's
/// modulus and exponent, as required by the JWK `n`/`e` members.
pub fn jwk_modulus_and_exponent(public_key: &RsaPublicKey) -> (String, String) {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use rsa::traits::PublicKeyParts;

    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    (n, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_keypair_round_trips_through_pem() {
        let (private_key, public_key) = generate_signing_keypair().await.expect("keygen");
        let pem = encode_private_key_pem(&private_key).expect("encode");
        let decoded = decode_private_key_pem(&pem).expect("decode");
        assert_eq!(decoded.to_public_key(), public_key);
    }

    #[tokio::test]
    async fn key_id_is_stable_hex_sha256() {
        let (_private_key, public_key) = generate_signing_keypair().await.expect("keygen");
        let id = key_id(&public_key).expect("key id");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
