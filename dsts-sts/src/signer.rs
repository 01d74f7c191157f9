use dsts_crypto::{
    decode_private_key_pem, encode_private_key_pem, generate_signing_keypair, jwk_modulus_and_exponent,
    key_id as compute_key_id,
};
use dsts_error::{DstsError, Result};
use dsts_store::Store;
use jsonwebtoken::EncodingKey;
use rsa::RsaPublicKey;
use serde::Serialize;

/// A single entry of the exported JSON Web Key Set (spec §4.2).
#[derive(Debug, Clone, Serialize)]
pub struct JsonWebKey {
    pub kty: &'static str,
    pub alg: &'static str,
    #[serde(rename = "use")]
    pub use_: &'static str,
    pub kid: String,
    pub n: String,
    pub e: String,
}

/// The Key Store & Token Signer (spec §4.2). Holds the single process-wide
/// RSA-4096 primary signing key and its pre-computed JWK export.
pub struct TokenSigner {
    key_id: String,
    encoding_key: EncodingKey,
    jwks: Vec<JsonWebKey>,
}

impl TokenSigner {
    /// Look up the primary signing key in the authoritative store. If one
    /// exists, adopt it; otherwise generate a fresh RSA-4096 keypair,
    /// persist it as the primary key, and adopt that instead.
    pub async fn initialize(store: &Store) -> Result<Self> {
        let (key_id, private_key_pem, public_key) = match store.get_primary_signing_key().await {
            Ok(record) => {
                let private_key = decode_private_key_pem(&record.private_key)
                    .map_err(DstsError::internal)?;
                let public_key = RsaPublicKey::from(&private_key);
                (record.key_id, record.private_key, public_key)
            }
            Err(DstsError::NotFound) => {
                let (private_key, public_key) = generate_signing_keypair()
                    .await
                    .map_err(DstsError::internal)?;
                let key_id = compute_key_id(&public_key).map_err(DstsError::internal)?;
                let pem = encode_private_key_pem(&private_key).map_err(DstsError::internal)?;
                store.add_signing_key(&key_id, &pem, true).await?;
                (key_id, pem, public_key)
            }
            Err(other) => return Err(other),
        };

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| DstsError::internal(e.to_string()))?;

        let (n, e) = jwk_modulus_and_exponent(&public_key);
        let jwks = vec![JsonWebKey {
            kty: "RSA",
            alg: "RS512",
            use_: "sig",
            kid: key_id.clone(),
            n,
            e,
        }];

        Ok(Self {
            key_id,
            encoding_key,
            jwks,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// The pre-computed JWK export. Never empty once initialized.
    pub fn jwks(&self) -> &[JsonWebKey] {
        &self.jwks
    }

    /// A signer over a freshly generated keypair, bypassing the store.
    /// Exists only so the token-minting tests don't need a live
    /// Postgres connection to exercise the claim shape.
    #[cfg(test)]
    pub(crate) async fn for_test() -> Self {
        let (private_key, public_key) = generate_signing_keypair().await.expect("keypair generation");
        let key_id = compute_key_id(&public_key).expect("key id");
        let pem = encode_private_key_pem(&private_key).expect("pem encoding");
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("encoding key");
        let (n, e) = jwk_modulus_and_exponent(&public_key);
        let jwks = vec![JsonWebKey {
            kty: "RSA",
            alg: "RS512",
            use_: "sig",
            kid: key_id.clone(),
            n,
            e,
        }];
        Self {
            key_id,
            encoding_key,
            jwks,
        }
    }
}
