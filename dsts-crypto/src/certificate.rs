use crate::error::{CryptoError, Result};
use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{GeneralName, KeyUsage, ParsedExtension};
use x509_parser::prelude::FromDer;

/// Subject OID `2.5.4.10` — Organization. The device-enrollment protocol
/// overloads this attribute to carry the tenant id.
const OID_ORGANIZATION: &str = "2.5.4.10";

/// A parsed device/app certificate, reduced to the fields the protocol
/// actually inspects. Owns its DER bytes so the thumbprint and parsed
/// view stay attached to each other.
pub struct ParsedCertificate {
    der: Vec<u8>,
    pub common_name: String,
    pub organization: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    signature_is_sha256_with_rsa: bool,
    public_key_is_rsa: bool,
    public_key_der: Vec<u8>,
    key_usage: Option<KeyUsage>,
    ext_key_usages: Vec<String>,
}

impl ParsedCertificate {
    /// Parse a raw DER-encoded X.509 certificate.
    pub fn parse_der(der: &[u8]) -> Result<Self> {
        let (_rest, cert) = X509Certificate::from_der(der)
            .map_err(|e| CryptoError::MalformedDer(e.to_string()))?;
        Self::from_x509(der.to_vec(), &cert)
    }

    fn from_x509(der: Vec<u8>, cert: &X509Certificate) -> Result<Self> {
        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .unwrap_or_default()
            .to_string();

        let organization = cert
            .subject()
            .iter()
            .flat_map(|rdn| rdn.iter())
            .find(|attr| attr.attr_type().to_id_string() == OID_ORGANIZATION)
            .and_then(|attr| attr.as_str().ok())
            .unwrap_or_default()
            .to_string();

        let not_before_time = cert.validity().not_before.to_datetime();
        let not_after_time = cert.validity().not_after.to_datetime();
        let not_before = DateTime::<Utc>::from_timestamp(not_before_time.unix_timestamp(), 0)
            .ok_or_else(|| CryptoError::MalformedDer("not_before out of range".to_string()))?;
        let not_after = DateTime::<Utc>::from_timestamp(not_after_time.unix_timestamp(), 0)
            .ok_or_else(|| CryptoError::MalformedDer("not_after out of range".to_string()))?;

        let signature_is_sha256_with_rsa = matches!(
            cert.signature_algorithm.algorithm.to_id_string().as_str(),
            "1.2.840.113549.1.1.11"
        );
        let public_key_is_rsa = matches!(
            cert.public_key().algorithm.algorithm.to_id_string().as_str(),
            "1.2.840.113549.1.1.1"
        );
        // For RSA, the SubjectPublicKeyInfo's inner BIT STRING is exactly
        // the PKCS#1 RSAPublicKey DER encoding.
        let public_key_der = cert.public_key().subject_public_key.data.to_vec();

        let mut key_usage = None;
        let mut ext_key_usages = Vec::new();
        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::KeyUsage(ku) => key_usage = Some(*ku),
                ParsedExtension::ExtendedKeyUsage(eku) => {
                    if eku.client_auth {
                        ext_key_usages.push("ClientAuth".to_string());
                    }
                    if eku.server_auth {
                        ext_key_usages.push("ServerAuth".to_string());
                    }
                    for other in &eku.other {
                        ext_key_usages.push(other.to_id_string());
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            der,
            common_name,
            organization,
            not_before,
            not_after,
            signature_is_sha256_with_rsa,
            public_key_is_rsa,
            public_key_der,
            key_usage,
            ext_key_usages,
        })
    }

    /// SHA-256 hex digest over the raw certificate DER, used as the
    /// device's stored/rotated cert thumbprint.
    pub fn thumbprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The certificate's RSA public key, used to verify the signature on
    /// an assertion presented alongside this certificate.
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::from_pkcs1_der(&self.public_key_der)
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    /// Raw PKCS#1 DER bytes of the certificate's public key, suitable for
    /// `jsonwebtoken::DecodingKey::from_rsa_der`.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }
}

/// `VerifyCertificate` (spec §4.1): validity window, signature algorithm,
/// public key algorithm, and key usage. Does **not** check device/tenant
/// binding — that is [`verify_device_identity`], a separate predicate.
pub fn verify_certificate(cert: &ParsedCertificate, now: DateTime<Utc>) -> Result<()> {
    if now < cert.not_before {
        return Err(CryptoError::NotYetValid);
    }
    if now > cert.not_after {
        return Err(CryptoError::Expired);
    }
    if !cert.signature_is_sha256_with_rsa {
        return Err(CryptoError::WrongSignatureAlgorithm);
    }
    if !cert.public_key_is_rsa {
        return Err(CryptoError::WrongPublicKeyAlgorithm);
    }

    // KeyUsage must be exactly DigitalSignature — a strict equality check,
    // not a bitwise subset test, mirroring the source's comparison.
    match cert.key_usage {
        Some(ku) if ku.flags == KeyUsage::DIGITAL_SIGNATURE => {}
        _ => return Err(CryptoError::WrongKeyUsage),
    }

    // Every ExtKeyUsage entry (if any) must be drawn from {ClientAuth, ServerAuth}.
    if cert
        .ext_key_usages
        .iter()
        .any(|u| u != "ClientAuth" && u != "ServerAuth")
    {
        return Err(CryptoError::WrongExtendedKeyUsage);
    }

    Ok(())
}

/// Device-identity binding: Subject CN equals the asserted device id and
/// Subject OID 2.5.4.10 equals the asserted tenant id. Kept separate from
/// `verify_certificate` per spec §4.1.
pub fn verify_device_identity(cert: &ParsedCertificate, device_id: &str, tenant_id: &str) -> Result<()> {
    if cert.common_name.is_empty() {
        return Err(CryptoError::EmptyCommonName);
    }
    if cert.organization.is_empty() {
        return Err(CryptoError::EmptyOrganization);
    }
    if cert.common_name != device_id || cert.organization != tenant_id {
        return Err(CryptoError::MalformedDer(
            "certificate identity does not bind to the asserted device/tenant".to_string(),
        ));
    }
    Ok(())
}

/// Extracts an RFC822 (email) SAN, unused by the protocol today but kept
/// as a small helper alongside the other subject-extraction routines.
pub fn subject_alt_email(cert: &X509Certificate) -> Option<String> {
    let san = cert.subject_alternative_name().ok().flatten()?;
    san.value.general_names.iter().find_map(|name| match name {
        GeneralName::RFC822Name(email) => Some((*email).to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Certificate generation/parsing round-trips are exercised in
    // dsts-device's integration tests, where a full self-signed
    // certificate is built with the same shape the store expects.

    #[test]
    fn device_identity_mismatch_is_rejected() {
        let cert = ParsedCertificate {
            der: vec![],
            common_name: "device-1".to_string(),
            organization: "tenant-a".to_string(),
            not_before: Utc::now(),
            not_after: Utc::now(),
            signature_is_sha256_with_rsa: true,
            public_key_is_rsa: true,
            public_key_der: vec![],
            key_usage: None,
            ext_key_usages: vec![],
        };
        assert!(verify_device_identity(&cert, "device-1", "tenant-b").is_err());
        assert!(verify_device_identity(&cert, "device-1", "tenant-a").is_ok());
    }
}
