use thiserror::Error;

/// Errors raised by crypto primitives. Callers translate these into the
/// appropriate [`dsts_error::DstsError`] kind for their context — a
/// malformed certificate means `InvalidRequest` during device creation but
/// `Unauthorized` during authentication.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to decode certificate DER: {0}")]
    MalformedDer(String),

    #[error("certificate is not yet valid")]
    NotYetValid,

    #[error("certificate has expired")]
    Expired,

    #[error("certificate signature algorithm is not SHA256-with-RSA")]
    WrongSignatureAlgorithm,

    #[error("certificate public key algorithm is not RSA")]
    WrongPublicKeyAlgorithm,

    #[error("certificate key usage is not exactly DigitalSignature")]
    WrongKeyUsage,

    #[error("certificate extended key usage is not a subset of {{ClientAuth, ServerAuth}}")]
    WrongExtendedKeyUsage,

    #[error("certificate subject common name is empty")]
    EmptyCommonName,

    #[error("certificate subject organization (OID 2.5.4.10) is empty")]
    EmptyOrganization,

    #[error("RSA key generation failed: {0}")]
    KeyGeneration(String),

    #[error("PEM/PKCS encoding failure: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
