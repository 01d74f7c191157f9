//! Crypto primitives for the Device Security Token Service: RSA-4096
//! keypair generation, PEM/PKCS1 encoding, X.509 parsing and certificate
//! verification, and cryptographically strong random strings.

pub mod certificate;
pub mod error;
pub mod keypair;
pub mod random;

pub use certificate::{verify_certificate, verify_device_identity, ParsedCertificate};
pub use error::{CryptoError, Result};
pub use keypair::{
    decode_private_key_pem, decode_public_key_pem, encode_private_key_pem, encode_public_key_pem,
    generate_signing_keypair, jwk_modulus_and_exponent, key_id,
};
pub use random::{random_letters, CHALLENGE_LENGTH, ENROLLMENT_TOKEN_LENGTH};
