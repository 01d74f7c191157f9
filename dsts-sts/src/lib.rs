//! The Challenge–Assertion Engine and Key Store & Token Signer (spec
//! §4.2, §4.5, §4.6): the protocol core shared by device and app
//! authentication.

pub mod apps;
pub mod assertion;
pub mod challenge;
pub mod enrollment;
pub mod signer;
pub mod tokens;

pub use assertion::{authenticate_app, authenticate_device, MintedToken};
pub use challenge::{get_challenge, issue_challenge};
pub use enrollment::{create_enrollment_token, validate_enrollment_token};
pub use signer::{JsonWebKey, TokenSigner};
