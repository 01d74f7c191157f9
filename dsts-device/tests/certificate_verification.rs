//! End-to-end certificate verification against a real self-signed
//! certificate, rather than the hand-built `ParsedCertificate` fixtures
//! used for the narrower unit tests in `dsts-crypto`.

use chrono::{Duration, Utc};
use dsts_crypto::certificate::{verify_certificate, verify_device_identity, ParsedCertificate};
use rcgen::{CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair, KeyUsagePurpose};

fn self_signed_device_cert(common_name: &str, organization: &str) -> Vec<u8> {
    let mut params = CertificateParams::new(Vec::new()).expect("empty SAN list is always valid");

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, organization);
    params.distinguished_name = dn;

    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];

    let key_pair = KeyPair::generate().expect("keypair generation");
    let cert = params.self_signed(&key_pair).expect("self-signing");
    cert.der().to_vec()
}

#[test]
fn valid_device_certificate_passes_both_checks() {
    let der = self_signed_device_cert("device-42", "tenant-acme");
    let cert = ParsedCertificate::parse_der(&der).expect("parse self-signed der");

    verify_certificate(&cert, Utc::now()).expect("verify_certificate should accept a fresh cert");
    verify_device_identity(&cert, "device-42", "tenant-acme")
        .expect("identity should bind to the asserted device/tenant");
}

#[test]
fn identity_check_rejects_wrong_tenant() {
    let der = self_signed_device_cert("device-42", "tenant-acme");
    let cert = ParsedCertificate::parse_der(&der).expect("parse self-signed der");

    assert!(verify_device_identity(&cert, "device-42", "tenant-other").is_err());
    assert!(verify_device_identity(&cert, "someone-else", "tenant-acme").is_err());
}

#[test]
fn thumbprint_is_stable_across_reparses() {
    let der = self_signed_device_cert("device-1", "tenant-a");
    let first = ParsedCertificate::parse_der(&der).expect("first parse");
    let second = ParsedCertificate::parse_der(&der).expect("second parse");
    assert_eq!(first.thumbprint(), second.thumbprint());
}

#[test]
fn expired_certificate_is_rejected() {
    let der = self_signed_device_cert("device-1", "tenant-a");
    let cert = ParsedCertificate::parse_der(&der).expect("parse self-signed der");

    let far_future = Utc::now() + Duration::days(365 * 50);
    assert!(verify_certificate(&cert, far_future).is_err());
}
