// src/core/scanner/certificate.rs

use tracing::{debug, warn};

use crate::core::knowledge_base::{self, KeyFamily};
use crate::core::models::{CertificateMetadata, RawCertificate};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::der_parser::der::parse_der_integer;
use x509_parser::prelude::*;
use x509_parser::public_key::RSAPublicKey;
use x509_parser::signature_algorithm::SignatureAlgorithm;

/// Closed classification of subject public keys.
///
/// Key types without a dedicated variant (post-quantum schemes, GOST, ...) end up
/// in `Unknown`, labelled from the algorithm table or, failing that, with the raw
/// algorithm OID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClass {
    Rsa { bits: Option<usize> },
    EllipticCurve { curve: Option<String>, bits: Option<usize> },
    Dsa { bits: Option<usize> },
    Ed25519,
    Ed448,
    Unknown(String),
}

impl KeyClass {
    pub fn label(&self) -> String {
        match self {
            KeyClass::Rsa { .. } => "RSA".to_string(),
            KeyClass::EllipticCurve { .. } => "ECDSA".to_string(),
            KeyClass::Dsa { .. } => "DSA".to_string(),
            KeyClass::Ed25519 => "Ed25519".to_string(),
            KeyClass::Ed448 => "Ed448".to_string(),
            KeyClass::Unknown(label) => label.clone(),
        }
    }

    pub fn bits(&self) -> Option<usize> {
        match self {
            KeyClass::Rsa { bits } | KeyClass::Dsa { bits } => *bits,
            KeyClass::EllipticCurve { bits, .. } => *bits,
            _ => None,
        }
    }

    pub fn curve(&self) -> Option<&str> {
        match self {
            KeyClass::EllipticCurve { curve, .. } => curve.as_deref(),
            _ => None,
        }
    }
}

/// Classifies the key carried by a SubjectPublicKeyInfo.
pub fn classify_public_key(spki: &SubjectPublicKeyInfo) -> KeyClass {
    let oid = spki.algorithm.algorithm.to_id_string();
    let Some(detail) = knowledge_base::key_algorithm(&oid) else {
        debug!(oid = %oid, "Public key algorithm not in table.");
        return KeyClass::Unknown(oid);
    };

    match detail.family {
        KeyFamily::Rsa => {
            let bits = RSAPublicKey::from_der(spki.subject_public_key.data.as_ref())
                .ok()
                .and_then(|(_, key)| significant_bits(key.modulus));
            KeyClass::Rsa { bits }
        }
        KeyFamily::EllipticCurve => {
            let curve_oid = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|oid| oid.to_id_string());
            match curve_oid.as_deref().and_then(knowledge_base::named_curve) {
                Some(curve) => KeyClass::EllipticCurve {
                    curve: Some(curve.name.to_string()),
                    bits: Some(curve.bits),
                },
                None => KeyClass::EllipticCurve { curve: curve_oid, bits: None },
            }
        }
        KeyFamily::Dsa => KeyClass::Dsa { bits: dsa_bits(spki) },
        KeyFamily::Ed25519 => KeyClass::Ed25519,
        KeyFamily::Ed448 => KeyClass::Ed448,
        KeyFamily::Named => KeyClass::Unknown(detail.label.to_string()),
    }
}

/// Bit length of the DSA prime `p`, falling back to the size of `y`.
fn dsa_bits(spki: &SubjectPublicKeyInfo) -> Option<usize> {
    let from_params = spki.algorithm.parameters.as_ref().and_then(|params| {
        // Dss-Parms ::= SEQUENCE { p INTEGER, q INTEGER, g INTEGER }
        parse_der_integer(params.data)
            .ok()
            .and_then(|(_, p)| p.as_slice().ok().and_then(significant_bits))
    });
    from_params.or_else(|| match spki.parsed() {
        Ok(x509_parser::public_key::PublicKey::DSA(y)) => significant_bits(y),
        _ => None,
    })
}

/// Number of significant bits in a big-endian unsigned integer.
fn significant_bits(bytes: &[u8]) -> Option<usize> {
    let first = bytes.iter().position(|b| *b != 0)?;
    let trimmed = &bytes[first..];
    Some(trimmed.len() * 8 - trimmed[0].leading_zeros() as usize)
}

// --- Distinguished names ---

/// Renders a name in RFC 4514 form: last RDN first, comma separated, with
/// multi-valued RDNs joined by `+`.
pub fn rfc4514_name(name: &X509Name) -> String {
    let rdns: Vec<_> = name.iter_rdn().collect();
    rdns.iter()
        .rev()
        .map(|rdn| {
            rdn.iter()
                .map(|attr| {
                    let oid = attr.attr_type().to_id_string();
                    let key = knowledge_base::name_attribute(&oid).map(str::to_string).unwrap_or(oid);
                    let value = match attr.as_str() {
                        Ok(s) => escape_dn_value(s),
                        Err(_) => match std::str::from_utf8(attr.as_slice()) {
                            Ok(s) => escape_dn_value(s),
                            Err(_) => format!("#{}", hex::encode(attr.as_slice())),
                        },
                    };
                    format!("{key}={value}")
                })
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_dn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            '"' | '+' | ',' | ';' | '<' | '>' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

// --- SAN ---

fn subject_alt_names(cert: &X509Certificate) -> Result<Vec<String>, String> {
    let ext = cert
        .subject_alternative_name()
        .map_err(|e| format!("SAN extension error: {e}"))?;
    let Some(ext) = ext else {
        return Ok(Vec::new());
    };
    Ok(ext
        .value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some(dns.to_string()),
            GeneralName::IPAddress(bytes) => Some(ip_literal(bytes)),
            _ => None,
        })
        .collect())
}

fn ip_literal(bytes: &[u8]) -> String {
    if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
        IpAddr::V4(Ipv4Addr::from(v4)).to_string()
    } else if let Ok(v6) = <[u8; 16]>::try_from(bytes) {
        IpAddr::V6(Ipv6Addr::from(v6)).to_string()
    } else {
        hex::encode(bytes)
    }
}

// --- Signature ---

fn signature_hash(cert: &X509Certificate, oid: &str) -> Option<String> {
    if let Some(hash) = knowledge_base::signature_algorithm(oid).and_then(|s| s.hash) {
        return Some(hash.to_string());
    }
    match SignatureAlgorithm::try_from(&cert.signature_algorithm) {
        Ok(SignatureAlgorithm::RSASSA_PSS(params)) => {
            knowledge_base::digest_name(&params.hash_algorithm_oid().to_id_string()).map(str::to_string)
        }
        _ => None,
    }
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(time.timestamp(), 0).ok_or_else(|| format!("timestamp out of range: {time}"))
}

// --- Extraction ---

/// Builds the metadata record for an already parsed certificate. `der` must be
/// the encoding `cert` was parsed from; it feeds the fingerprint.
pub fn metadata_from_certificate(cert: &X509Certificate, der: &[u8]) -> CertificateMetadata {
    let mut meta = CertificateMetadata {
        subject: Some(rfc4514_name(cert.subject())),
        issuer: Some(rfc4514_name(cert.issuer())),
        serial_number: Some(cert.tbs_certificate.serial.to_str_radix(16)),
        sha256_fingerprint: Some(hex::encode(Sha256::digest(der))),
        ..Default::default()
    };

    match subject_alt_names(cert) {
        Ok(san) => meta.san = san,
        Err(e) => {
            warn!(error = %e, "Could not read subjectAltName.");
            meta.field_errors.insert("san".to_string(), e);
        }
    }

    let validity = cert.validity();
    match asn1_time_to_chrono_utc(&validity.not_before) {
        Ok(t) => meta.not_before = Some(t),
        Err(e) => {
            meta.field_errors.insert("not_before".to_string(), e);
        }
    }
    match asn1_time_to_chrono_utc(&validity.not_after) {
        Ok(t) => {
            meta.days_until_expiry = Some(t.signed_duration_since(Utc::now()).num_days());
            meta.not_after = Some(t);
        }
        Err(e) => {
            meta.field_errors.insert("not_after".to_string(), e);
        }
    }

    let spki = cert.public_key();
    let key = classify_public_key(spki);
    meta.public_key_oid = Some(spki.algorithm.algorithm.to_id_string());
    meta.public_key_algorithm = Some(key.label());
    meta.public_key_bits = key.bits();
    meta.public_key_curve = key.curve().map(str::to_string);
    if matches!(key, KeyClass::Rsa { bits: None } | KeyClass::Dsa { bits: None }) {
        meta.field_errors.insert("public_key_bits".to_string(), "could not decode key size".to_string());
    }

    let sig_oid = cert.signature_algorithm.algorithm.to_id_string();
    meta.signature_algorithm_name = knowledge_base::signature_algorithm(&sig_oid).map(|s| s.name.to_string());
    meta.signature_hash_algorithm = signature_hash(cert, &sig_oid);
    meta.signature_algorithm_oid = Some(sig_oid);

    debug!(
        subject = meta.subject.as_deref().unwrap_or_default(),
        key = meta.public_key_algorithm.as_deref().unwrap_or_default(),
        "Extracted certificate metadata."
    );
    meta
}

/// Parses DER and extracts metadata; never fails, see [`CertificateMetadata::unparseable`].
pub fn extract_metadata(der: &[u8]) -> CertificateMetadata {
    match X509Certificate::from_der(der) {
        Ok((_, cert)) => metadata_from_certificate(&cert, der),
        Err(e) => {
            warn!(error = %e, "Failed to parse X.509 certificate.");
            CertificateMetadata::unparseable(format!("X.509 parse error: {e}"))
        }
    }
}

/// Decodes one `BEGIN/END CERTIFICATE` block to DER.
pub fn decode_pem_block(block: &str) -> RawCertificate {
    match parse_x509_pem(block.as_bytes()) {
        Ok((_, pem)) if pem.label == "CERTIFICATE" => RawCertificate::Der(pem.contents),
        Ok((_, pem)) => RawCertificate::Malformed(format!("unexpected PEM label: {}", pem.label)),
        Err(e) => RawCertificate::Malformed(format!("PEM decode error: {e}")),
    }
}

pub fn extract_metadata_from_pem(block: &str) -> CertificateMetadata {
    metadata_for(&decode_pem_block(block))
}

pub fn metadata_for(raw: &RawCertificate) -> CertificateMetadata {
    match raw {
        RawCertificate::Der(der) => extract_metadata(der),
        RawCertificate::Malformed(reason) => CertificateMetadata::unparseable(reason.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_LEAF: &str = include_str!("../../../tests/fixtures/rsa_leaf.pem");
    const EC_INTERMEDIATE: &str = include_str!("../../../tests/fixtures/ec_intermediate.pem");
    const ED25519: &str = include_str!("../../../tests/fixtures/ed25519.pem");
    const DSA: &str = include_str!("../../../tests/fixtures/dsa.pem");
    const ML_DSA_65: &str = include_str!("../../../tests/fixtures/mldsa65.pem");

    #[test]
    fn rsa_leaf_metadata() {
        let meta = extract_metadata_from_pem(RSA_LEAF);

        assert!(meta.parse_error.is_none());
        assert!(meta.field_errors.is_empty(), "{:?}", meta.field_errors);
        assert_eq!(meta.subject.as_deref(), Some("CN=example.com,O=Example Org,C=US"));
        assert_eq!(meta.issuer, meta.subject);
        assert_eq!(meta.san, vec!["example.com", "www.example.com", "192.0.2.10"]);
        assert_eq!(meta.serial_number.as_deref(), Some("1a2b3c"));
        assert_eq!(meta.public_key_algorithm.as_deref(), Some("RSA"));
        assert_eq!(meta.public_key_bits, Some(2048));
        assert_eq!(meta.public_key_curve, None);
        assert_eq!(meta.signature_algorithm_oid.as_deref(), Some("1.2.840.113549.1.1.11"));
        assert_eq!(meta.signature_algorithm_name.as_deref(), Some("sha256WithRSAEncryption"));
        assert_eq!(meta.signature_hash_algorithm.as_deref(), Some("sha256"));
        assert_eq!(
            meta.sha256_fingerprint.as_deref(),
            Some("446831d1652f81e246a018ea0214036acbc2bada5d686f270e72f2b8bf879be6")
        );
        let not_before = meta.not_before.unwrap();
        let not_after = meta.not_after.unwrap();
        assert!(not_after > not_before);
    }

    #[test]
    fn elliptic_curve_records_named_curve() {
        let meta = extract_metadata_from_pem(EC_INTERMEDIATE);

        assert_eq!(meta.subject.as_deref(), Some("CN=Example Intermediate CA,O=Example Trust,C=US"));
        assert_eq!(meta.public_key_algorithm.as_deref(), Some("ECDSA"));
        assert_eq!(meta.public_key_curve.as_deref(), Some("secp384r1"));
        assert_eq!(meta.public_key_bits, Some(384));
        assert_eq!(meta.signature_hash_algorithm.as_deref(), Some("sha384"));
        assert!(meta.san.is_empty());
        assert_eq!(meta.serial_number.as_deref(), Some("f"));
    }

    #[test]
    fn ed25519_has_no_separate_hash() {
        let meta = extract_metadata_from_pem(ED25519);

        assert_eq!(meta.public_key_algorithm.as_deref(), Some("Ed25519"));
        assert_eq!(meta.public_key_bits, None);
        assert_eq!(meta.signature_algorithm_oid.as_deref(), Some("1.3.101.112"));
        assert_eq!(meta.signature_hash_algorithm, None);
        assert!(meta.field_errors.is_empty());
    }

    #[test]
    fn dsa_key_size_comes_from_domain_parameters() {
        let meta = extract_metadata_from_pem(DSA);

        assert_eq!(meta.public_key_algorithm.as_deref(), Some("DSA"));
        assert_eq!(meta.public_key_bits, Some(2048));
        assert_eq!(meta.signature_algorithm_name.as_deref(), Some("dsa-with-sha256"));
    }

    #[test]
    fn post_quantum_key_is_labelled_not_rejected() {
        let meta = extract_metadata_from_pem(ML_DSA_65);

        assert!(meta.parse_error.is_none());
        assert_eq!(meta.subject.as_deref(), Some("CN=pq.example.org"));
        assert_eq!(meta.public_key_algorithm.as_deref(), Some("ML-DSA-65"));
        assert_eq!(meta.public_key_oid.as_deref(), Some("2.16.840.1.101.3.4.3.18"));
        assert_eq!(meta.public_key_bits, None);
        assert_eq!(meta.signature_algorithm_oid.as_deref(), Some("2.16.840.1.101.3.4.3.18"));
        assert_eq!(meta.signature_hash_algorithm, None);
    }

    #[test]
    fn garbage_der_yields_unparseable_marker() {
        let meta = extract_metadata(b"definitely not a certificate");
        assert!(meta.is_unparseable());
        assert!(meta.subject.is_none());
        assert!(meta.display_name().starts_with("<unparseable"));
    }

    #[test]
    fn pem_with_wrong_label_is_malformed() {
        let block = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
        assert!(matches!(decode_pem_block(block), RawCertificate::Malformed(_)));
    }

    #[test]
    fn dn_values_are_escaped() {
        assert_eq!(escape_dn_value("Acme, Inc."), "Acme\\, Inc.");
        assert_eq!(escape_dn_value("#hash"), "\\#hash");
        assert_eq!(escape_dn_value(" padded "), "\\ padded\\ ");
        assert_eq!(escape_dn_value("a+b=c"), "a\\+b=c");
    }

    #[test]
    fn significant_bits_ignores_leading_zeros() {
        assert_eq!(significant_bits(&[0x00, 0x80, 0x00]), Some(16));
        assert_eq!(significant_bits(&[0x01]), Some(1));
        assert_eq!(significant_bits(&[0x00, 0x00]), None);
    }

    #[test]
    fn unknown_spki_oid_is_reported_verbatim() {
        assert_eq!(KeyClass::Unknown("1.2.3.4".into()).label(), "1.2.3.4");
        assert_eq!(KeyClass::EllipticCurve { curve: Some("secp256r1".into()), bits: Some(256) }.curve(), Some("secp256r1"));
    }
}
