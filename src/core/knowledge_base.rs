//! Static, read-only tables of the algorithm identifiers the certificate
//! extractor knows how to name.
//!
//! Recognising a newly standardised key or signature algorithm is a matter of
//! adding a row here; the extractor itself does not change.

/// The family a public-key algorithm belongs to. Families with a dedicated
/// classification get their own variant; everything else is `Named`, which the
/// extractor reports under the table label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    EllipticCurve,
    Dsa,
    Ed25519,
    Ed448,
    Named,
}

/// One row of the public-key algorithm table.
pub struct KeyAlgorithmDetail {
    pub oid: &'static str,
    pub label: &'static str,
    pub family: KeyFamily,
}

/// One row of the named-curve table.
pub struct CurveDetail {
    pub oid: &'static str,
    pub name: &'static str,
    pub bits: usize,
}

/// One row of the signature algorithm table.
pub struct SignatureAlgorithmDetail {
    pub oid: &'static str,
    pub name: &'static str,
    /// Digest used by the scheme, when it is fixed by the OID.
    pub hash: Option<&'static str>,
}

static KEY_ALGORITHMS: &[KeyAlgorithmDetail] = &[
    // --- Classical ---
    KeyAlgorithmDetail { oid: "1.2.840.113549.1.1.1", label: "RSA", family: KeyFamily::Rsa },
    KeyAlgorithmDetail { oid: "1.2.840.113549.1.1.10", label: "RSA", family: KeyFamily::Rsa },
    KeyAlgorithmDetail { oid: "1.2.840.10045.2.1", label: "ECDSA", family: KeyFamily::EllipticCurve },
    KeyAlgorithmDetail { oid: "1.2.840.10040.4.1", label: "DSA", family: KeyFamily::Dsa },
    KeyAlgorithmDetail { oid: "1.3.101.112", label: "Ed25519", family: KeyFamily::Ed25519 },
    KeyAlgorithmDetail { oid: "1.3.101.113", label: "Ed448", family: KeyFamily::Ed448 },
    KeyAlgorithmDetail { oid: "1.3.101.110", label: "X25519", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "1.3.101.111", label: "X448", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "1.2.643.2.2.19", label: "GOST R 34.10-2001", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "1.2.643.7.1.1.1.1", label: "GOST R 34.10-2012-256", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "1.2.643.7.1.1.1.2", label: "GOST R 34.10-2012-512", family: KeyFamily::Named },
    // --- Post-quantum (FIPS 204 / FIPS 205) ---
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.17", label: "ML-DSA-44", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.18", label: "ML-DSA-65", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.19", label: "ML-DSA-87", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.20", label: "SLH-DSA-SHA2-128s", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.21", label: "SLH-DSA-SHA2-128f", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.22", label: "SLH-DSA-SHA2-192s", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.23", label: "SLH-DSA-SHA2-192f", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.24", label: "SLH-DSA-SHA2-256s", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.25", label: "SLH-DSA-SHA2-256f", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.4.1", label: "ML-KEM-512", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.4.2", label: "ML-KEM-768", family: KeyFamily::Named },
    KeyAlgorithmDetail { oid: "2.16.840.1.101.3.4.4.3", label: "ML-KEM-1024", family: KeyFamily::Named },
];

static NAMED_CURVES: &[CurveDetail] = &[
    CurveDetail { oid: "1.2.840.10045.3.1.7", name: "secp256r1", bits: 256 },
    CurveDetail { oid: "1.3.132.0.34", name: "secp384r1", bits: 384 },
    CurveDetail { oid: "1.3.132.0.35", name: "secp521r1", bits: 521 },
    CurveDetail { oid: "1.3.132.0.10", name: "secp256k1", bits: 256 },
    CurveDetail { oid: "1.2.840.10045.3.1.1", name: "secp192r1", bits: 192 },
    CurveDetail { oid: "1.3.132.0.33", name: "secp224r1", bits: 224 },
    CurveDetail { oid: "1.3.36.3.3.2.8.1.1.7", name: "brainpoolP256r1", bits: 256 },
    CurveDetail { oid: "1.3.36.3.3.2.8.1.1.11", name: "brainpoolP384r1", bits: 384 },
    CurveDetail { oid: "1.3.36.3.3.2.8.1.1.13", name: "brainpoolP512r1", bits: 512 },
];

static SIGNATURE_ALGORITHMS: &[SignatureAlgorithmDetail] = &[
    // --- RSA PKCS#1 v1.5 ---
    SignatureAlgorithmDetail { oid: "1.2.840.113549.1.1.4", name: "md5WithRSAEncryption", hash: Some("md5") },
    SignatureAlgorithmDetail { oid: "1.2.840.113549.1.1.5", name: "sha1WithRSAEncryption", hash: Some("sha1") },
    SignatureAlgorithmDetail { oid: "1.2.840.113549.1.1.14", name: "sha224WithRSAEncryption", hash: Some("sha224") },
    SignatureAlgorithmDetail { oid: "1.2.840.113549.1.1.11", name: "sha256WithRSAEncryption", hash: Some("sha256") },
    SignatureAlgorithmDetail { oid: "1.2.840.113549.1.1.12", name: "sha384WithRSAEncryption", hash: Some("sha384") },
    SignatureAlgorithmDetail { oid: "1.2.840.113549.1.1.13", name: "sha512WithRSAEncryption", hash: Some("sha512") },
    // Hash lives in the parameters; resolved separately.
    SignatureAlgorithmDetail { oid: "1.2.840.113549.1.1.10", name: "RSASSA-PSS", hash: None },
    // --- ECDSA ---
    SignatureAlgorithmDetail { oid: "1.2.840.10045.4.1", name: "ecdsa-with-SHA1", hash: Some("sha1") },
    SignatureAlgorithmDetail { oid: "1.2.840.10045.4.3.1", name: "ecdsa-with-SHA224", hash: Some("sha224") },
    SignatureAlgorithmDetail { oid: "1.2.840.10045.4.3.2", name: "ecdsa-with-SHA256", hash: Some("sha256") },
    SignatureAlgorithmDetail { oid: "1.2.840.10045.4.3.3", name: "ecdsa-with-SHA384", hash: Some("sha384") },
    SignatureAlgorithmDetail { oid: "1.2.840.10045.4.3.4", name: "ecdsa-with-SHA512", hash: Some("sha512") },
    // --- DSA ---
    SignatureAlgorithmDetail { oid: "1.2.840.10040.4.3", name: "dsa-with-sha1", hash: Some("sha1") },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.1", name: "dsa-with-sha224", hash: Some("sha224") },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.2", name: "dsa-with-sha256", hash: Some("sha256") },
    // --- EdDSA: no separate pre-hash ---
    SignatureAlgorithmDetail { oid: "1.3.101.112", name: "Ed25519", hash: None },
    SignatureAlgorithmDetail { oid: "1.3.101.113", name: "Ed448", hash: None },
    // --- Post-quantum ---
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.17", name: "ML-DSA-44", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.18", name: "ML-DSA-65", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.19", name: "ML-DSA-87", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.20", name: "SLH-DSA-SHA2-128s", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.21", name: "SLH-DSA-SHA2-128f", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.22", name: "SLH-DSA-SHA2-192s", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.23", name: "SLH-DSA-SHA2-192f", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.24", name: "SLH-DSA-SHA2-256s", hash: None },
    SignatureAlgorithmDetail { oid: "2.16.840.1.101.3.4.3.25", name: "SLH-DSA-SHA2-256f", hash: None },
];

/// Digest algorithm identifiers, as found inside RSASSA-PSS parameters.
static DIGESTS: &[(&str, &str)] = &[
    ("1.3.14.3.2.26", "sha1"),
    ("2.16.840.1.101.3.4.2.4", "sha224"),
    ("2.16.840.1.101.3.4.2.1", "sha256"),
    ("2.16.840.1.101.3.4.2.2", "sha384"),
    ("2.16.840.1.101.3.4.2.3", "sha512"),
];

/// Short names used when rendering distinguished names (RFC 4514, section 3,
/// plus the attributes commonly seen in Web PKI subjects).
static NAME_ATTRIBUTES: &[(&str, &str)] = &[
    ("2.5.4.3", "CN"),
    ("2.5.4.6", "C"),
    ("2.5.4.7", "L"),
    ("2.5.4.8", "ST"),
    ("2.5.4.9", "STREET"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("2.5.4.5", "serialNumber"),
    ("2.5.4.15", "businessCategory"),
    ("2.5.4.17", "postalCode"),
    ("0.9.2342.19200300.100.1.25", "DC"),
    ("0.9.2342.19200300.100.1.1", "UID"),
    ("1.2.840.113549.1.9.1", "emailAddress"),
    ("1.3.6.1.4.1.311.60.2.1.3", "jurisdictionC"),
];

pub fn key_algorithm(oid: &str) -> Option<&'static KeyAlgorithmDetail> {
    KEY_ALGORITHMS.iter().find(|k| k.oid == oid)
}

pub fn named_curve(oid: &str) -> Option<&'static CurveDetail> {
    NAMED_CURVES.iter().find(|c| c.oid == oid)
}

pub fn signature_algorithm(oid: &str) -> Option<&'static SignatureAlgorithmDetail> {
    SIGNATURE_ALGORITHMS.iter().find(|s| s.oid == oid)
}

pub fn digest_name(oid: &str) -> Option<&'static str> {
    DIGESTS.iter().find(|(o, _)| *o == oid).map(|(_, name)| *name)
}

pub fn name_attribute(oid: &str) -> Option<&'static str> {
    NAME_ATTRIBUTES.iter().find(|(o, _)| *o == oid).map(|(_, short)| *short)
}
