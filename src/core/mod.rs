// src/core/mod.rs

// Root of the scanning engine. Everything below is UI-agnostic and exported
// through the library target.

/// Data structures exchanged between the engine stages and serialised in reports,
/// such as `ScanTarget`, `ScanTask` and `CertificateMetadata`.
pub mod models;

/// Port tables and tunables, with environment overrides.
pub mod config;

pub mod error;

/// Resolution, scheduling, fetching and metadata extraction.
pub mod scanner;

/// Static OID tables for key, curve, signature, digest and name attributes.
pub mod knowledge_base;
