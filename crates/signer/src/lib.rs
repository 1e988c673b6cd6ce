//! Verification of `--rbxsig` signed documents.
//!
//! This crate provides:
//! - The embedded RSA public key, parsed from its CryptoAPI blob
//! - Anchored extraction of the `%token%` signature header
//! - SHA-1 / PKCS#1 v1.5 verification with line-ending fallbacks

pub mod document;
pub mod error;
pub mod key;
pub mod verify;

pub use document::{SignedDocument, decode_signature, decode_text, extract_signature};
pub use error::{SignerError, SignerResult};
pub use key::PublicKey;
pub use verify::{CheckReport, SignatureVerifier, Verification, verify, verify_with_fallbacks};

/// Optional literal that may precede the first `%` delimiter.
pub const RBXSIG_PREFIX: &str = "--rbxsig";

/// Delimiter surrounding the base64 signature token.
pub const DELIMITER: char = '%';

/// Highest number of trailing CRLFs tried by the append fallback.
pub const MAX_APPENDED_NEWLINES: usize = 10;
