//! Signer error types.

use thiserror::Error;

/// Errors raised while loading the key or taking a document apart.
///
/// A signature that simply fails to verify is not an error; it is reported
/// as [`Verification::Invalid`](crate::Verification::Invalid).
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("key parsing error: {0}")]
    KeyParsing(String),

    #[error("signature marker not found at the start of the document")]
    SignatureNotFound,

    #[error("invalid signature format: {0}")]
    InvalidSignature(String),
}

/// Result type for signing operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;
