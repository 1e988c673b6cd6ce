//! Signature verification and line-ending fallbacks.
//!
//! Documents are sometimes re-saved with different line endings or with a
//! newline added or dropped at either end. When the payload does not verify
//! byte for byte, a fixed, ordered list of rewritten payloads is tried and
//! the first one that verifies names the damage. Rewrites are never
//! combined: every candidate is derived from the payload as extracted.

use crate::MAX_APPENDED_NEWLINES;
use crate::document::{SignedDocument, extract_signature};
use crate::error::SignerResult;
use crate::key::PublicKey;
use rsa::Pkcs1v15Sign;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::borrow::Cow;
use std::fmt;

const CRLF: &str = "\r\n";

/// Outcome of checking a signature against a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "newlines", rename_all = "snake_case")]
pub enum Verification {
    /// The payload verifies exactly as written.
    Valid,
    /// The payload verifies once every `\n` becomes `\r\n`.
    ValidAfterCrlfNormalization,
    /// The payload verifies once its leading `\r\n` is dropped.
    ValidAfterLeadingNewlineStrip,
    /// The payload verifies with this many `\r\n` appended.
    ValidAfterAppendingNewlines(usize),
    /// The payload verifies with this many trailing `\r\n` removed.
    ValidAfterRemovingNewlines(usize),
    /// No candidate verified.
    Invalid,
}

impl Verification {
    /// Whether some candidate verified.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Whether the payload only verified after being rewritten.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Valid | Self::Invalid)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "Signature is valid"),
            Self::ValidAfterCrlfNormalization => {
                write!(f, "Signature is valid if document is normalised to CRLF")
            }
            Self::ValidAfterLeadingNewlineStrip => {
                write!(f, "Signature is valid if first newline is removed")
            }
            Self::ValidAfterAppendingNewlines(n) => write!(
                f,
                "Signature is valid if {n} newlines are appended to the document"
            ),
            Self::ValidAfterRemovingNewlines(n) => write!(
                f,
                "Signature is valid if {n} newlines are removed from the end of the document"
            ),
            Self::Invalid => write!(f, "Signature is not valid"),
        }
    }
}

/// A rewritten payload and the outcome reported if it verifies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub outcome: Verification,
    pub payload: Cow<'a, str>,
}

/// Whether the payload already uses CRLF line endings.
///
/// A single `\r\n` anywhere is enough; stray bare `\n` are not inspected.
pub fn is_crlf(payload: &str) -> bool {
    payload.contains(CRLF)
}

/// Verify a SHA-1 / PKCS#1 v1.5 signature over the UTF-8 bytes of `payload`.
///
/// Malformed signatures (wrong length, bad padding) verify as `false`.
pub fn verify(payload: &str, signature: &[u8], key: &PublicKey) -> bool {
    let digest = Sha1::digest(payload.as_bytes());
    key.rsa_key()
        .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, signature)
        .is_ok()
}

/// Every payload worth trying, in priority order.
///
/// 1. the payload as extracted
/// 2. `\n` replaced by `\r\n`, only when the payload has no `\r\n` at all
/// 3. the leading `\r\n` removed, when present
/// 4. 1 to [`MAX_APPENDED_NEWLINES`] `\r\n` appended
/// 5. trailing `\r\n` removed one at a time while any remain
///
/// Candidates are produced lazily so the search stops allocating as soon as
/// one verifies.
pub fn candidates(payload: &str) -> impl Iterator<Item = Candidate<'_>> {
    let as_is = std::iter::once(Candidate {
        outcome: Verification::Valid,
        payload: Cow::Borrowed(payload),
    });

    let normalized = (!is_crlf(payload))
        .then_some(())
        .into_iter()
        .map(move |()| Candidate {
            outcome: Verification::ValidAfterCrlfNormalization,
            payload: Cow::Owned(payload.replace('\n', CRLF)),
        });

    let leading = payload.strip_prefix(CRLF).map(|rest| Candidate {
        outcome: Verification::ValidAfterLeadingNewlineStrip,
        payload: Cow::Borrowed(rest),
    });

    let appended = (1..=MAX_APPENDED_NEWLINES).map(move |n| Candidate {
        outcome: Verification::ValidAfterAppendingNewlines(n),
        payload: Cow::Owned(format!("{payload}{}", CRLF.repeat(n))),
    });

    let removed = std::iter::successors(payload.strip_suffix(CRLF), |p| p.strip_suffix(CRLF))
        .zip(1..)
        .map(|(rest, n)| Candidate {
            outcome: Verification::ValidAfterRemovingNewlines(n),
            payload: Cow::Borrowed(rest),
        });

    as_is
        .chain(normalized)
        .chain(leading)
        .chain(appended)
        .chain(removed)
}

/// Try each candidate in order and report the first that verifies.
pub fn verify_with_fallbacks(payload: &str, signature: &[u8], key: &PublicKey) -> Verification {
    candidates(payload)
        .find(|candidate| {
            let valid = verify(&candidate.payload, signature, key);
            tracing::debug!(attempt = ?candidate.outcome, valid, "Signature attempt");
            valid
        })
        .map_or(Verification::Invalid, |candidate| candidate.outcome)
}

/// Result of checking a whole document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckReport<'a> {
    /// The extracted token and payload.
    pub document: SignedDocument<'a>,
    /// Whether the payload contained any `\r\n`.
    pub crlf: bool,
    /// The verification outcome.
    pub outcome: Verification,
}

/// Checks documents against a single public key.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    key: PublicKey,
}

impl SignatureVerifier {
    /// Create a verifier for the given key.
    pub fn new(key: PublicKey) -> Self {
        Self { key }
    }

    /// Create a verifier for the embedded key.
    pub fn embedded() -> SignerResult<Self> {
        PublicKey::embedded().map(Self::new)
    }

    /// Get the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// Verify a payload exactly as given.
    pub fn verify(&self, payload: &str, signature: &[u8]) -> bool {
        verify(payload, signature, &self.key)
    }

    /// Verify a payload, falling back to rewritten candidates.
    pub fn verify_with_fallbacks(&self, payload: &str, signature: &[u8]) -> Verification {
        verify_with_fallbacks(payload, signature, &self.key)
    }

    /// Extract, decode and verify the signature embedded in `body`.
    pub fn check<'a>(&self, body: &'a str) -> SignerResult<CheckReport<'a>> {
        let document = extract_signature(body)?;
        let crlf = is_crlf(document.payload);
        let signature = document.signature_bytes()?;

        tracing::debug!(
            token_len = document.token.len(),
            signature_len = signature.len(),
            payload_len = document.payload.len(),
            crlf,
            "Extracted signature"
        );

        let outcome = self.verify_with_fallbacks(document.payload, &signature);

        Ok(CheckReport {
            document,
            crlf,
            outcome,
        })
    }
}
