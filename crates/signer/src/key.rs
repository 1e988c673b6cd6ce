//! RSA public key handling.
//!
//! The verification key ships inside the binary as a Microsoft CryptoAPI
//! `PUBLICKEYBLOB`, base64 encoded. The blob layout is a `BLOBHEADER`
//! followed by an `RSAPUBKEY` and the little-endian modulus:
//!
//! ```text
//! offset  size  field
//!      0     1  bType      (0x06, PUBLICKEYBLOB)
//!      1     1  bVersion   (0x02)
//!      2     2  reserved
//!      4     4  aiKeyAlg   (CALG_RSA_KEYX or CALG_RSA_SIGN)
//!      8     4  magic      ("RSA1")
//!     12     4  bitlen
//!     16     4  pubexp
//!     20  bitlen/8  modulus, least significant byte first
//! ```

use crate::error::{SignerError, SignerResult};
use base64::Engine;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use std::fmt;

/// The key every `--rbxsig` document is checked against.
const EMBEDDED_KEY_BLOB: &str = "BgIAAACkAABSU0ExAAQAAAEAAQCjbUyx9OXTBcWEAonZOfAoT7YhMS+L21WwAZlsEjvzHXQpulpasNFhC1U6tBX6c8Qey2fiRBXHpqbh7vAC7u2niT6dMLLqY9UzII0jyxKD/EUODcQHTKpbM18FRobqLcvK0DNdIaHwypr7NRnSWk4NXhtM0v40W7/mr35PxbJ8rQ==";

const PUBLICKEYBLOB: u8 = 0x06;
const CUR_BLOB_VERSION: u8 = 0x02;
const CALG_RSA_KEYX: u32 = 0x0000_a400;
const CALG_RSA_SIGN: u32 = 0x0000_2400;
const RSA1_MAGIC: &[u8; 4] = b"RSA1";
const HEADER_LEN: usize = 20;

/// A public key for verification.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Load the key compiled into this crate.
    pub fn embedded() -> SignerResult<Self> {
        Self::from_csp_blob_base64(EMBEDDED_KEY_BLOB)
    }

    /// Parse a base64-encoded CryptoAPI public key blob.
    pub fn from_csp_blob_base64(s: &str) -> SignerResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map_err(|e| SignerError::KeyParsing(format!("invalid base64: {e}")))?;
        Self::from_csp_blob(&bytes)
    }

    /// Parse a raw CryptoAPI `PUBLICKEYBLOB`.
    pub fn from_csp_blob(bytes: &[u8]) -> SignerResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SignerError::KeyParsing(format!(
                "expected at least {HEADER_LEN} header bytes, got {}",
                bytes.len()
            )));
        }

        if bytes[0] != PUBLICKEYBLOB {
            return Err(SignerError::KeyParsing(format!(
                "unexpected blob type 0x{:02x}",
                bytes[0]
            )));
        }
        if bytes[1] != CUR_BLOB_VERSION {
            return Err(SignerError::KeyParsing(format!(
                "unsupported blob version {}",
                bytes[1]
            )));
        }

        let alg = read_u32_le(bytes, 4);
        if alg != CALG_RSA_KEYX && alg != CALG_RSA_SIGN {
            return Err(SignerError::KeyParsing(format!(
                "unsupported key algorithm 0x{alg:08x}"
            )));
        }

        if &bytes[8..12] != RSA1_MAGIC {
            return Err(SignerError::KeyParsing(
                "missing RSA1 public key magic".to_string(),
            ));
        }

        let bit_len = read_u32_le(bytes, 12) as usize;
        if bit_len == 0 || bit_len % 8 != 0 {
            return Err(SignerError::KeyParsing(format!(
                "invalid modulus bit length {bit_len}"
            )));
        }

        let modulus_len = bit_len / 8;
        let modulus = bytes
            .get(HEADER_LEN..HEADER_LEN + modulus_len)
            .ok_or_else(|| {
                SignerError::KeyParsing(format!(
                    "expected {modulus_len} modulus bytes, got {}",
                    bytes.len() - HEADER_LEN
                ))
            })?;

        let n = BigUint::from_bytes_le(modulus);
        let e = BigUint::from(read_u32_le(bytes, 16));

        let inner = RsaPublicKey::new(n, e)
            .map_err(|e| SignerError::KeyParsing(format!("invalid RSA key: {e}")))?;

        Ok(Self { inner })
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.inner.n().bits()
    }

    /// Get the inner RSA key.
    pub(crate) fn rsa_key(&self) -> &RsaPublicKey {
        &self.inner
    }
}

impl From<RsaPublicKey> for PublicKey {
    fn from(inner: RsaPublicKey) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(rsa-{}, e={})", self.bits(), self.inner.e())
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
