use base64::Engine;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rbxsig_signer::PublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use std::sync::OnceLock;

/// Deterministic 1024-bit signing key shared by every test in the binary.
pub fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0x7262_7873_6967);
        RsaPrivateKey::new(&mut rng, 1024).unwrap()
    })
}

pub fn public_key() -> PublicKey {
    PublicKey::from(RsaPublicKey::from(test_key()))
}

/// SHA-1 / PKCS#1 v1.5 signature over the UTF-8 bytes of `payload`.
pub fn sign(payload: &str) -> Vec<u8> {
    let digest = Sha1::digest(payload.as_bytes());
    test_key()
        .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
        .unwrap()
}

/// A document carrying a signature over `signed` in front of `shipped`.
///
/// The token is written without padding, as signed documents in the wild are.
pub fn signed_document(signed: &str, shipped: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD_NO_PAD.encode(sign(signed));
    format!("--rbxsig%{token}%{shipped}")
}

/// Encode a public key as a CryptoAPI PUBLICKEYBLOB.
pub fn csp_blob(key: &RsaPublicKey) -> Vec<u8> {
    let mut modulus = key.n().to_bytes_le();
    modulus.resize(key.size(), 0);
    let mut exponent = key.e().to_bytes_le();
    exponent.resize(4, 0);

    let mut blob = vec![0x06, 0x02, 0x00, 0x00];
    blob.extend_from_slice(&0x0000_a400u32.to_le_bytes());
    blob.extend_from_slice(b"RSA1");
    blob.extend_from_slice(&((key.size() * 8) as u32).to_le_bytes());
    blob.extend_from_slice(&exponent);
    blob.extend_from_slice(&modulus);
    blob
}
