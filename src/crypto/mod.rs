//! PIN encryption for operators that refuse cleartext PINs on the wire.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("malformed public key material: {0}")]
    MalformedKey(String),

    #[error("PIN encryption failed: {0}")]
    EncryptionFailed(String),
}

const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";

/// Encrypts a PIN under an operator-published RSA public key and returns
/// the ciphertext as base64.
///
/// Operators publish the key either as a full PEM document or as a bare
/// base64 blob; bare material is wrapped in PEM framing first. Keys rotate,
/// so callers fetch fresh material per use rather than caching it.
pub fn encrypt_pin(pin: &str, key_material: &str) -> Result<String, CryptoError> {
    let pem = ensure_pem_framing(key_material);
    let key = RsaPublicKey::from_public_key_pem(&pem)
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;

    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, pin.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(BASE64.encode(ciphertext))
}

fn ensure_pem_framing(material: &str) -> String {
    let trimmed = material.trim();
    if trimmed.contains(PEM_HEADER) {
        return trimmed.to_string();
    }

    let compact: Vec<char> = trimmed.chars().filter(|ch| !ch.is_whitespace()).collect();
    let mut pem = String::from(PEM_HEADER);
    for chunk in compact.chunks(64) {
        pem.push('\n');
        pem.extend(chunk.iter());
    }
    pem.push('\n');
    pem.push_str(PEM_FOOTER);
    pem.push('\n');
    pem
}
