use crate::asymmetric;
use crate::ciphertext::{CipherScheme, Ciphertext};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyAlgorithm, KeyMaterial};
use crate::symmetric::{self, SymmetricAlgorithm};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

/// Current envelope format
pub const ENVELOPE_VERSION: u32 = 1;

/// Hybrid encryption envelope
///
/// Contains the wrapped Data Encryption Key (DEK) and the payload sealed
/// under it. The DEK is wrapped with the recipient's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridEnvelope {
    /// Version of envelope format
    pub version: u32,
    /// Recipient key algorithm, e.g. `RSA-3072` or `EC-P256`
    pub key_algorithm: String,
    /// DEK encrypted to the recipient, as ciphertext text
    pub wrapped_key: String,
    /// Payload encrypted under the DEK, as ciphertext text
    pub payload: String,
}

impl HybridEnvelope {
    pub fn to_json(&self) -> CryptoResult<String> {
        serde_json::to_string(self).map_err(|e| CryptoError::MalformedInput(e.to_string()))
    }

    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::MalformedInput(format!("Invalid envelope: {}", e)))
    }
}

/// Encrypt a payload of any size to a public key
///
/// This implements the envelope pattern:
/// 1. Generate a random AES-256-GCM DEK
/// 2. Wrap the DEK with the recipient's RSA-OAEP or ECIES key
/// 3. Encrypt data with the DEK, binding the wrapped key as associated data
///
/// # Errors
///
/// `InvalidKey` for a non-public key, `UnsupportedAlgorithm` for
/// signature-only keys.
pub fn seal(public_key: &KeyMaterial, plaintext: &[u8]) -> CryptoResult<HybridEnvelope> {
    let dek = symmetric::generate_key(SymmetricAlgorithm::AesGcm, 256)?;

    let wrapped_key = asymmetric::encrypt(public_key, dek.as_bytes())?.to_text();
    let payload = symmetric::encrypt_with_aad(&dek, plaintext, wrapped_key.as_bytes())?.to_text();

    debug!(key_algorithm = %public_key.algorithm(), len = plaintext.len(), "Sealed hybrid envelope");

    Ok(HybridEnvelope {
        version: ENVELOPE_VERSION,
        key_algorithm: public_key.algorithm().to_string(),
        wrapped_key,
        payload,
    })
}

/// Decrypt an envelope produced by [`seal`]
///
/// # Errors
///
/// `DecryptionFailed` if the DEK cannot be unwrapped (wrong key or
/// tampering), `AuthenticationFailed` if the payload was modified,
/// `MalformedInput` on an unknown version or unparsable fields.
pub fn open(private_key: &KeyMaterial, envelope: &HybridEnvelope) -> CryptoResult<Vec<u8>> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(CryptoError::MalformedInput(format!(
            "Unsupported envelope version: {}",
            envelope.version
        )));
    }

    let expected: KeyAlgorithm = envelope.key_algorithm.parse()?;
    if expected != private_key.algorithm() {
        return Err(CryptoError::InvalidKey(format!(
            "Envelope is for {} keys, got {}",
            expected,
            private_key.algorithm()
        )));
    }

    let wrapped = Ciphertext::from_text(&envelope.wrapped_key)?;
    let payload = Ciphertext::from_text(&envelope.payload)?;
    if payload.scheme() != CipherScheme::Aes256Gcm {
        return Err(CryptoError::MalformedInput(format!(
            "Unexpected payload scheme: {}",
            payload.scheme()
        )));
    }

    let dek_bytes = Zeroizing::new(asymmetric::decrypt(private_key, &wrapped)?);
    let dek = symmetric::key_from_bytes(KeyAlgorithm::Aes256Gcm, &dek_bytes)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    symmetric::decrypt_with_aad(&dek, &payload, envelope.wrapped_key.as_bytes())
}
