//! Self-describing ciphertext
//!
//! Everything needed to decrypt except the key travels with the ciphertext:
//! the scheme tag, the per-message parameters (nonce, ephemeral public key)
//! and the sealed body including its authentication tag.

use crate::encoding::{self, join_frame, split_frame};
use crate::error::{CryptoError, CryptoResult};
use std::fmt;
use std::str::FromStr;

/// Encryption scheme that produced a ciphertext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherScheme {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
    /// RSA with OAEP padding, SHA-256 for hash and MGF1
    RsaOaepSha256,
    /// Ephemeral-static P-256 ECDH, HKDF-SHA256, AES-256-GCM
    EciesP256,
}

impl fmt::Display for CipherScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CipherScheme::Aes128Gcm => "AES-128-GCM",
            CipherScheme::Aes256Gcm => "AES-256-GCM",
            CipherScheme::ChaCha20Poly1305 => "CHACHA20-POLY1305",
            CipherScheme::RsaOaepSha256 => "RSA-OAEP-SHA256",
            CipherScheme::EciesP256 => "ECIES-P256",
        })
    }
}

impl FromStr for CipherScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AES-128-GCM" => Ok(CipherScheme::Aes128Gcm),
            "AES-256-GCM" => Ok(CipherScheme::Aes256Gcm),
            "CHACHA20-POLY1305" => Ok(CipherScheme::ChaCha20Poly1305),
            "RSA-OAEP-SHA256" => Ok(CipherScheme::RsaOaepSha256),
            "ECIES-P256" => Ok(CipherScheme::EciesP256),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown cipher scheme: {}",
                s
            ))),
        }
    }
}

/// Ciphertext plus the parameters required to decrypt it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    scheme: CipherScheme,
    params: Vec<u8>,
    body: Vec<u8>,
}

impl Ciphertext {
    pub(crate) fn new(scheme: CipherScheme, params: Vec<u8>, body: Vec<u8>) -> Self {
        Self {
            scheme,
            params,
            body,
        }
    }

    pub fn scheme(&self) -> CipherScheme {
        self.scheme
    }

    /// Per-message parameters: the nonce for AEAD schemes, the ephemeral
    /// public key followed by the nonce for ECIES, empty for RSA-OAEP
    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Sealed bytes, including any authentication tag
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Transport form: `v1:{SCHEME}:{params_b64}:{body_b64}`
    pub fn to_text(&self) -> String {
        join_frame(
            &self.scheme.to_string(),
            &[encoding::to_text(&self.params), encoding::to_text(&self.body)],
        )
    }

    /// # Errors
    ///
    /// `MalformedInput` on a bad frame or encoding, `UnsupportedAlgorithm`
    /// on an unknown scheme tag.
    pub fn from_text(text: &str) -> CryptoResult<Self> {
        let (tag, fields) = split_frame(text, 2)?;
        let scheme: CipherScheme = tag.parse()?;
        let params = encoding::from_text(fields.first().copied().unwrap_or_default())?;
        let body = encoding::from_text(fields.get(1).copied().unwrap_or_default())?;
        Ok(Self::new(scheme, params, body))
    }

    /// Copy with one bit of the body flipped, for tamper tests
    #[cfg(test)]
    pub(crate) fn with_flipped_bit(&self, index: usize) -> Self {
        let mut tampered = self.clone();
        if let Some(byte) = tampered.body.get_mut(index / 8) {
            *byte ^= 1 << (index % 8);
        }
        tampered
    }
}
