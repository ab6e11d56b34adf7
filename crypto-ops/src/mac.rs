//! HMAC message authentication
//!
//! Tags are recomputed and compared in constant time; a mismatch is
//! `Ok(false)`, never an early-exit comparison.

use crate::constant_time::verify_tag;
use crate::encoding::{self, join_frame, split_frame};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyAlgorithm, KeyMaterial, KeyRole};
use hmac::Hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MacAlgorithm {
    #[default]
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl MacAlgorithm {
    /// Tag length in bytes
    pub fn tag_len(self) -> usize {
        match self {
            MacAlgorithm::HmacSha256 => 32,
            MacAlgorithm::HmacSha384 => 48,
            MacAlgorithm::HmacSha512 => 64,
        }
    }

    pub fn key_algorithm(self) -> KeyAlgorithm {
        match self {
            MacAlgorithm::HmacSha256 => KeyAlgorithm::HmacSha256,
            MacAlgorithm::HmacSha384 => KeyAlgorithm::HmacSha384,
            MacAlgorithm::HmacSha512 => KeyAlgorithm::HmacSha512,
        }
    }

    fn for_key(algorithm: KeyAlgorithm) -> CryptoResult<Self> {
        match algorithm {
            KeyAlgorithm::HmacSha256 => Ok(MacAlgorithm::HmacSha256),
            KeyAlgorithm::HmacSha384 => Ok(MacAlgorithm::HmacSha384),
            KeyAlgorithm::HmacSha512 => Ok(MacAlgorithm::HmacSha512),
            other => Err(CryptoError::InvalidKey(format!("{} keys cannot be used for HMAC", other))),
        }
    }
}

impl fmt::Display for MacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key_algorithm(), f)
    }
}

impl FromStr for MacAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HMAC-SHA256" | "HMACSHA256" => Ok(MacAlgorithm::HmacSha256),
            "HMAC-SHA384" | "HMACSHA384" => Ok(MacAlgorithm::HmacSha384),
            "HMAC-SHA512" | "HMACSHA512" => Ok(MacAlgorithm::HmacSha512),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown MAC algorithm: {}. Valid options: hmac-sha256, hmac-sha384, hmac-sha512",
                s
            ))),
        }
    }
}

/// Authentication tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mac {
    algorithm: MacAlgorithm,
    bytes: Vec<u8>,
}

impl Mac {
    pub fn algorithm(&self) -> MacAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Transport form: `v1:{ALGORITHM}:{base64}`
    pub fn to_text(&self) -> String {
        join_frame(&self.algorithm.to_string(), &[encoding::to_text(&self.bytes)])
    }

    /// # Errors
    ///
    /// `MalformedInput` on a bad frame, encoding or tag length,
    /// `UnsupportedAlgorithm` on an unknown tag.
    pub fn from_text(text: &str) -> CryptoResult<Self> {
        let (tag, fields) = split_frame(text, 1)?;
        let algorithm: MacAlgorithm = tag.parse()?;
        let bytes = encoding::from_text(fields.first().copied().unwrap_or_default())?;
        if bytes.len() != algorithm.tag_len() {
            return Err(CryptoError::MalformedInput(format!(
                "{} tags are {} bytes, got {}",
                algorithm,
                algorithm.tag_len(),
                bytes.len()
            )));
        }
        Ok(Self { algorithm, bytes })
    }
}

/// Random key sized to the hash output
pub fn generate_key(algorithm: MacAlgorithm) -> CryptoResult<KeyMaterial> {
    let mut bytes = vec![0u8; algorithm.tag_len()];
    OsRng.fill_bytes(&mut bytes);
    KeyMaterial::new(algorithm.key_algorithm(), KeyRole::Symmetric, bytes)
}

/// Wrap an existing shared secret (any non-empty length) as an HMAC key
///
/// # Errors
///
/// `InvalidKey` on empty bytes.
pub fn key_from_bytes(algorithm: MacAlgorithm, bytes: &[u8]) -> CryptoResult<KeyMaterial> {
    KeyMaterial::new(algorithm.key_algorithm(), KeyRole::Symmetric, bytes.to_vec())
}

/// Compute the tag of `message`
///
/// # Errors
///
/// `InvalidKey` if the key is not an HMAC key.
pub fn tag(key: &KeyMaterial, message: &[u8]) -> CryptoResult<Mac> {
    key.require_role(KeyRole::Symmetric)?;
    let algorithm = MacAlgorithm::for_key(key.algorithm())?;
    debug!(%algorithm, len = message.len(), "Computing MAC");

    let bytes = match algorithm {
        MacAlgorithm::HmacSha256 => hmac_with::<Hmac<Sha256>>(key.as_bytes(), message)?,
        MacAlgorithm::HmacSha384 => hmac_with::<Hmac<Sha384>>(key.as_bytes(), message)?,
        MacAlgorithm::HmacSha512 => hmac_with::<Hmac<Sha512>>(key.as_bytes(), message)?,
    };

    Ok(Mac { algorithm, bytes })
}

/// Recompute and compare in constant time
///
/// A tag of the wrong algorithm or length is `Ok(false)`.
///
/// # Errors
///
/// `InvalidKey` if the key is not an HMAC key.
pub fn verify(key: &KeyMaterial, message: &[u8], mac: &Mac) -> CryptoResult<bool> {
    let computed = tag(key, message)?;
    Ok(computed.algorithm == mac.algorithm && verify_tag(&mac.bytes, &computed.bytes))
}

fn hmac_with<M: hmac::Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
