//! Key material shared by every engine
//!
//! A [`KeyMaterial`] is an opaque byte sequence tagged with the algorithm it
//! belongs to and the role it plays. It is immutable after construction and
//! its bytes are zeroized on drop. Engines borrow keys for the duration of a
//! call and never keep them.
//!
//! Byte layouts per algorithm:
//! - AES / ChaCha20 / HMAC: raw secret bytes
//! - RSA: PKCS#1 DER (`RSAPublicKey` / `RSAPrivateKey`)
//! - EC P-256: SEC1, 65-byte uncompressed point / 32-byte scalar
//! - Ed25519: 32-byte verifying key / 32-byte seed

use crate::constant_time::ct_eq;
use crate::encoding::{self, join_frame, split_frame};
use crate::error::{CryptoError, CryptoResult};
use std::fmt;
use std::str::FromStr;
use zeroize::ZeroizeOnDrop;

/// RSA modulus sizes accepted for generation and use
pub const RSA_KEY_SIZES: [usize; 3] = [2048, 3072, 4096];

/// Algorithm tag carried by every key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
    Rsa { bits: usize },
    EcP256,
    Ed25519,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl KeyAlgorithm {
    /// Whether keys of this algorithm are shared secrets
    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            KeyAlgorithm::Aes128Gcm
                | KeyAlgorithm::Aes256Gcm
                | KeyAlgorithm::ChaCha20Poly1305
                | KeyAlgorithm::HmacSha256
                | KeyAlgorithm::HmacSha384
                | KeyAlgorithm::HmacSha512
        )
    }

    /// Exact secret length in bytes, for fixed-size symmetric keys
    pub fn fixed_key_len(self) -> Option<usize> {
        match self {
            KeyAlgorithm::Aes128Gcm => Some(16),
            KeyAlgorithm::Aes256Gcm | KeyAlgorithm::ChaCha20Poly1305 => Some(32),
            _ => None,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Aes128Gcm => f.write_str("AES-128-GCM"),
            KeyAlgorithm::Aes256Gcm => f.write_str("AES-256-GCM"),
            KeyAlgorithm::ChaCha20Poly1305 => f.write_str("CHACHA20-POLY1305"),
            KeyAlgorithm::Rsa { bits } => write!(f, "RSA-{}", bits),
            KeyAlgorithm::EcP256 => f.write_str("EC-P256"),
            KeyAlgorithm::Ed25519 => f.write_str("ED25519"),
            KeyAlgorithm::HmacSha256 => f.write_str("HMAC-SHA256"),
            KeyAlgorithm::HmacSha384 => f.write_str("HMAC-SHA384"),
            KeyAlgorithm::HmacSha512 => f.write_str("HMAC-SHA512"),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_uppercase();
        match normalized.as_str() {
            "AES-128-GCM" | "AES128GCM" => Ok(KeyAlgorithm::Aes128Gcm),
            "AES-256-GCM" | "AES256GCM" => Ok(KeyAlgorithm::Aes256Gcm),
            "CHACHA20-POLY1305" | "CHACHA20POLY1305" => Ok(KeyAlgorithm::ChaCha20Poly1305),
            "EC-P256" | "P256" | "P-256" => Ok(KeyAlgorithm::EcP256),
            "ED25519" => Ok(KeyAlgorithm::Ed25519),
            "HMAC-SHA256" | "HMACSHA256" => Ok(KeyAlgorithm::HmacSha256),
            "HMAC-SHA384" | "HMACSHA384" => Ok(KeyAlgorithm::HmacSha384),
            "HMAC-SHA512" | "HMACSHA512" => Ok(KeyAlgorithm::HmacSha512),
            other => other
                .strip_prefix("RSA-")
                .and_then(|bits| bits.parse::<usize>().ok())
                .filter(|bits| RSA_KEY_SIZES.contains(bits))
                .map(|bits| KeyAlgorithm::Rsa { bits })
                .ok_or_else(|| CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// What a key is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    Symmetric,
    Public,
    Private,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyRole::Symmetric => "symmetric",
            KeyRole::Public => "public",
            KeyRole::Private => "private",
        })
    }
}

impl FromStr for KeyRole {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "symmetric" | "secret" => Ok(KeyRole::Symmetric),
            "public" => Ok(KeyRole::Public),
            "private" => Ok(KeyRole::Private),
            _ => Err(CryptoError::MalformedInput(format!("Unknown key role: {}", s))),
        }
    }
}

/// Tagged, immutable key bytes. Zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct KeyMaterial {
    #[zeroize(skip)]
    algorithm: KeyAlgorithm,
    #[zeroize(skip)]
    role: KeyRole,
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Wrap existing key bytes
    ///
    /// Checks that the role fits the algorithm and that fixed-size
    /// symmetric keys have the right length. Asymmetric encodings are
    /// parsed lazily by the engine that uses them.
    ///
    /// # Errors
    ///
    /// `InvalidKey` on role/algorithm mismatch, wrong length or empty bytes.
    pub fn new(algorithm: KeyAlgorithm, role: KeyRole, bytes: Vec<u8>) -> CryptoResult<Self> {
        let symmetric_role = role == KeyRole::Symmetric;
        if algorithm.is_symmetric() != symmetric_role {
            return Err(CryptoError::InvalidKey(format!(
                "{} keys cannot have the {} role",
                algorithm, role
            )));
        }

        if bytes.is_empty() {
            return Err(CryptoError::InvalidKey("Key bytes are empty".to_string()));
        }

        if let Some(expected) = algorithm.fixed_key_len() {
            if bytes.len() != expected {
                return Err(CryptoError::InvalidKey(format!(
                    "{} requires a {}-byte key, got {} bytes",
                    algorithm,
                    expected,
                    bytes.len()
                )));
            }
        }

        Ok(Self {
            algorithm,
            role,
            bytes,
        })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn role(&self) -> KeyRole {
        self.role
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Fail with `InvalidKey` unless this key has the given role
    pub(crate) fn require_role(&self, role: KeyRole) -> CryptoResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(CryptoError::InvalidKey(format!(
                "Expected a {} key, got a {} {} key",
                role, self.role, self.algorithm
            )))
        }
    }

    /// Transport form: `v1:{ALGORITHM}:{role}:{base64}`
    pub fn to_text(&self) -> String {
        join_frame(
            &self.algorithm.to_string(),
            &[self.role.to_string(), encoding::to_text(&self.bytes)],
        )
    }

    /// # Errors
    ///
    /// `MalformedInput` on a bad frame, `UnsupportedAlgorithm` on an unknown
    /// tag, `InvalidKey` when the decoded key fails [`KeyMaterial::new`].
    pub fn from_text(text: &str) -> CryptoResult<Self> {
        let (tag, fields) = split_frame(text, 2)?;
        let algorithm: KeyAlgorithm = tag.parse()?;
        let role: KeyRole = fields.first().copied().unwrap_or_default().parse()?;
        let bytes = encoding::from_text(fields.get(1).copied().unwrap_or_default())?;
        Self::new(algorithm, role, bytes)
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm
            && self.role == other.role
            && ct_eq(&self.bytes, &other.bytes)
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("role", &self.role)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Public/private halves produced together by a generator
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: KeyMaterial,
    private: KeyMaterial,
}

impl KeyPair {
    pub(crate) fn new(public: KeyMaterial, private: KeyMaterial) -> Self {
        Self { public, private }
    }

    pub fn public_key(&self) -> &KeyMaterial {
        &self.public
    }

    pub fn private_key(&self) -> &KeyMaterial {
        &self.private
    }

    pub fn into_parts(self) -> (KeyMaterial, KeyMaterial) {
        (self.public, self.private)
    }
}
