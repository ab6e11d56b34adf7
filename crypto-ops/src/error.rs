use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Integrity tag mismatch. Carries no detail on purpose.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Public-key decryption failure: wrong key and tampering look the same.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Plaintext too large: {len} bytes exceeds the {max} byte limit")]
    PlaintextTooLarge { len: usize, max: usize },

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Invalid cost parameters: {0}")]
    InvalidCostParameters(String),

    #[error("Weak salt: got {got} bytes, at least {min} required")]
    WeakSalt { got: usize, min: usize },

    #[error("Key derivation timed out after {0:?}")]
    DerivationTimeout(Duration),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid output length: {got} bytes, expected {min}..={max}")]
    InvalidOutputLength { got: usize, min: usize, max: usize },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
