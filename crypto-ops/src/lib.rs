//! Stateless cryptographic operations
//!
//! This crate provides request/response cryptographic primitives:
//! - Hashing (SHA-2, SHA-3, BLAKE3; MD5 and SHA-1 for legacy data only)
//! - Authenticated symmetric encryption (AES-GCM, ChaCha20-Poly1305)
//! - Public-key encryption (RSA-OAEP, ECIES over P-256) and hybrid envelopes
//! - Digital signatures (RSA PKCS#1 v1.5 and PSS, ECDSA P-256, Ed25519)
//! - Password-based key derivation (PBKDF2, Argon2id, scrypt) and HKDF
//! - Password storage hashes (Argon2id, bcrypt)
//! - HMAC with constant-time verification
//! - Versioned text transport for keys and every output
//!
//! Every operation takes all of its inputs explicitly. Nothing is cached
//! between calls, so functions are safe to call from any thread.
//!
//! # Example
//!
//! ```
//! use crypto_ops::{kdf, symmetric};
//! use crypto_ops::kdf::{CostParams, KdfAlgorithm};
//! use crypto_ops::key::KeyAlgorithm;
//!
//! let salt = kdf::generate_salt(16);
//! let derived = kdf::derive(
//!     b"password123",
//!     &salt,
//!     KdfAlgorithm::Pbkdf2Sha256,
//!     &CostParams::Pbkdf2 { iterations: 10_000 },
//!     32,
//! )?;
//! let key = derived.to_symmetric_key(KeyAlgorithm::Aes256Gcm)?;
//!
//! let ciphertext = symmetric::encrypt(&key, b"Hello, World!")?;
//! assert_eq!(symmetric::decrypt(&key, &ciphertext)?, b"Hello, World!");
//! # Ok::<(), crypto_ops::CryptoError>(())
//! ```

pub mod asymmetric;
pub mod ciphertext;
pub mod config;
pub mod constant_time;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod hybrid;
pub mod kdf;
pub mod key;
pub mod mac;
pub mod password;
pub mod signature;
pub mod symmetric;

pub use ciphertext::{CipherScheme, Ciphertext};
pub use config::CryptoConfig;
pub use digest::{Digest, DigestAlgorithm};
pub use encoding::TextEncoding;
pub use error::{CryptoError, CryptoResult};
pub use hybrid::HybridEnvelope;
pub use kdf::{CostParams, DerivedKey, KdfAlgorithm};
pub use key::{KeyAlgorithm, KeyMaterial, KeyPair, KeyRole};
pub use mac::{Mac, MacAlgorithm};
pub use signature::{Signature, SignatureScheme};
pub use symmetric::SymmetricAlgorithm;
