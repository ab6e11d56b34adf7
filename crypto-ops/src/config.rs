//! Default algorithm and cost configuration
//!
//! Holds the safe defaults callers pass to the engines:
//! - Symmetric cipher, digest and MAC algorithms
//! - RSA modulus size
//! - KDF choice and work factors
//! - Derivation deadline
//!
//! Engines never read this; it is a convenience for callers and the CLI.

use crate::digest::DigestAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{self, CostParams, KdfAlgorithm};
use crate::key::{KeyAlgorithm, RSA_KEY_SIZES};
use crate::mac::MacAlgorithm;
use crate::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::symmetric::SymmetricAlgorithm;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoConfig {
    /// Symmetric cipher key type (AES-128-GCM, AES-256-GCM, CHACHA20-POLY1305)
    pub symmetric_key: KeyAlgorithm,

    pub digest_algorithm: DigestAlgorithm,

    pub mac_algorithm: MacAlgorithm,

    /// RSA modulus size for new key pairs
    pub rsa_bits: usize,

    /// KDF for password-based keys
    pub kdf_algorithm: KdfAlgorithm,

    pub pbkdf2_iterations: u32,

    /// Argon2id work factors
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,

    /// scrypt work factors
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,

    pub bcrypt_cost: u32,

    /// Deadline for `derive_with_timeout`
    pub derive_timeout: Duration,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            symmetric_key: KeyAlgorithm::Aes256Gcm,
            digest_algorithm: DigestAlgorithm::Sha256,
            mac_algorithm: MacAlgorithm::HmacSha256,
            rsa_bits: 3072,
            kdf_algorithm: KdfAlgorithm::Argon2id,
            pbkdf2_iterations: 600_000,
            argon2_memory_kib: 19 * 1024, // 19 MiB
            argon2_iterations: 2,
            argon2_parallelism: 1,
            scrypt_log_n: 17,
            scrypt_r: 8,
            scrypt_p: 1,
            bcrypt_cost: 12,
            derive_timeout: Duration::from_secs(30),
        }
    }
}

impl CryptoConfig {
    /// Create a configuration from environment variables
    pub fn from_env() -> CryptoResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup` on the defaults, then validate
    pub fn from_lookup<F>(lookup: F) -> CryptoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // === Algorithms ===
        set(&lookup, "CRYPTO_SYMMETRIC_ALGORITHM", &mut config.symmetric_key)?;
        set(&lookup, "CRYPTO_DIGEST_ALGORITHM", &mut config.digest_algorithm)?;
        set(&lookup, "CRYPTO_MAC_ALGORITHM", &mut config.mac_algorithm)?;
        set(&lookup, "CRYPTO_RSA_BITS", &mut config.rsa_bits)?;

        // === Key Derivation ===
        set(&lookup, "CRYPTO_KDF_ALGORITHM", &mut config.kdf_algorithm)?;
        set(&lookup, "CRYPTO_PBKDF2_ITERATIONS", &mut config.pbkdf2_iterations)?;
        set(&lookup, "CRYPTO_ARGON2_MEMORY_KIB", &mut config.argon2_memory_kib)?;
        set(&lookup, "CRYPTO_ARGON2_ITERATIONS", &mut config.argon2_iterations)?;
        set(&lookup, "CRYPTO_ARGON2_PARALLELISM", &mut config.argon2_parallelism)?;
        set(&lookup, "CRYPTO_SCRYPT_LOG_N", &mut config.scrypt_log_n)?;
        set(&lookup, "CRYPTO_SCRYPT_R", &mut config.scrypt_r)?;
        set(&lookup, "CRYPTO_SCRYPT_P", &mut config.scrypt_p)?;
        set(&lookup, "CRYPTO_BCRYPT_COST", &mut config.bcrypt_cost)?;

        let mut timeout_secs = config.derive_timeout.as_secs();
        set(&lookup, "CRYPTO_DERIVE_TIMEOUT_SECS", &mut timeout_secs)?;
        config.derive_timeout = Duration::from_secs(timeout_secs);

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CryptoResult<()> {
        if self.symmetric().is_none() {
            return Err(CryptoError::Configuration(format!(
                "{} is not a symmetric cipher",
                self.symmetric_key
            )));
        }

        if self.digest_algorithm.is_legacy() {
            return Err(CryptoError::Configuration(format!(
                "{} is not collision resistant and cannot be the default digest",
                self.digest_algorithm
            )));
        }

        if !RSA_KEY_SIZES.contains(&self.rsa_bits) {
            return Err(CryptoError::Configuration(format!(
                "RSA key size must be one of {:?}, got {}",
                RSA_KEY_SIZES, self.rsa_bits
            )));
        }

        for (algorithm, cost) in [
            (KdfAlgorithm::Pbkdf2Sha256, self.pbkdf2_cost()),
            (KdfAlgorithm::Argon2id, self.argon2_cost()),
            (KdfAlgorithm::Scrypt, self.scrypt_cost()),
        ] {
            cost.validate_for(algorithm)
                .map_err(|e| CryptoError::Configuration(format!("{}: {}", algorithm, e)))?;
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(CryptoError::Configuration(format!(
                "bcrypt cost must be in {}..={}, got {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST, self.bcrypt_cost
            )));
        }

        if self.derive_timeout.is_zero() {
            return Err(CryptoError::Configuration(
                "Derivation timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Symmetric algorithm and key size in bits
    pub fn symmetric(&self) -> Option<(SymmetricAlgorithm, usize)> {
        match self.symmetric_key {
            KeyAlgorithm::Aes128Gcm => Some((SymmetricAlgorithm::AesGcm, 128)),
            KeyAlgorithm::Aes256Gcm => Some((SymmetricAlgorithm::AesGcm, 256)),
            KeyAlgorithm::ChaCha20Poly1305 => Some((SymmetricAlgorithm::ChaCha20Poly1305, 256)),
            _ => None,
        }
    }

    pub fn pbkdf2_cost(&self) -> CostParams {
        CostParams::Pbkdf2 {
            iterations: self.pbkdf2_iterations,
        }
    }

    pub fn argon2_cost(&self) -> CostParams {
        CostParams::Argon2 {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    pub fn scrypt_cost(&self) -> CostParams {
        CostParams::Scrypt {
            log_n: self.scrypt_log_n,
            r: self.scrypt_r,
            p: self.scrypt_p,
        }
    }

    /// Cost parameters matching `kdf_algorithm`
    pub fn kdf_cost(&self) -> CostParams {
        self.cost_for(self.kdf_algorithm)
    }

    pub fn cost_for(&self, algorithm: KdfAlgorithm) -> CostParams {
        match algorithm {
            KdfAlgorithm::Pbkdf2Sha256 | KdfAlgorithm::Pbkdf2Sha512 => self.pbkdf2_cost(),
            KdfAlgorithm::Argon2id => self.argon2_cost(),
            KdfAlgorithm::Scrypt => self.scrypt_cost(),
        }
    }

    /// Salt length used for new derivations
    pub fn salt_len(&self) -> usize {
        kdf::MIN_SALT_LEN
    }
}

fn set<F, T>(lookup: &F, name: &str, target: &mut T) -> CryptoResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| CryptoError::Configuration(format!("Invalid {}: {}", name, e)))?;
    }
    Ok(())
}
