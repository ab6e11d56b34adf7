//! Password storage hashes
//!
//! Produces self-describing hash strings (PHC for Argon2id, modular crypt
//! for bcrypt) that embed salt and cost, and verifies against them.

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::CostParams;
use argon2::{
    password_hash::{self, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 16;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// bcrypt silently ignores input past this many bytes
pub const BCRYPT_MAX_PASSWORD_LEN: usize = 72;

/// Argon2id cost used by [`hash_password`] (OWASP baseline)
pub const DEFAULT_ARGON2_COST: CostParams = CostParams::Argon2 {
    memory_kib: 19 * 1024,
    iterations: 2,
    parallelism: 1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PasswordAlgorithm {
    #[default]
    Argon2id,
    Bcrypt,
}

impl fmt::Display for PasswordAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordAlgorithm::Argon2id => write!(f, "argon2id"),
            PasswordAlgorithm::Bcrypt => write!(f, "bcrypt"),
        }
    }
}

impl FromStr for PasswordAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "argon2" | "argon2id" => Ok(PasswordAlgorithm::Argon2id),
            "bcrypt" => Ok(PasswordAlgorithm::Bcrypt),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown password hash: {}. Valid options: argon2id, bcrypt",
                s
            ))),
        }
    }
}

/// Hash with default cost for `algorithm`
pub fn hash_password(password: &[u8], algorithm: PasswordAlgorithm) -> CryptoResult<String> {
    match algorithm {
        PasswordAlgorithm::Argon2id => hash_argon2id(password, &DEFAULT_ARGON2_COST),
        PasswordAlgorithm::Bcrypt => hash_bcrypt(password, DEFAULT_BCRYPT_COST),
    }
}

/// Argon2id hash in PHC string format
///
/// The string includes:
/// - Algorithm identifier and version
/// - Parameters (memory, iterations, parallelism)
/// - Salt (base64)
/// - Hash (base64)
///
/// # Errors
///
/// `InvalidCostParameters` unless `cost` is a valid Argon2 variant.
pub fn hash_argon2id(password: &[u8], cost: &CostParams) -> CryptoResult<String> {
    cost.validate_for(crate::kdf::KdfAlgorithm::Argon2id)?;
    let CostParams::Argon2 {
        memory_kib,
        iterations,
        parallelism,
    } = *cost
    else {
        return Err(CryptoError::InvalidCostParameters("Argon2 cost required".to_string()));
    };

    let salt = SaltString::generate(&mut rand::thread_rng());

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| CryptoError::InvalidCostParameters(e.to_string()))?,
    );

    let password_hash = argon2
        .hash_password(password, &salt)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?
        .to_string();

    debug!(%cost, "Hashed password with Argon2id");
    Ok(password_hash)
}

/// bcrypt hash (`$2b$` modular crypt format)
///
/// # Errors
///
/// `InvalidCostParameters` outside cost 4..=16, `MalformedInput` for
/// passwords longer than 72 bytes.
pub fn hash_bcrypt(password: &[u8], cost: u32) -> CryptoResult<String> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(CryptoError::InvalidCostParameters(format!(
            "bcrypt cost must be in {}..={}, got {}",
            MIN_BCRYPT_COST, MAX_BCRYPT_COST, cost
        )));
    }
    if password.len() > BCRYPT_MAX_PASSWORD_LEN {
        return Err(CryptoError::MalformedInput(format!(
            "bcrypt passwords are limited to {} bytes",
            BCRYPT_MAX_PASSWORD_LEN
        )));
    }
    if cost < 10 {
        warn!(cost, "bcrypt cost is below the recommended minimum");
    }

    let hash = bcrypt::hash(password, cost).map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    debug!(cost, "Hashed password with bcrypt");
    Ok(hash)
}

/// Verify a password against a stored hash of either kind
///
/// The algorithm is taken from the hash prefix. A wrong password is
/// `Ok(false)`.
///
/// # Errors
///
/// `MalformedInput` when the hash string cannot be parsed.
pub fn verify_password(password: &[u8], stored: &str) -> CryptoResult<bool> {
    if stored.starts_with("$argon2") {
        let parsed_hash = PasswordHash::new(stored)
            .map_err(|e| CryptoError::MalformedInput(format!("Invalid PHC string: {}", e)))?;
        if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
            return Err(CryptoError::MalformedInput(
                "PHC string is missing its salt or hash".to_string(),
            ));
        }

        match Argon2::default().verify_password(password, &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CryptoError::MalformedInput(format!("Invalid Argon2 hash: {}", e))),
        }
    } else if ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| stored.starts_with(prefix))
    {
        // bcrypt only reads the first 72 bytes; a longer input was never hashed
        if password.len() > BCRYPT_MAX_PASSWORD_LEN {
            return Ok(false);
        }
        bcrypt::verify(password, stored)
            .map_err(|e| CryptoError::MalformedInput(format!("Invalid bcrypt hash: {}", e)))
    } else {
        Err(CryptoError::MalformedInput(
            "Unrecognized password hash format".to_string(),
        ))
    }
}
