use crate::constant_time::ct_eq;
use crate::encoding::{self, join_frame, split_frame};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyAlgorithm, KeyMaterial};
use crate::symmetric;
use argon2::Argon2;
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Salts shorter than this are rejected
pub const MIN_SALT_LEN: usize = 16;

pub const MIN_OUTPUT_LEN: usize = 16;
pub const MAX_OUTPUT_LEN: usize = 1024;

// Upper bounds keep caller-supplied cost from becoming a denial of service.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;
pub const MAX_ARGON2_MEMORY_KIB: u32 = 1024 * 1024; // 1 GiB
pub const MAX_ARGON2_ITERATIONS: u32 = 64;
pub const MAX_ARGON2_PARALLELISM: u32 = 16;
pub const MAX_SCRYPT_LOG_N: u8 = 20;
pub const MAX_SCRYPT_R: u32 = 32;
pub const MAX_SCRYPT_P: u32 = 16;
/// scrypt needs `128 * r * N` bytes; held to the Argon2 memory cap
pub const MAX_SCRYPT_MEMORY_BYTES: u64 = MAX_ARGON2_MEMORY_KIB as u64 * 1024;
pub const MAX_SCRYPT_R_TIMES_P: u32 = 128;

// Below these a warning is logged; the call still succeeds.
const RECOMMENDED_PBKDF2_ITERATIONS: u32 = 100_000;
const RECOMMENDED_ARGON2_MEMORY_KIB: u32 = 19 * 1024;

/// Password-based key derivation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KdfAlgorithm {
    /// PBKDF2-HMAC-SHA256
    Pbkdf2Sha256,
    /// PBKDF2-HMAC-SHA512
    Pbkdf2Sha512,
    /// Argon2id v1.3 (memory-hard)
    Argon2id,
    /// scrypt (memory-hard)
    Scrypt,
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KdfAlgorithm::Pbkdf2Sha256 => "PBKDF2-SHA256",
            KdfAlgorithm::Pbkdf2Sha512 => "PBKDF2-SHA512",
            KdfAlgorithm::Argon2id => "ARGON2ID",
            KdfAlgorithm::Scrypt => "SCRYPT",
        })
    }
}

impl FromStr for KdfAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pbkdf2" | "pbkdf2-sha256" | "pbkdf2withhmacsha256" => Ok(KdfAlgorithm::Pbkdf2Sha256),
            "pbkdf2-sha512" | "pbkdf2withhmacsha512" => Ok(KdfAlgorithm::Pbkdf2Sha512),
            "argon2" | "argon2id" => Ok(KdfAlgorithm::Argon2id),
            "scrypt" => Ok(KdfAlgorithm::Scrypt),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown KDF: {}. Valid options: pbkdf2-sha256, pbkdf2-sha512, argon2id, scrypt",
                s
            ))),
        }
    }
}

/// Algorithm-specific work factors
///
/// The variant must match the [`KdfAlgorithm`] it is used with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostParams {
    Pbkdf2 {
        iterations: u32,
    },
    Argon2 {
        /// Memory cost in KiB
        memory_kib: u32,
        /// Time cost (passes over memory)
        iterations: u32,
        /// Lanes
        parallelism: u32,
    },
    Scrypt {
        /// log2 of the CPU/memory cost N
        log_n: u8,
        /// Block size
        r: u32,
        /// Parallelization
        p: u32,
    },
}

impl CostParams {
    /// Check positivity, the DoS caps and that the variant fits `algorithm`
    ///
    /// # Errors
    ///
    /// `InvalidCostParameters` describing the first violated bound.
    pub fn validate_for(&self, algorithm: KdfAlgorithm) -> CryptoResult<()> {
        match (algorithm, *self) {
            (KdfAlgorithm::Pbkdf2Sha256 | KdfAlgorithm::Pbkdf2Sha512, CostParams::Pbkdf2 { iterations }) => {
                check_range("iterations", iterations, 1, MAX_PBKDF2_ITERATIONS)
            }
            (
                KdfAlgorithm::Argon2id,
                CostParams::Argon2 {
                    memory_kib,
                    iterations,
                    parallelism,
                },
            ) => {
                check_range("memory_kib", memory_kib, 1, MAX_ARGON2_MEMORY_KIB)?;
                check_range("iterations", iterations, 1, MAX_ARGON2_ITERATIONS)?;
                check_range("parallelism", parallelism, 1, MAX_ARGON2_PARALLELISM)?;
                if memory_kib < 8 * parallelism {
                    return Err(CryptoError::InvalidCostParameters(format!(
                        "memory_kib must be at least 8 * parallelism ({})",
                        8 * parallelism
                    )));
                }
                Ok(())
            }
            (KdfAlgorithm::Scrypt, CostParams::Scrypt { log_n, r, p }) => {
                check_range("log_n", u32::from(log_n), 1, u32::from(MAX_SCRYPT_LOG_N))?;
                check_range("r", r, 1, MAX_SCRYPT_R)?;
                check_range("p", p, 1, MAX_SCRYPT_P)?;
                if r * p > MAX_SCRYPT_R_TIMES_P {
                    return Err(CryptoError::InvalidCostParameters(format!(
                        "r * p must be at most {}, got {}",
                        MAX_SCRYPT_R_TIMES_P,
                        r * p
                    )));
                }
                let memory = (128 * u64::from(r)) << log_n;
                if memory > MAX_SCRYPT_MEMORY_BYTES {
                    return Err(CryptoError::InvalidCostParameters(format!(
                        "scrypt would use {} bytes, limit is {}",
                        memory, MAX_SCRYPT_MEMORY_BYTES
                    )));
                }
                Ok(())
            }
            (algorithm, cost) => Err(CryptoError::InvalidCostParameters(format!(
                "{} cannot use {} cost parameters",
                algorithm,
                cost.family()
            ))),
        }
    }

    fn family(&self) -> &'static str {
        match self {
            CostParams::Pbkdf2 { .. } => "PBKDF2",
            CostParams::Argon2 { .. } => "Argon2",
            CostParams::Scrypt { .. } => "scrypt",
        }
    }
}

fn check_range(name: &str, value: u32, min: u32, max: u32) -> CryptoResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CryptoError::InvalidCostParameters(format!(
            "{} must be in {}..={}, got {}",
            name, min, max, value
        )))
    }
}

impl fmt::Display for CostParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostParams::Pbkdf2 { iterations } => write!(f, "i={}", iterations),
            CostParams::Argon2 {
                memory_kib,
                iterations,
                parallelism,
            } => write!(f, "m={},t={},p={}", memory_kib, iterations, parallelism),
            CostParams::Scrypt { log_n, r, p } => write!(f, "ln={},r={},p={}", log_n, r, p),
        }
    }
}

impl FromStr for CostParams {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CryptoError::MalformedInput(format!("Invalid cost parameters: {}", s));

        let mut pairs = Vec::new();
        for part in s.split(',') {
            let (name, value) = part.split_once('=').ok_or_else(malformed)?;
            let value: u32 = value.parse().map_err(|_| malformed())?;
            pairs.push((name, value));
        }
        let lookup = |name: &str| {
            pairs
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
                .ok_or_else(malformed)
        };

        match pairs.len() {
            1 => Ok(CostParams::Pbkdf2 {
                iterations: lookup("i")?,
            }),
            3 if pairs.iter().any(|(n, _)| *n == "ln") => Ok(CostParams::Scrypt {
                log_n: u8::try_from(lookup("ln")?).map_err(|_| malformed())?,
                r: lookup("r")?,
                p: lookup("p")?,
            }),
            3 => Ok(CostParams::Argon2 {
                memory_kib: lookup("m")?,
                iterations: lookup("t")?,
                parallelism: lookup("p")?,
            }),
            _ => Err(malformed()),
        }
    }
}

/// Output of a password-based derivation
///
/// Carries the algorithm, cost and salt alongside the key bytes so that the
/// caller can persist everything needed to re-derive it. The key bytes are
/// zeroized on drop.
#[derive(Clone)]
pub struct DerivedKey {
    algorithm: KdfAlgorithm,
    cost: CostParams,
    salt: Vec<u8>,
    bytes: Zeroizing<Vec<u8>>,
}

impl DerivedKey {
    pub fn algorithm(&self) -> KdfAlgorithm {
        self.algorithm
    }

    pub fn cost(&self) -> CostParams {
        self.cost
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
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

    /// Use the derived bytes as a symmetric cipher key
    ///
    /// # Errors
    ///
    /// `InvalidKey` if the derived length does not fit `algorithm`.
    pub fn to_symmetric_key(&self, algorithm: KeyAlgorithm) -> CryptoResult<KeyMaterial> {
        symmetric::key_from_bytes(algorithm, &self.bytes)
    }

    /// Transport form: `v1:{ALGORITHM}:{cost}:{salt_b64}:{key_b64}`
    pub fn to_text(&self) -> String {
        join_frame(
            &self.algorithm.to_string(),
            &[
                self.cost.to_string(),
                encoding::to_text(&self.salt),
                encoding::to_text(&self.bytes),
            ],
        )
    }

    /// # Errors
    ///
    /// `MalformedInput` on a bad frame, encoding or cost field,
    /// `UnsupportedAlgorithm` on an unknown tag.
    pub fn from_text(text: &str) -> CryptoResult<Self> {
        let (tag, fields) = split_frame(text, 3)?;
        let algorithm: KdfAlgorithm = tag.parse()?;
        let cost: CostParams = fields.first().copied().unwrap_or_default().parse()?;
        let salt = encoding::from_text(fields.get(1).copied().unwrap_or_default())?;
        let bytes = Zeroizing::new(encoding::from_text(fields.get(2).copied().unwrap_or_default())?);
        Ok(Self {
            algorithm,
            cost,
            salt,
            bytes,
        })
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm
            && self.cost == other.cost
            && self.salt == other.salt
            && ct_eq(&self.bytes, &other.bytes)
    }
}

impl Eq for DerivedKey {}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("algorithm", &self.algorithm)
            .field("cost", &self.cost)
            .field("salt_len", &self.salt.len())
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Derive key material from a password
///
/// # Arguments
/// * `password` - The password to derive from
/// * `salt` - Caller-supplied salt, unique per credential, at least 16 bytes
/// * `algorithm` - Which KDF to run
/// * `cost` - Work factors; the variant must match `algorithm`
/// * `output_len` - Length of derived key in bytes
///
/// # Example
/// ```
/// use crypto_ops::kdf::{self, CostParams, KdfAlgorithm};
///
/// let salt = kdf::generate_salt(16);
/// let key = kdf::derive(
///     b"password123",
///     &salt,
///     KdfAlgorithm::Pbkdf2Sha256,
///     &CostParams::Pbkdf2 { iterations: 10_000 },
///     32,
/// ).unwrap();
/// assert_eq!(key.len(), 32);
/// ```
///
/// # Errors
///
/// `WeakSalt`, `InvalidCostParameters` or `InvalidOutputLength` when an
/// input is out of bounds.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    algorithm: KdfAlgorithm,
    cost: &CostParams,
    output_len: usize,
) -> CryptoResult<DerivedKey> {
    validate_request(salt, algorithm, cost, output_len)?;

    let started = Instant::now();
    let mut output = Zeroizing::new(vec![0u8; output_len]);
    compute(password, salt, algorithm, cost, &mut output)?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    debug!(%algorithm, %cost, output_len, elapsed_ms, "Derived key");

    Ok(DerivedKey {
        algorithm,
        cost: *cost,
        salt: salt.to_vec(),
        bytes: output,
    })
}

/// [`derive`] with a deadline
///
/// The derivation runs on a worker thread. If it has not finished when
/// `timeout` elapses the call returns `DerivationTimeout`; the worker is
/// left to finish (its run time is bounded by the cost caps) and its result
/// is zeroized and discarded.
///
/// # Errors
///
/// Everything [`derive`] returns, plus `DerivationTimeout`.
pub fn derive_with_timeout(
    password: &[u8],
    salt: &[u8],
    algorithm: KdfAlgorithm,
    cost: &CostParams,
    output_len: usize,
    timeout: Duration,
) -> CryptoResult<DerivedKey> {
    validate_request(salt, algorithm, cost, output_len)?;

    let password = Zeroizing::new(password.to_vec());
    let salt = salt.to_vec();
    let cost = *cost;
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("kdf-worker".to_string())
        .spawn(move || {
            // The receiver is gone after a timeout; nothing to report then.
            let _ = tx.send(derive(&password, &salt, algorithm, &cost, output_len));
        })
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("Failed to spawn worker: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(%algorithm, %cost, ?timeout, "Key derivation exceeded its deadline");
            Err(CryptoError::DerivationTimeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(CryptoError::KeyDerivationFailed(
            "Worker exited without a result".to_string(),
        )),
    }
}

fn validate_request(salt: &[u8], algorithm: KdfAlgorithm, cost: &CostParams, output_len: usize) -> CryptoResult<()> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::WeakSalt {
            got: salt.len(),
            min: MIN_SALT_LEN,
        });
    }

    if !(MIN_OUTPUT_LEN..=MAX_OUTPUT_LEN).contains(&output_len) {
        return Err(CryptoError::InvalidOutputLength {
            got: output_len,
            min: MIN_OUTPUT_LEN,
            max: MAX_OUTPUT_LEN,
        });
    }

    cost.validate_for(algorithm)?;

    match *cost {
        CostParams::Pbkdf2 { iterations } if iterations < RECOMMENDED_PBKDF2_ITERATIONS => {
            warn!(iterations, "PBKDF2 iteration count is below the recommended minimum");
        }
        CostParams::Argon2 { memory_kib, .. } if memory_kib < RECOMMENDED_ARGON2_MEMORY_KIB => {
            warn!(memory_kib, "Argon2 memory cost is below the recommended minimum");
        }
        _ => {}
    }

    Ok(())
}

/// Run the KDF into `output`. Bounds are the caller's job.
fn compute(
    password: &[u8],
    salt: &[u8],
    algorithm: KdfAlgorithm,
    cost: &CostParams,
    output: &mut [u8],
) -> CryptoResult<()> {
    match (algorithm, *cost) {
        (KdfAlgorithm::Pbkdf2Sha256, CostParams::Pbkdf2 { iterations }) => {
            pbkdf2_hmac::<Sha256>(password, salt, iterations, output);
            Ok(())
        }
        (KdfAlgorithm::Pbkdf2Sha512, CostParams::Pbkdf2 { iterations }) => {
            pbkdf2_hmac::<Sha512>(password, salt, iterations, output);
            Ok(())
        }
        (
            KdfAlgorithm::Argon2id,
            CostParams::Argon2 {
                memory_kib,
                iterations,
                parallelism,
            },
        ) => {
            let params = argon2::Params::new(memory_kib, iterations, parallelism, Some(output.len()))
                .map_err(|e| CryptoError::InvalidCostParameters(e.to_string()))?;
            Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
                .hash_password_into(password, salt, output)
                .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))
        }
        (KdfAlgorithm::Scrypt, CostParams::Scrypt { log_n, r, p }) => {
            // The length argument only matters for PHC output; raw output
            // length is taken from the buffer.
            let params = scrypt::Params::new(log_n, r, p, 32)
                .map_err(|e| CryptoError::InvalidCostParameters(e.to_string()))?;
            scrypt::scrypt(password, salt, &params, output)
                .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))
        }
        (algorithm, _) => Err(CryptoError::InvalidCostParameters(format!(
            "Cost parameters do not match {}",
            algorithm
        ))),
    }
}

/// HKDF (HMAC-based Key Derivation Function) - RFC 5869
///
/// Expands existing high-entropy key material; not for passwords.
///
/// # Arguments
/// * `ikm` - Input key material (the master key)
/// * `salt` - Optional salt value (can be empty)
/// * `info` - Optional context and application specific information
/// * `length` - Length of output key material
///
/// # Errors
///
/// `InvalidOutputLength` past 255 * 32 bytes.
pub fn hkdf_expand(ikm: &[u8], salt: &[u8], info: &[u8], length: usize) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new(vec![0u8; length]);

    hkdf.expand(info, &mut okm)
        .map_err(|_| CryptoError::InvalidOutputLength {
            got: length,
            min: 1,
            max: 255 * 32,
        })?;

    Ok(okm)
}

/// Generate a cryptographically secure random salt
pub fn generate_salt(length: usize) -> Vec<u8> {
    let mut salt = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &[u8] = b"0123456789abcdef";

    fn pbkdf2(iterations: u32) -> CostParams {
        CostParams::Pbkdf2 { iterations }
    }

    fn light_argon2() -> CostParams {
        CostParams::Argon2 {
            memory_kib: 8192,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_pbkdf2_known_answer() {
        // RFC 7914 section 11
        let mut out = [0u8; 64];
        compute(b"passwd", b"salt", KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1), &mut out).unwrap();
        assert!(hex::encode(out).starts_with("55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"));
    }

    #[test]
    fn test_scrypt_known_answer() {
        // RFC 7914 section 12
        let mut out = [0u8; 64];
        let cost = CostParams::Scrypt { log_n: 10, r: 8, p: 16 };
        compute(b"password", b"NaCl", KdfAlgorithm::Scrypt, &cost, &mut out).unwrap();
        assert!(hex::encode(out).starts_with("fdbabe1c9d3472007856e7190d01e9fe7c6ad7cbc8237830e77376634b373162"));
    }

    #[test]
    fn test_pbkdf2_derivation() {
        let key1 = derive(b"my_secure_password", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 32).unwrap();
        let key2 = derive(b"my_secure_password", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 32).unwrap();

        // Same password and salt should produce same key
        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 32);
    }

    #[test]
    fn test_every_input_changes_output() {
        let base = derive(b"password", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 32).unwrap();

        let other_password = derive(b"passwore", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 32).unwrap();
        let other_salt = derive(b"password", b"0123456789abcdeg", KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 32).unwrap();
        let other_algorithm = derive(b"password", SALT, KdfAlgorithm::Pbkdf2Sha512, &pbkdf2(1000), 32).unwrap();
        let other_cost = derive(b"password", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1001), 32).unwrap();
        let other_len = derive(b"password", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 48).unwrap();

        for other in [&other_password, &other_salt, &other_algorithm, &other_cost] {
            assert_ne!(base.as_bytes(), other.as_bytes());
        }
        assert_ne!(base.as_bytes(), other_len.as_bytes());
    }

    #[test]
    fn test_argon2_derive_key() {
        let key1 = derive(b"my_password", SALT, KdfAlgorithm::Argon2id, &light_argon2(), 32).unwrap();
        let key2 = derive(b"my_password", SALT, KdfAlgorithm::Argon2id, &light_argon2(), 32).unwrap();
        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 32);
    }

    #[test]
    fn test_weak_salt() {
        let result = derive(b"password", b"salt123", KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 32);
        assert!(matches!(result, Err(CryptoError::WeakSalt { got: 7, min: 16 })));
    }

    #[test]
    fn test_cost_bounds() {
        let too_many = derive(b"p", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(MAX_PBKDF2_ITERATIONS + 1), 32);
        assert!(matches!(too_many, Err(CryptoError::InvalidCostParameters(_))));

        let zero = derive(b"p", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(0), 32);
        assert!(matches!(zero, Err(CryptoError::InvalidCostParameters(_))));

        let huge_memory = CostParams::Argon2 {
            memory_kib: MAX_ARGON2_MEMORY_KIB + 1,
            iterations: 1,
            parallelism: 1,
        };
        assert!(huge_memory.validate_for(KdfAlgorithm::Argon2id).is_err());

        let starved = CostParams::Argon2 {
            memory_kib: 16,
            iterations: 1,
            parallelism: 4,
        };
        assert!(starved.validate_for(KdfAlgorithm::Argon2id).is_err());

        let huge_n = CostParams::Scrypt { log_n: 21, r: 8, p: 1 };
        assert!(huge_n.validate_for(KdfAlgorithm::Scrypt).is_err());
        let zero_r = CostParams::Scrypt { log_n: 10, r: 0, p: 1 };
        assert!(zero_r.validate_for(KdfAlgorithm::Scrypt).is_err());
    }

    #[test]
    fn test_scrypt_combined_bounds() {
        // Each field is within its own cap, but 128 * 32 * 2^20 is 4 GiB
        let widest = CostParams::Scrypt { log_n: 20, r: 32, p: 16 };
        assert!(matches!(
            widest.validate_for(KdfAlgorithm::Scrypt),
            Err(CryptoError::InvalidCostParameters(_))
        ));

        let two_gib = CostParams::Scrypt { log_n: 20, r: 16, p: 1 };
        assert!(two_gib.validate_for(KdfAlgorithm::Scrypt).is_err());

        let wide_lanes = CostParams::Scrypt { log_n: 10, r: 32, p: 8 };
        assert!(wide_lanes.validate_for(KdfAlgorithm::Scrypt).is_err());

        // Exactly 1 GiB, and the RFC 7914 vector, are accepted
        let at_limit = CostParams::Scrypt { log_n: 20, r: 8, p: 1 };
        assert!(at_limit.validate_for(KdfAlgorithm::Scrypt).is_ok());
        let rfc = CostParams::Scrypt { log_n: 10, r: 8, p: 16 };
        assert!(rfc.validate_for(KdfAlgorithm::Scrypt).is_ok());
    }

    #[test]
    fn test_cost_family_must_match() {
        let result = derive(b"p", SALT, KdfAlgorithm::Argon2id, &pbkdf2(1000), 32);
        assert!(matches!(result, Err(CryptoError::InvalidCostParameters(_))));
    }

    #[test]
    fn test_output_length_bounds() {
        assert!(matches!(
            derive(b"p", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 8),
            Err(CryptoError::InvalidOutputLength { got: 8, .. })
        ));
        assert!(derive(b"p", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), MAX_OUTPUT_LEN + 1).is_err());
    }

    #[test]
    fn test_timeout_fires() {
        let result = derive_with_timeout(
            b"password",
            SALT,
            KdfAlgorithm::Pbkdf2Sha256,
            &pbkdf2(5_000_000),
            32,
            Duration::from_millis(1),
        );
        assert!(matches!(result, Err(CryptoError::DerivationTimeout(_))));
    }

    #[test]
    fn test_timeout_not_reached() {
        let direct = derive(b"password", SALT, KdfAlgorithm::Pbkdf2Sha256, &pbkdf2(1000), 32).unwrap();
        let bounded = derive_with_timeout(
            b"password",
            SALT,
            KdfAlgorithm::Pbkdf2Sha256,
            &pbkdf2(1000),
            32,
            Duration::from_secs(60),
        )
        .unwrap();
        assert_eq!(direct, bounded);
    }

    #[test]
    fn test_timeout_still_validates_first() {
        let result = derive_with_timeout(
            b"password",
            b"short",
            KdfAlgorithm::Pbkdf2Sha256,
            &pbkdf2(1000),
            32,
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(CryptoError::WeakSalt { .. })));
    }

    #[test]
    fn test_cost_text_round_trip() {
        for cost in [
            pbkdf2(600_000),
            light_argon2(),
            CostParams::Scrypt { log_n: 17, r: 8, p: 1 },
        ] {
            assert_eq!(cost.to_string().parse::<CostParams>().unwrap(), cost);
        }
        assert!("i=abc".parse::<CostParams>().is_err());
        assert!("x=1,y=2".parse::<CostParams>().is_err());
    }

    #[test]
    fn test_derived_key_text_round_trip() {
        let key = derive(b"password", SALT, KdfAlgorithm::Argon2id, &light_argon2(), 32).unwrap();
        let text = key.to_text();
        assert!(text.starts_with("v1:ARGON2ID:m=8192,t=1,p=1:"));
        assert_eq!(DerivedKey::from_text(&text).unwrap(), key);
        assert!(!format!("{:?}", key).contains("bytes"));
    }

    #[test]
    fn test_hkdf_derivation() {
        let key1 = hkdf_expand(b"master_secret_key_material", b"random_salt", b"context1", 32).unwrap();
        let key2 = hkdf_expand(b"master_secret_key_material", b"random_salt", b"context1", 32).unwrap();
        let key3 = hkdf_expand(b"master_secret_key_material", b"random_salt", b"context2", 32).unwrap();

        assert_eq!(*key1, *key2);
        assert_ne!(*key1, *key3);
        assert!(hkdf_expand(b"ikm", b"", b"", 255 * 32 + 1).is_err());
    }

    #[test]
    fn test_salt_generation() {
        let salt1 = generate_salt(32);
        let salt2 = generate_salt(32);

        // Salts should be unique
        assert_ne!(salt1, salt2);
        assert_eq!(salt1.len(), 32);
    }
}
