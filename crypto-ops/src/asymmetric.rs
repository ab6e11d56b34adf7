//! Key-pair generation and public-key encryption
//!
//! - RSA-OAEP with SHA-256 (2048/3072/4096-bit moduli). Plaintext is bounded
//!   by `k - 2*hLen - 2` bytes; larger payloads go through [`crate::hybrid`].
//! - ECIES over P-256: an ephemeral ECDH exchange keyed through HKDF-SHA256
//!   into AES-256-GCM. The ciphertext parameters carry the ephemeral public
//!   key (65 bytes, uncompressed SEC1) followed by the 12-byte nonce.
//! - Ed25519 pairs are generated here too, but are signature-only.
//!
//! Decryption failures are reported as [`CryptoError::DecryptionFailed`]
//! whatever the cause, so a caller cannot tell a wrong key from tampering.

use crate::ciphertext::{CipherScheme, Ciphertext};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf;
use crate::key::{KeyAlgorithm, KeyMaterial, KeyPair, KeyRole, RSA_KEY_SIZES};
use crate::symmetric;
use aes_gcm::Aes256Gcm;
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// SHA-256 output length, the OAEP hash
const OAEP_HASH_LEN: usize = 32;

/// Uncompressed SEC1 P-256 point
const P256_POINT_LEN: usize = 65;

const ECIES_NONCE_LEN: usize = 12;

const ECIES_INFO: &[u8] = b"crypto-ops/ecies-p256/aes-256-gcm/v1";

/// Key-pair families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPairAlgorithm {
    Rsa,
    EcP256,
    Ed25519,
}

impl fmt::Display for KeyPairAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyPairAlgorithm::Rsa => "RSA",
            KeyPairAlgorithm::EcP256 => "EC-P256",
            KeyPairAlgorithm::Ed25519 => "ED25519",
        })
    }
}

impl FromStr for KeyPairAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rsa" => Ok(KeyPairAlgorithm::Rsa),
            "ec" | "ec-p256" | "p256" | "p-256" | "ecdsa" => Ok(KeyPairAlgorithm::EcP256),
            "ed25519" | "eddsa" => Ok(KeyPairAlgorithm::Ed25519),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown key pair algorithm: {}. Valid options: rsa, ec-p256, ed25519",
                s
            ))),
        }
    }
}

/// Generate a key pair
///
/// `strength` is the modulus size for RSA (2048, 3072 or 4096) and must be
/// 256 for EC-P256 and Ed25519. RSA generation is CPU-heavy; callers on a
/// latency-sensitive path should run it on a worker.
///
/// # Errors
///
/// `UnsupportedAlgorithm` for a strength the algorithm does not offer.
pub fn generate_key_pair(algorithm: KeyPairAlgorithm, strength: usize) -> CryptoResult<KeyPair> {
    debug!(%algorithm, strength, "Generating key pair");

    match (algorithm, strength) {
        (KeyPairAlgorithm::Rsa, bits) if RSA_KEY_SIZES.contains(&bits) => generate_rsa(bits),
        (KeyPairAlgorithm::EcP256, 256) => generate_p256(),
        (KeyPairAlgorithm::Ed25519, 256) => generate_ed25519(),
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{} with strength {}",
            algorithm, strength
        ))),
    }
}

fn generate_rsa(bits: usize) -> CryptoResult<KeyPair> {
    let private_key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_der = private_key
        .to_pkcs1_der()
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    let public_der = public_key
        .to_pkcs1_der()
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

    let algorithm = KeyAlgorithm::Rsa { bits };
    Ok(KeyPair::new(
        KeyMaterial::new(algorithm, KeyRole::Public, public_der.as_bytes().to_vec())?,
        KeyMaterial::new(algorithm, KeyRole::Private, private_der.as_bytes().to_vec())?,
    ))
}

fn generate_p256() -> CryptoResult<KeyPair> {
    let secret = p256::SecretKey::random(&mut OsRng);
    let public = secret.public_key().to_encoded_point(false);

    Ok(KeyPair::new(
        KeyMaterial::new(KeyAlgorithm::EcP256, KeyRole::Public, public.as_bytes().to_vec())?,
        KeyMaterial::new(KeyAlgorithm::EcP256, KeyRole::Private, secret.to_bytes().to_vec())?,
    ))
}

fn generate_ed25519() -> CryptoResult<KeyPair> {
    let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);

    Ok(KeyPair::new(
        KeyMaterial::new(
            KeyAlgorithm::Ed25519,
            KeyRole::Public,
            signing_key.verifying_key().to_bytes().to_vec(),
        )?,
        KeyMaterial::new(KeyAlgorithm::Ed25519, KeyRole::Private, signing_key.to_bytes().to_vec())?,
    ))
}

/// Largest plaintext `encrypt` accepts for this key
///
/// `None` means the scheme is already hybrid and has no fixed bound.
///
/// # Errors
///
/// `InvalidKey` if the key cannot be parsed, `UnsupportedAlgorithm` for
/// signature-only keys.
pub fn max_plaintext_len(key: &KeyMaterial) -> CryptoResult<Option<usize>> {
    match key.algorithm() {
        KeyAlgorithm::Rsa { .. } => {
            let modulus_len = match key.role() {
                KeyRole::Private => rsa_private_key(key)?.size(),
                _ => rsa_public_key(key)?.size(),
            };
            Ok(Some(oaep_limit(modulus_len)))
        }
        KeyAlgorithm::EcP256 => Ok(None),
        other => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{} keys do not support encryption",
            other
        ))),
    }
}

fn oaep_limit(modulus_len: usize) -> usize {
    modulus_len.saturating_sub(2 * OAEP_HASH_LEN + 2)
}

/// Encrypt to a public key
///
/// # Errors
///
/// `PlaintextTooLarge` when RSA-OAEP cannot fit the message, `InvalidKey` for
/// a non-public or unparsable key, `UnsupportedAlgorithm` for Ed25519.
pub fn encrypt(public_key: &KeyMaterial, plaintext: &[u8]) -> CryptoResult<Ciphertext> {
    public_key.require_role(KeyRole::Public)?;

    match public_key.algorithm() {
        KeyAlgorithm::Rsa { .. } => {
            let rsa_key = rsa_public_key(public_key)?;
            let max = oaep_limit(rsa_key.size());
            if plaintext.len() > max {
                return Err(CryptoError::PlaintextTooLarge {
                    len: plaintext.len(),
                    max,
                });
            }
            debug!(scheme = %CipherScheme::RsaOaepSha256, len = plaintext.len(), "Encrypting");

            let body = rsa_key
                .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
            Ok(Ciphertext::new(CipherScheme::RsaOaepSha256, Vec::new(), body))
        }
        KeyAlgorithm::EcP256 => {
            let recipient = p256::PublicKey::from_sec1_bytes(public_key.as_bytes())
                .map_err(|_| CryptoError::InvalidKey("Invalid P-256 public key".to_string()))?;
            debug!(scheme = %CipherScheme::EciesP256, len = plaintext.len(), "Encrypting");

            let ephemeral = EphemeralSecret::random(&mut OsRng);
            let ephemeral_public = ephemeral.public_key().to_encoded_point(false);
            let shared = ephemeral.diffie_hellman(&recipient);
            let recipient_point = recipient.to_encoded_point(false);

            let aes_key = ecies_key(
                shared.raw_secret_bytes(),
                ephemeral_public.as_bytes(),
                recipient_point.as_bytes(),
            )?;
            let (nonce, body) = symmetric::seal::<Aes256Gcm>(&aes_key, plaintext, &[])?;

            let mut params = ephemeral_public.as_bytes().to_vec();
            params.extend_from_slice(&nonce);
            Ok(Ciphertext::new(CipherScheme::EciesP256, params, body))
        }
        other => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{} keys do not support encryption",
            other
        ))),
    }
}

/// Decrypt with a private key
///
/// # Errors
///
/// `DecryptionFailed` on tampering or a wrong key, `InvalidKey` for a
/// non-private key or one whose family does not match the ciphertext.
pub fn decrypt(private_key: &KeyMaterial, ciphertext: &Ciphertext) -> CryptoResult<Vec<u8>> {
    private_key.require_role(KeyRole::Private)?;

    match (private_key.algorithm(), ciphertext.scheme()) {
        (KeyAlgorithm::Rsa { .. }, CipherScheme::RsaOaepSha256) => {
            let rsa_key = rsa_private_key(private_key)?;
            debug!(scheme = %CipherScheme::RsaOaepSha256, "Decrypting");

            rsa_key
                .decrypt(Oaep::new::<Sha256>(), ciphertext.body())
                .map_err(|_| CryptoError::DecryptionFailed)
        }
        (KeyAlgorithm::EcP256, CipherScheme::EciesP256) => {
            let secret = p256::SecretKey::from_slice(private_key.as_bytes())
                .map_err(|_| CryptoError::InvalidKey("Invalid P-256 private key".to_string()))?;
            debug!(scheme = %CipherScheme::EciesP256, "Decrypting");

            let params = ciphertext.params();
            if params.len() != P256_POINT_LEN + ECIES_NONCE_LEN {
                return Err(CryptoError::DecryptionFailed);
            }
            let (ephemeral_bytes, nonce) = params.split_at(P256_POINT_LEN);
            let ephemeral = p256::PublicKey::from_sec1_bytes(ephemeral_bytes)
                .map_err(|_| CryptoError::DecryptionFailed)?;

            let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
            let recipient_point = secret.public_key().to_encoded_point(false);
            let aes_key = ecies_key(shared.raw_secret_bytes(), ephemeral_bytes, recipient_point.as_bytes())?;

            symmetric::open::<Aes256Gcm>(&aes_key, nonce, ciphertext.body(), &[])
                .map_err(|_| CryptoError::DecryptionFailed)
        }
        (algorithm, scheme) => Err(CryptoError::InvalidKey(format!(
            "{} keys cannot decrypt {} ciphertexts",
            algorithm, scheme
        ))),
    }
}

/// HKDF over the ECDH secret, salted with both public points
fn ecies_key(shared: &[u8], ephemeral_public: &[u8], recipient_public: &[u8]) -> CryptoResult<zeroize::Zeroizing<Vec<u8>>> {
    let mut salt = Vec::with_capacity(ephemeral_public.len() + recipient_public.len());
    salt.extend_from_slice(ephemeral_public);
    salt.extend_from_slice(recipient_public);
    kdf::hkdf_expand(shared, &salt, ECIES_INFO, 32)
}

pub(crate) fn rsa_public_key(key: &KeyMaterial) -> CryptoResult<RsaPublicKey> {
    let parsed = RsaPublicKey::from_pkcs1_der(key.as_bytes())
        .map_err(|_| CryptoError::InvalidKey("Invalid PKCS#1 RSA public key".to_string()))?;
    check_rsa_size(key, parsed.size())?;
    Ok(parsed)
}

pub(crate) fn rsa_private_key(key: &KeyMaterial) -> CryptoResult<RsaPrivateKey> {
    let parsed = RsaPrivateKey::from_pkcs1_der(key.as_bytes())
        .map_err(|_| CryptoError::InvalidKey("Invalid PKCS#1 RSA private key".to_string()))?;
    check_rsa_size(key, parsed.size())?;
    Ok(parsed)
}

fn check_rsa_size(key: &KeyMaterial, modulus_len: usize) -> CryptoResult<()> {
    match key.algorithm() {
        KeyAlgorithm::Rsa { bits } if bits == modulus_len * 8 => Ok(()),
        other => Err(CryptoError::InvalidKey(format!(
            "Key tagged {} has a {}-bit modulus",
            other,
            modulus_len * 8
        ))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::OnceLock;

    /// RSA generation is slow in debug builds; share one pair per test binary
    pub(crate) fn rsa_2048() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_key_pair(KeyPairAlgorithm::Rsa, 2048).unwrap())
    }

    #[test]
    fn test_rsa_roundtrip() {
        let pair = rsa_2048();
        let ciphertext = encrypt(pair.public_key(), b"Hello, World!").unwrap();
        assert_eq!(ciphertext.scheme(), CipherScheme::RsaOaepSha256);
        assert_eq!(ciphertext.body().len(), 256);
        assert_eq!(decrypt(pair.private_key(), &ciphertext).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_rsa_plaintext_limit() {
        let pair = rsa_2048();
        let max = max_plaintext_len(pair.public_key()).unwrap().unwrap();
        assert_eq!(max, 256 - 66);
        assert_eq!(max_plaintext_len(pair.private_key()).unwrap(), Some(max));

        let at_limit = vec![0xAB; max];
        let ciphertext = encrypt(pair.public_key(), &at_limit).unwrap();
        assert_eq!(decrypt(pair.private_key(), &ciphertext).unwrap(), at_limit);

        let too_large = vec![0xAB; max + 1];
        assert!(matches!(
            encrypt(pair.public_key(), &too_large),
            Err(CryptoError::PlaintextTooLarge { len, max: limit }) if len == max + 1 && limit == max
        ));
    }

    #[test]
    fn test_rsa_tamper_is_decryption_failure() {
        let pair = rsa_2048();
        let ciphertext = encrypt(pair.public_key(), b"secret").unwrap();
        let tampered = ciphertext.with_flipped_bit(100);
        assert!(matches!(decrypt(pair.private_key(), &tampered), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_rsa_nondeterministic() {
        let pair = rsa_2048();
        let first = encrypt(pair.public_key(), b"same").unwrap();
        let second = encrypt(pair.public_key(), b"same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_ecies_roundtrip() {
        let pair = generate_key_pair(KeyPairAlgorithm::EcP256, 256).unwrap();
        assert_eq!(pair.public_key().len(), 65);
        assert_eq!(pair.private_key().len(), 32);

        let ciphertext = encrypt(pair.public_key(), b"Hello, World!").unwrap();
        assert_eq!(ciphertext.params().len(), 77);
        assert_eq!(decrypt(pair.private_key(), &ciphertext).unwrap(), b"Hello, World!");
        assert_eq!(max_plaintext_len(pair.public_key()).unwrap(), None);
    }

    #[test]
    fn test_ecies_wrong_key_and_tamper() {
        let pair = generate_key_pair(KeyPairAlgorithm::EcP256, 256).unwrap();
        let other = generate_key_pair(KeyPairAlgorithm::EcP256, 256).unwrap();
        let ciphertext = encrypt(pair.public_key(), b"secret").unwrap();

        assert!(matches!(decrypt(other.private_key(), &ciphertext), Err(CryptoError::DecryptionFailed)));
        assert!(matches!(
            decrypt(pair.private_key(), &ciphertext.with_flipped_bit(3)),
            Err(CryptoError::DecryptionFailed)
        ));

        let truncated = Ciphertext::new(CipherScheme::EciesP256, vec![4; 10], ciphertext.body().to_vec());
        assert!(matches!(decrypt(pair.private_key(), &truncated), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_role_and_family_checks() {
        let ec = generate_key_pair(KeyPairAlgorithm::EcP256, 256).unwrap();
        let ed = generate_key_pair(KeyPairAlgorithm::Ed25519, 256).unwrap();

        assert!(matches!(encrypt(ec.private_key(), b"x"), Err(CryptoError::InvalidKey(_))));
        assert!(matches!(encrypt(ed.public_key(), b"x"), Err(CryptoError::UnsupportedAlgorithm(_))));

        let rsa_ciphertext = encrypt(rsa_2048().public_key(), b"x").unwrap();
        assert!(matches!(decrypt(ec.private_key(), &rsa_ciphertext), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_unsupported_strength() {
        assert!(matches!(
            generate_key_pair(KeyPairAlgorithm::Rsa, 1024),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
        assert!(generate_key_pair(KeyPairAlgorithm::EcP256, 384).is_err());
    }

    #[test]
    fn test_mislabelled_rsa_key() {
        let pair = rsa_2048();
        let relabelled = KeyMaterial::new(
            KeyAlgorithm::Rsa { bits: 4096 },
            KeyRole::Public,
            pair.public_key().as_bytes().to_vec(),
        )
        .unwrap();
        assert!(matches!(encrypt(&relabelled, b"x"), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_key_pair_algorithm_from_str() {
        assert_eq!("RSA".parse::<KeyPairAlgorithm>().unwrap(), KeyPairAlgorithm::Rsa);
        assert_eq!("ec".parse::<KeyPairAlgorithm>().unwrap(), KeyPairAlgorithm::EcP256);
        assert!("dsa".parse::<KeyPairAlgorithm>().is_err());
    }
}
