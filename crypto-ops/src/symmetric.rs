use crate::ciphertext::{CipherScheme, Ciphertext};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyAlgorithm, KeyMaterial, KeyRole};
use aes_gcm::{
    aead::{generic_array::typenum::Unsigned, Aead, AeadCore, KeyInit, Nonce, OsRng, Payload},
    Aes128Gcm, Aes256Gcm,
};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Authenticated symmetric encryption
///
/// This implementation provides:
/// - AES-128/256 in Galois/Counter Mode and ChaCha20-Poly1305
/// - A fresh random 96-bit nonce per call, carried in the [`Ciphertext`]
/// - Authentication tags for integrity; any mismatch is a hard
///   [`CryptoError::AuthenticationFailed`] with no plaintext returned
/// - No state between calls: every function takes the key explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymmetricAlgorithm {
    #[default]
    AesGcm,
    ChaCha20Poly1305,
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymmetricAlgorithm::AesGcm => "AES-GCM",
            SymmetricAlgorithm::ChaCha20Poly1305 => "CHACHA20-POLY1305",
        })
    }
}

impl FromStr for SymmetricAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aes-gcm" | "aesgcm" | "aes" => Ok(SymmetricAlgorithm::AesGcm),
            "chacha20-poly1305" | "chacha20poly1305" | "chacha20" => {
                Ok(SymmetricAlgorithm::ChaCha20Poly1305)
            }
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown symmetric algorithm: {}. Valid options: aes-gcm, chacha20-poly1305",
                s
            ))),
        }
    }
}

/// Generate a new random key (cryptographically secure)
///
/// # Errors
///
/// `UnsupportedAlgorithm` for bit lengths the algorithm does not define:
/// AES-GCM takes 128 or 256, ChaCha20-Poly1305 takes 256.
pub fn generate_key(algorithm: SymmetricAlgorithm, bit_length: usize) -> CryptoResult<KeyMaterial> {
    let key_algorithm = match (algorithm, bit_length) {
        (SymmetricAlgorithm::AesGcm, 128) => KeyAlgorithm::Aes128Gcm,
        (SymmetricAlgorithm::AesGcm, 256) => KeyAlgorithm::Aes256Gcm,
        (SymmetricAlgorithm::ChaCha20Poly1305, 256) => KeyAlgorithm::ChaCha20Poly1305,
        _ => {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "{} with a {}-bit key",
                algorithm, bit_length
            )))
        }
    };

    let mut key = vec![0u8; bit_length / 8];
    OsRng.fill_bytes(&mut key);
    debug!(algorithm = %key_algorithm, "Generated symmetric key");

    KeyMaterial::new(key_algorithm, KeyRole::Symmetric, key)
}

/// Wrap caller-held bytes (e.g. a derived key) as a symmetric key
///
/// # Errors
///
/// `InvalidKey` when the length does not match the algorithm.
pub fn key_from_bytes(algorithm: KeyAlgorithm, bytes: &[u8]) -> CryptoResult<KeyMaterial> {
    if algorithm.fixed_key_len().is_none() {
        return Err(CryptoError::InvalidKey(format!(
            "{} is not a symmetric cipher",
            algorithm
        )));
    }
    KeyMaterial::new(algorithm, KeyRole::Symmetric, bytes.to_vec())
}

/// Encrypt with a fresh random nonce
///
/// # Errors
///
/// `InvalidKey` if the key is not a symmetric cipher key.
pub fn encrypt(key: &KeyMaterial, plaintext: &[u8]) -> CryptoResult<Ciphertext> {
    encrypt_with_aad(key, plaintext, &[])
}

/// Encrypt, binding `aad` into the authentication tag without encrypting it
///
/// # Errors
///
/// `InvalidKey` if the key is not a symmetric cipher key.
pub fn encrypt_with_aad(key: &KeyMaterial, plaintext: &[u8], aad: &[u8]) -> CryptoResult<Ciphertext> {
    let scheme = scheme_for(key)?;
    debug!(%scheme, len = plaintext.len(), aad_len = aad.len(), "Encrypting");

    let (nonce, body) = match scheme {
        CipherScheme::Aes128Gcm => seal::<Aes128Gcm>(key.as_bytes(), plaintext, aad)?,
        CipherScheme::Aes256Gcm => seal::<Aes256Gcm>(key.as_bytes(), plaintext, aad)?,
        _ => seal::<ChaCha20Poly1305>(key.as_bytes(), plaintext, aad)?,
    };

    Ok(Ciphertext::new(scheme, nonce, body))
}

/// Decrypt and verify
///
/// # Errors
///
/// `InvalidKey` if the key does not match the ciphertext's scheme,
/// `AuthenticationFailed` on any integrity failure.
pub fn decrypt(key: &KeyMaterial, ciphertext: &Ciphertext) -> CryptoResult<Vec<u8>> {
    decrypt_with_aad(key, ciphertext, &[])
}

/// Decrypt and verify, with the same associated data used to encrypt
///
/// # Errors
///
/// `InvalidKey` if the key does not match the ciphertext's scheme,
/// `AuthenticationFailed` on any integrity failure, including wrong `aad`.
pub fn decrypt_with_aad(key: &KeyMaterial, ciphertext: &Ciphertext, aad: &[u8]) -> CryptoResult<Vec<u8>> {
    let scheme = scheme_for(key)?;
    if ciphertext.scheme() != scheme {
        return Err(CryptoError::InvalidKey(format!(
            "Ciphertext was produced with {} but the key is {}",
            ciphertext.scheme(),
            key.algorithm()
        )));
    }
    debug!(%scheme, len = ciphertext.body().len(), "Decrypting");

    let (nonce, body) = (ciphertext.params(), ciphertext.body());
    match scheme {
        CipherScheme::Aes128Gcm => open::<Aes128Gcm>(key.as_bytes(), nonce, body, aad),
        CipherScheme::Aes256Gcm => open::<Aes256Gcm>(key.as_bytes(), nonce, body, aad),
        _ => open::<ChaCha20Poly1305>(key.as_bytes(), nonce, body, aad),
    }
}

fn scheme_for(key: &KeyMaterial) -> CryptoResult<CipherScheme> {
    key.require_role(KeyRole::Symmetric)?;
    match key.algorithm() {
        KeyAlgorithm::Aes128Gcm => Ok(CipherScheme::Aes128Gcm),
        KeyAlgorithm::Aes256Gcm => Ok(CipherScheme::Aes256Gcm),
        KeyAlgorithm::ChaCha20Poly1305 => Ok(CipherScheme::ChaCha20Poly1305),
        other => Err(CryptoError::InvalidKey(format!(
            "{} keys cannot be used for encryption",
            other
        ))),
    }
}

/// Seal under a raw key; returns `(nonce, ciphertext || tag)`
pub(crate) fn seal<C>(key: &[u8], plaintext: &[u8], aad: &[u8]) -> CryptoResult<(Vec<u8>, Vec<u8>)>
where
    C: KeyInit + Aead,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKey("Key length does not match the cipher".to_string()))?;

    let nonce = C::generate_nonce(&mut OsRng);
    let body = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::EncryptionFailed("AEAD seal failed".to_string()))?;

    Ok((nonce.to_vec(), body))
}

/// Open under a raw key. Every failure past key setup is `AuthenticationFailed`.
pub(crate) fn open<C>(key: &[u8], nonce: &[u8], body: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: KeyInit + Aead,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKey("Key length does not match the cipher".to_string()))?;

    if nonce.len() != <C as AeadCore>::NonceSize::USIZE {
        return Err(CryptoError::AuthenticationFailed);
    }
    let nonce = Nonce::<C>::from_slice(nonce);

    cipher
        .decrypt(nonce, Payload { msg: body, aad })
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_keys() -> Vec<KeyMaterial> {
        vec![
            generate_key(SymmetricAlgorithm::AesGcm, 128).unwrap(),
            generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap(),
            generate_key(SymmetricAlgorithm::ChaCha20Poly1305, 256).unwrap(),
        ]
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for key in all_keys() {
            let plaintext = b"Hello, secure world!";
            let ciphertext = encrypt(&key, plaintext).unwrap();
            assert_eq!(decrypt(&key, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_different_nonces() {
        let key = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();

        let first = encrypt(&key, b"same plaintext").unwrap();
        let second = encrypt(&key, b"same plaintext").unwrap();

        // Same plaintext should produce different ciphertexts (different nonces)
        assert_ne!(first.params(), second.params());
        assert_ne!(first.body(), second.body());

        assert_eq!(decrypt(&key, &first).unwrap(), b"same plaintext");
        assert_eq!(decrypt(&key, &second).unwrap(), b"same plaintext");
    }

    #[test]
    fn test_every_flipped_bit_is_rejected() {
        let key = generate_key(SymmetricAlgorithm::AesGcm, 128).unwrap();
        let ciphertext = encrypt(&key, b"authenticated").unwrap();

        for bit in 0..ciphertext.body().len() * 8 {
            let tampered = ciphertext.with_flipped_bit(bit);
            assert!(matches!(
                decrypt(&key, &tampered),
                Err(CryptoError::AuthenticationFailed)
            ));
        }
    }

    #[test]
    fn test_tampered_nonce_is_rejected() {
        let key = generate_key(SymmetricAlgorithm::ChaCha20Poly1305, 256).unwrap();
        let ciphertext = encrypt(&key, b"authenticated").unwrap();

        let mut nonce = ciphertext.params().to_vec();
        nonce[0] ^= 0x01;
        let tampered = Ciphertext::new(ciphertext.scheme(), nonce, ciphertext.body().to_vec());
        assert!(matches!(decrypt(&key, &tampered), Err(CryptoError::AuthenticationFailed)));

        let truncated = Ciphertext::new(ciphertext.scheme(), vec![0; 8], ciphertext.body().to_vec());
        assert!(matches!(decrypt(&key, &truncated), Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn test_wrong_key_is_authentication_failure() {
        let key1 = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();
        let key2 = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();

        let ciphertext = encrypt(&key1, b"secret").unwrap();
        assert!(matches!(decrypt(&key2, &ciphertext), Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn test_scheme_mismatch_is_invalid_key() {
        let aes = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();
        let chacha = generate_key(SymmetricAlgorithm::ChaCha20Poly1305, 256).unwrap();

        let ciphertext = encrypt(&aes, b"secret").unwrap();
        assert!(matches!(decrypt(&chacha, &ciphertext), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_non_cipher_keys_rejected() {
        let hmac_key = KeyMaterial::new(KeyAlgorithm::HmacSha256, KeyRole::Symmetric, vec![1; 32]).unwrap();
        assert!(matches!(encrypt(&hmac_key, b"x"), Err(CryptoError::InvalidKey(_))));
        assert!(key_from_bytes(KeyAlgorithm::HmacSha256, &[1; 32]).is_err());
        assert!(key_from_bytes(KeyAlgorithm::Aes256Gcm, &[1; 16]).is_err());
    }

    #[test]
    fn test_associated_data() {
        let key = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();
        let ciphertext = encrypt_with_aad(&key, b"payload", b"record-42").unwrap();

        assert_eq!(decrypt_with_aad(&key, &ciphertext, b"record-42").unwrap(), b"payload");
        assert!(matches!(
            decrypt_with_aad(&key, &ciphertext, b"record-43"),
            Err(CryptoError::AuthenticationFailed)
        ));
        assert!(matches!(decrypt(&key, &ciphertext), Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn test_unsupported_bit_lengths() {
        assert!(matches!(
            generate_key(SymmetricAlgorithm::AesGcm, 192),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
        assert!(generate_key(SymmetricAlgorithm::ChaCha20Poly1305, 128).is_err());
    }

    #[test]
    fn test_key_generation() {
        let key1 = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();
        let key2 = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();

        assert_ne!(key1, key2);
        assert_eq!(key1.len(), 32);
        assert_eq!(generate_key(SymmetricAlgorithm::AesGcm, 128).unwrap().len(), 16);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();
        let ciphertext = encrypt(&key, b"").unwrap();
        assert_eq!(ciphertext.body().len(), 16);
        assert!(decrypt(&key, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn test_large_data() {
        let key = generate_key(SymmetricAlgorithm::ChaCha20Poly1305, 256).unwrap();

        // Test with 1MB of data
        let plaintext = vec![0x42u8; 1024 * 1024];
        let ciphertext = encrypt(&key, &plaintext).unwrap();
        assert_eq!(decrypt(&key, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_text_transport() {
        let key = generate_key(SymmetricAlgorithm::AesGcm, 256).unwrap();
        let text = encrypt(&key, b"Hello, World!").unwrap().to_text();
        assert!(text.starts_with("v1:AES-256-GCM:"));

        let parsed = Ciphertext::from_text(&text).unwrap();
        assert_eq!(decrypt(&key, &parsed).unwrap(), b"Hello, World!");
    }
}
