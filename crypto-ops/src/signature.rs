//! Digital signatures
//!
//! Verification is a predicate: a signature that parses but does not match
//! yields `Ok(false)`. `MalformedSignature` is reserved for bytes that cannot
//! be read as the scheme's layout (wrong length, out-of-range scalars).

use crate::asymmetric::{rsa_private_key, rsa_public_key};
use crate::encoding::{self, join_frame, split_frame};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyAlgorithm, KeyMaterial, KeyRole};
use p256::ecdsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{pkcs1v15, pss};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use zeroize::Zeroizing;

const ECDSA_P256_SIGNATURE_LEN: usize = 64;
const ED25519_SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    /// RSASSA-PKCS1-v1_5 with SHA-256 (deterministic)
    RsaPkcs1Sha256,
    /// RSASSA-PSS with SHA-256, salt length = hash length (randomized)
    RsaPssSha256,
    /// ECDSA over P-256 with SHA-256, fixed `r || s` encoding (randomized)
    EcdsaP256Sha256,
    /// Pure Ed25519 (deterministic)
    Ed25519,
}

impl SignatureScheme {
    /// Scheme used by [`sign`] for keys of `algorithm`
    pub fn default_for(algorithm: KeyAlgorithm) -> Option<Self> {
        match algorithm {
            KeyAlgorithm::Rsa { .. } => Some(SignatureScheme::RsaPkcs1Sha256),
            KeyAlgorithm::EcP256 => Some(SignatureScheme::EcdsaP256Sha256),
            KeyAlgorithm::Ed25519 => Some(SignatureScheme::Ed25519),
            _ => None,
        }
    }

    /// Whether signing twice yields identical bytes
    pub fn is_deterministic(self) -> bool {
        matches!(self, SignatureScheme::RsaPkcs1Sha256 | SignatureScheme::Ed25519)
    }

    fn accepts(self, algorithm: KeyAlgorithm) -> bool {
        matches!(
            (self, algorithm),
            (
                SignatureScheme::RsaPkcs1Sha256 | SignatureScheme::RsaPssSha256,
                KeyAlgorithm::Rsa { .. }
            ) | (SignatureScheme::EcdsaP256Sha256, KeyAlgorithm::EcP256)
                | (SignatureScheme::Ed25519, KeyAlgorithm::Ed25519)
        )
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignatureScheme::RsaPkcs1Sha256 => "RSA-PKCS1-SHA256",
            SignatureScheme::RsaPssSha256 => "RSA-PSS-SHA256",
            SignatureScheme::EcdsaP256Sha256 => "ECDSA-P256-SHA256",
            SignatureScheme::Ed25519 => "ED25519",
        })
    }
}

impl FromStr for SignatureScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RSA-PKCS1-SHA256" | "SHA256WITHRSA" => Ok(SignatureScheme::RsaPkcs1Sha256),
            "RSA-PSS-SHA256" | "PSS" => Ok(SignatureScheme::RsaPssSha256),
            "ECDSA-P256-SHA256" | "SHA256WITHECDSA" | "ECDSA" => Ok(SignatureScheme::EcdsaP256Sha256),
            "ED25519" => Ok(SignatureScheme::Ed25519),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown signature scheme: {}",
                s
            ))),
        }
    }
}

/// Signature bytes tagged with the scheme that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    scheme: SignatureScheme,
    bytes: Vec<u8>,
}

impl Signature {
    /// Wrap raw signature bytes received from elsewhere
    ///
    /// Layout is checked at verification time, against the key.
    pub fn from_bytes(scheme: SignatureScheme, bytes: Vec<u8>) -> Self {
        Self { scheme, bytes }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Transport form: `v1:{SCHEME}:{base64}`
    pub fn to_text(&self) -> String {
        join_frame(&self.scheme.to_string(), &[encoding::to_text(&self.bytes)])
    }

    /// # Errors
    ///
    /// `MalformedInput` on a bad frame or encoding, `UnsupportedAlgorithm`
    /// on an unknown scheme tag.
    pub fn from_text(text: &str) -> CryptoResult<Self> {
        let (tag, fields) = split_frame(text, 1)?;
        let scheme: SignatureScheme = tag.parse()?;
        let bytes = encoding::from_text(fields.first().copied().unwrap_or_default())?;
        Ok(Self { scheme, bytes })
    }
}

/// Sign `message` with the default scheme for the key's algorithm
///
/// # Errors
///
/// `InvalidKey` for a non-private or unparsable key, `UnsupportedAlgorithm`
/// for keys that cannot sign.
pub fn sign(private_key: &KeyMaterial, message: &[u8]) -> CryptoResult<Signature> {
    let scheme = SignatureScheme::default_for(private_key.algorithm()).ok_or_else(|| {
        CryptoError::UnsupportedAlgorithm(format!("{} keys cannot sign", private_key.algorithm()))
    })?;
    sign_with(private_key, scheme, message)
}

/// Sign `message` with an explicit scheme
///
/// # Errors
///
/// As [`sign`], plus `InvalidKey` when the scheme does not fit the key.
pub fn sign_with(private_key: &KeyMaterial, scheme: SignatureScheme, message: &[u8]) -> CryptoResult<Signature> {
    private_key.require_role(KeyRole::Private)?;
    check_scheme(scheme, private_key.algorithm())?;
    debug!(%scheme, len = message.len(), "Signing message");

    let bytes = match scheme {
        SignatureScheme::RsaPkcs1Sha256 => {
            let signer = pkcs1v15::SigningKey::<Sha256>::new(rsa_private_key(private_key)?);
            signer
                .try_sign(message)
                .map_err(|e| CryptoError::SigningFailed(e.to_string()))?
                .to_vec()
        }
        SignatureScheme::RsaPssSha256 => {
            let signer = pss::BlindedSigningKey::<Sha256>::new(rsa_private_key(private_key)?);
            signer
                .try_sign_with_rng(&mut OsRng, message)
                .map_err(|e| CryptoError::SigningFailed(e.to_string()))?
                .to_vec()
        }
        SignatureScheme::EcdsaP256Sha256 => {
            let signer = p256::ecdsa::SigningKey::from_slice(private_key.as_bytes())
                .map_err(|_| CryptoError::InvalidKey("Invalid P-256 private key".to_string()))?;
            // Hedged: RFC 6979 nonce mixed with fresh randomness
            let signature: p256::ecdsa::Signature = signer
                .try_sign_with_rng(&mut OsRng, message)
                .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
            signature.to_bytes().to_vec()
        }
        SignatureScheme::Ed25519 => {
            let seed = Zeroizing::new(
                <[u8; 32]>::try_from(private_key.as_bytes())
                    .map_err(|_| CryptoError::InvalidKey("Ed25519 private keys are 32 bytes".to_string()))?,
            );
            let signer = ed25519_dalek::SigningKey::from_bytes(&seed);
            signer.sign(message).to_bytes().to_vec()
        }
    };

    Ok(Signature { scheme, bytes })
}

/// Check `signature` over `message` against `public_key`
///
/// # Errors
///
/// `MalformedSignature` if the bytes do not fit the scheme's layout,
/// `InvalidKey` for a non-public, unparsable or mismatched key.
pub fn verify(public_key: &KeyMaterial, message: &[u8], signature: &Signature) -> CryptoResult<bool> {
    public_key.require_role(KeyRole::Public)?;
    let scheme = signature.scheme;
    check_scheme(scheme, public_key.algorithm())?;

    let valid = match scheme {
        SignatureScheme::RsaPkcs1Sha256 | SignatureScheme::RsaPssSha256 => {
            let rsa_key = rsa_public_key(public_key)?;
            if signature.bytes.len() != rsa_key.size() {
                return Err(CryptoError::MalformedSignature(format!(
                    "{} signatures for this key are {} bytes, got {}",
                    scheme,
                    rsa_key.size(),
                    signature.bytes.len()
                )));
            }

            if scheme == SignatureScheme::RsaPkcs1Sha256 {
                let parsed = pkcs1v15::Signature::try_from(signature.bytes.as_slice())
                    .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
                pkcs1v15::VerifyingKey::<Sha256>::new(rsa_key)
                    .verify(message, &parsed)
                    .is_ok()
            } else {
                let parsed = pss::Signature::try_from(signature.bytes.as_slice())
                    .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
                pss::VerifyingKey::<Sha256>::new(rsa_key).verify(message, &parsed).is_ok()
            }
        }
        SignatureScheme::EcdsaP256Sha256 => {
            check_len(scheme, &signature.bytes, ECDSA_P256_SIGNATURE_LEN)?;
            let parsed = p256::ecdsa::Signature::from_slice(&signature.bytes)
                .map_err(|_| CryptoError::MalformedSignature("ECDSA scalar out of range".to_string()))?;
            let verifier = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key.as_bytes())
                .map_err(|_| CryptoError::InvalidKey("Invalid P-256 public key".to_string()))?;
            verifier.verify(message, &parsed).is_ok()
        }
        SignatureScheme::Ed25519 => {
            check_len(scheme, &signature.bytes, ED25519_SIGNATURE_LEN)?;
            let parsed = ed25519_dalek::Signature::from_slice(&signature.bytes)
                .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
            let key_bytes = <[u8; 32]>::try_from(public_key.as_bytes())
                .map_err(|_| CryptoError::InvalidKey("Ed25519 public keys are 32 bytes".to_string()))?;
            let verifier = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
                .map_err(|_| CryptoError::InvalidKey("Invalid Ed25519 public key".to_string()))?;
            verifier.verify_strict(message, &parsed).is_ok()
        }
    };

    debug!(%scheme, valid, "Verified signature");
    Ok(valid)
}

fn check_scheme(scheme: SignatureScheme, algorithm: KeyAlgorithm) -> CryptoResult<()> {
    if scheme.accepts(algorithm) {
        Ok(())
    } else {
        Err(CryptoError::InvalidKey(format!(
            "{} keys cannot be used with {}",
            algorithm, scheme
        )))
    }
}

fn check_len(scheme: SignatureScheme, bytes: &[u8], expected: usize) -> CryptoResult<()> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(CryptoError::MalformedSignature(format!(
            "{} signatures are {} bytes, got {}",
            scheme,
            expected,
            bytes.len()
        )))
    }
}
