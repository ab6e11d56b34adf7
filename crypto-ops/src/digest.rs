//! One-way hashing
//!
//! SHA-256 is the default. MD5 and SHA-1 are exposed for interoperability
//! with legacy data only: both have practical collision attacks and MUST NOT
//! be used for signatures, integrity checks or password storage.

use crate::encoding::{self, join_frame, split_frame};
use crate::error::{CryptoError, CryptoResult};
use sha2::{Sha256, Sha384, Sha512};
use sha3::{Sha3_256, Sha3_512};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    /// Broken: collision-vulnerable. Legacy compatibility only.
    Md5,
    /// Broken: collision-vulnerable. Legacy compatibility only.
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_512,
    Blake3,
}

impl DigestAlgorithm {
    /// True for algorithms with known practical collision attacks
    pub fn is_legacy(self) -> bool {
        matches!(self, DigestAlgorithm::Md5 | DigestAlgorithm::Sha1)
    }

    /// Digest size in bytes
    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 | DigestAlgorithm::Sha3_256 | DigestAlgorithm::Blake3 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 | DigestAlgorithm::Sha3_512 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
            DigestAlgorithm::Sha3_256 => "SHA3-256",
            DigestAlgorithm::Sha3_512 => "SHA3-512",
            DigestAlgorithm::Blake3 => "BLAKE3",
        })
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MD5" => Ok(DigestAlgorithm::Md5),
            "SHA-1" | "SHA1" => Ok(DigestAlgorithm::Sha1),
            "SHA-256" | "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA-384" | "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA-512" | "SHA512" => Ok(DigestAlgorithm::Sha512),
            "SHA3-256" | "SHA3_256" => Ok(DigestAlgorithm::Sha3_256),
            "SHA3-512" | "SHA3_512" => Ok(DigestAlgorithm::Sha3_512),
            "BLAKE3" => Ok(DigestAlgorithm::Blake3),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown digest algorithm: {}. Valid options: sha-256, sha-384, sha-512, sha3-256, sha3-512, blake3, md5, sha-1",
                s
            ))),
        }
    }
}

/// Fixed-length hash output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    bytes: Vec<u8>,
}

impl Digest {
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex, the conventional display form for digests
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Transport form: `v1:{ALGORITHM}:{base64}`
    pub fn to_text(&self) -> String {
        join_frame(&self.algorithm.to_string(), &[encoding::to_text(&self.bytes)])
    }

    /// # Errors
    ///
    /// `MalformedInput` on a bad frame or a length that does not match the
    /// algorithm, `UnsupportedAlgorithm` on an unknown tag.
    pub fn from_text(text: &str) -> CryptoResult<Self> {
        let (tag, fields) = split_frame(text, 1)?;
        let algorithm: DigestAlgorithm = tag.parse()?;
        let bytes = encoding::from_text(fields.first().copied().unwrap_or_default())?;
        if bytes.len() != algorithm.output_len() {
            return Err(CryptoError::MalformedInput(format!(
                "{} digests are {} bytes, got {}",
                algorithm,
                algorithm.output_len(),
                bytes.len()
            )));
        }
        Ok(Self { algorithm, bytes })
    }
}

fn hash_with<D: sha2::Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

/// Hash `data` with `algorithm`
pub fn digest(algorithm: DigestAlgorithm, data: &[u8]) -> Digest {
    if algorithm.is_legacy() {
        warn!(%algorithm, "Legacy digest requested; not collision resistant");
    }
    debug!(%algorithm, len = data.len(), "Computing digest");

    let bytes = match algorithm {
        DigestAlgorithm::Md5 => hash_with::<md5::Md5>(data),
        DigestAlgorithm::Sha1 => hash_with::<sha1::Sha1>(data),
        DigestAlgorithm::Sha256 => hash_with::<Sha256>(data),
        DigestAlgorithm::Sha384 => hash_with::<Sha384>(data),
        DigestAlgorithm::Sha512 => hash_with::<Sha512>(data),
        DigestAlgorithm::Sha3_256 => hash_with::<Sha3_256>(data),
        DigestAlgorithm::Sha3_512 => hash_with::<Sha3_512>(data),
        DigestAlgorithm::Blake3 => blake3::hash(data).as_bytes().to_vec(),
    };

    Digest { algorithm, bytes }
}

/// Hash `data` with an algorithm given by name
///
/// # Errors
///
/// `UnsupportedAlgorithm` if the name is not recognized.
pub fn digest_named(algorithm: &str, data: &[u8]) -> CryptoResult<Digest> {
    Ok(digest(algorithm.parse()?, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &[u8] = b"Hello, World!";

    #[test]
    fn test_sha256_known_answer() {
        assert_eq!(
            digest(DigestAlgorithm::Sha256, HELLO).to_hex(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(
            digest(DigestAlgorithm::Sha256, b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_legacy_known_answers() {
        assert_eq!(
            digest(DigestAlgorithm::Md5, HELLO).to_hex(),
            "65a8e27d8879283831b664bd8b7f0ad4"
        );
        assert_eq!(
            digest(DigestAlgorithm::Sha1, HELLO).to_hex(),
            "0a0a9f2a6772942557ab5355d76af442f8f65e01"
        );
        assert!(DigestAlgorithm::Md5.is_legacy());
        assert!(DigestAlgorithm::Sha1.is_legacy());
        assert!(!DigestAlgorithm::default().is_legacy());
    }

    #[test]
    fn test_sha3_and_blake3_known_answers() {
        assert_eq!(
            digest(DigestAlgorithm::Sha3_256, b"abc").to_hex(),
            "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"
        );
        assert_eq!(
            digest(DigestAlgorithm::Blake3, b"").to_hex(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_output_lengths() {
        for algorithm in [
            DigestAlgorithm::Md5,
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
            DigestAlgorithm::Sha3_256,
            DigestAlgorithm::Sha3_512,
            DigestAlgorithm::Blake3,
        ] {
            assert_eq!(digest(algorithm, HELLO).as_bytes().len(), algorithm.output_len());
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            digest(DigestAlgorithm::Sha512, HELLO),
            digest(DigestAlgorithm::Sha512, HELLO)
        );
        assert_ne!(
            digest(DigestAlgorithm::Sha512, HELLO),
            digest(DigestAlgorithm::Sha512, b"Hello, World?")
        );
    }

    #[test]
    fn test_unsupported_algorithm() {
        assert!(matches!(
            digest_named("whirlpool", HELLO),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
        assert!(digest_named("sha256", HELLO).is_ok());
    }

    #[test]
    fn test_text_form() {
        let original = digest(DigestAlgorithm::Sha384, HELLO);
        let text = original.to_text();
        assert!(text.starts_with("v1:SHA-384:"));
        assert_eq!(Digest::from_text(&text).unwrap(), original);

        // Tag says SHA-256 but the body is a 48-byte value
        let mismatched = text.replacen("SHA-384", "SHA-256", 1);
        assert!(matches!(Digest::from_text(&mismatched), Err(CryptoError::MalformedInput(_))));
    }
}
