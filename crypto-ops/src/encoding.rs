//! Byte ↔ text transport encoding
//!
//! Every engine output crosses the library boundary as text. Standard base64
//! is the default; URL-safe base64 and lowercase hex are available for callers
//! that embed values in URLs or compare against hex-printed digests.
//!
//! Structured values (ciphertexts, signatures, tags, derived keys, keys) use a
//! versioned, colon-delimited frame: `v1:{TAG}:{field}:...:{field}`. None of
//! the alphabets used for fields contain `:`.

use crate::error::{CryptoError, CryptoResult};
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL},
    Engine,
};
use std::fmt;
use std::str::FromStr;

/// Current transport frame version
pub const FRAME_VERSION: u32 = 1;

/// Text encodings supported at the library boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// RFC 4648 base64 with padding
    #[default]
    Base64,
    /// RFC 4648 URL-safe alphabet, no padding
    Base64Url,
    /// Lowercase hexadecimal
    Hex,
}

impl TextEncoding {
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Base64 => BASE64.encode(bytes),
            TextEncoding::Base64Url => BASE64_URL.encode(bytes),
            TextEncoding::Hex => hex::encode(bytes),
        }
    }

    /// # Errors
    ///
    /// `MalformedInput` on characters outside the alphabet or bad padding.
    pub fn decode(self, text: &str) -> CryptoResult<Vec<u8>> {
        match self {
            TextEncoding::Base64 => BASE64
                .decode(text)
                .map_err(|e| CryptoError::MalformedInput(format!("Invalid base64: {}", e))),
            TextEncoding::Base64Url => BASE64_URL
                .decode(text)
                .map_err(|e| CryptoError::MalformedInput(format!("Invalid base64url: {}", e))),
            TextEncoding::Hex => hex::decode(text)
                .map_err(|e| CryptoError::MalformedInput(format!("Invalid hex: {}", e))),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base64" | "b64" => Ok(TextEncoding::Base64),
            "base64url" | "base64-url" | "b64url" => Ok(TextEncoding::Base64Url),
            "hex" | "base16" => Ok(TextEncoding::Hex),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Unknown text encoding: {}. Valid options: base64, base64url, hex",
                s
            ))),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextEncoding::Base64 => "base64",
            TextEncoding::Base64Url => "base64url",
            TextEncoding::Hex => "hex",
        })
    }
}

/// Encode bytes as standard base64
pub fn to_text(bytes: &[u8]) -> String {
    TextEncoding::Base64.encode(bytes)
}

/// Decode standard base64
///
/// # Errors
///
/// `MalformedInput` on invalid characters or padding.
pub fn from_text(text: &str) -> CryptoResult<Vec<u8>> {
    TextEncoding::Base64.decode(text)
}

/// Build a transport frame: `v1:{tag}:{fields...}`
pub(crate) fn join_frame(tag: &str, fields: &[String]) -> String {
    let mut out = format!("v{}:{}", FRAME_VERSION, tag);
    for field in fields {
        out.push(':');
        out.push_str(field);
    }
    out
}

/// Split a transport frame into its tag and exactly `field_count` fields
pub(crate) fn split_frame(text: &str, field_count: usize) -> CryptoResult<(&str, Vec<&str>)> {
    let mut parts = text.trim().split(':');

    let version = parts
        .next()
        .and_then(|v| v.strip_prefix('v'))
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| CryptoError::MalformedInput("Missing frame version".to_string()))?;

    if version != FRAME_VERSION {
        return Err(CryptoError::MalformedInput(format!(
            "Unsupported frame version {}, only version {} is supported",
            version, FRAME_VERSION
        )));
    }

    let tag = parts
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CryptoError::MalformedInput("Missing algorithm tag".to_string()))?;

    let fields: Vec<&str> = parts.collect();
    if fields.len() != field_count {
        return Err(CryptoError::MalformedInput(format!(
            "Expected {} fields after the tag, got {}",
            field_count,
            fields.len()
        )));
    }

    Ok((tag, fields))
}
