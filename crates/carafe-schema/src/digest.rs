//! Validated SHA-256 digest strings.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors produced when parsing a digest string.
#[derive(Error, Debug)]
pub enum DigestError {
    /// The hex portion is not exactly 64 characters long.
    #[error("invalid SHA256 digest: expected 64 hex characters, got {len} in '{input}'")]
    BadLength {
        /// Number of characters actually found.
        len: usize,
        /// The offending input string.
        input: String,
    },

    /// The digest contains characters outside `[0-9a-fA-F]`.
    ///
    /// Placeholder values such as `PLACEHOLDER_SHA256_CHECKSUM` land here and
    /// are refused before any network access happens.
    #[error("invalid SHA256 digest: non-hex characters in '{0}'")]
    NotHex(String),
}

/// A validated SHA-256 digest (64 hex characters).
///
/// Validation happens at construction and at deserialization time, so an
/// invalid hex string can never propagate into the fetch/install pipeline.
/// The stored form is lowercased, which makes comparison against a computed
/// digest case-insensitive. An optional `sha256:` prefix is accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] if the hex portion is not exactly 64 ASCII hex
    /// characters.
    pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(DigestError::BadLength {
                len: hex.len(),
                input: s,
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NotHex(s));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Get the digest as a lowercase hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a computed hex digest, ignoring case.
    pub fn matches(&self, computed_hex: &str) -> bool {
        self.0 == computed_hex.to_lowercase()
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
