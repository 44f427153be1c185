//! Secret key → SHA-256 digest → 32-bit seed and public fingerprint.

use crate::tensor::Shape;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

/// Default key shipped in host templates; signing with it proves nothing
pub const PLACEHOLDER_KEY: &str = "your_artist_name_here";

/// Prefix of the short human-visible signature label
pub const SIGNATURE_PREFIX: &str = "CN-";

/// Hex characters of the fingerprint carried in the signature label
pub const SIGNATURE_HEX_LEN: usize = 16;

/// Bit width of the key digest
pub const DIGEST_BITS: u32 = 256;

/// Caller-supplied secret. Never printed; only its digest leaves this module.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Empty or left at the template default
    pub fn is_placeholder(&self) -> bool {
        self.0.is_empty() || self.0 == PLACEHOLDER_KEY
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} chars redacted>)", self.len())
    }
}

impl From<&str> for SecretKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SecretKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Identity derived from a secret key for one signing call
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    digest: [u8; 32],
    /// Seed for every generator used by the engine
    pub seed: u32,
    /// Length of the secret in characters
    pub key_length: usize,
    pub shape: Shape,
    pub derived_at: DateTime<Utc>,
}

impl Identity {
    /// Raw SHA-256 digest of the key
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Lowercase hex of the full digest; safe to disclose
    pub fn fingerprint(&self) -> String {
        hex::encode(self.digest)
    }

    /// `CN-` followed by the first 16 hex characters of the fingerprint
    pub fn signature(&self) -> String {
        signature_label(&self.fingerprint())
    }
}

/// Derive the identity for `key` at the given latent shape
pub fn derive_identity(key: &SecretKey, shape: Shape) -> Identity {
    let digest: [u8; 32] = Sha256::digest(key.as_bytes()).into();
    Identity {
        digest,
        seed: seed_from_digest(&digest),
        key_length: key.len(),
        shape,
        derived_at: Utc::now(),
    }
}

/// First 8 digest bytes as a big-endian integer, reduced modulo 2^32
pub fn seed_from_digest(digest: &[u8; 32]) -> u32 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % (1u64 << 32)) as u32
}

/// Build the short label from a hex fingerprint
pub fn signature_label(fingerprint: &str) -> String {
    let end = fingerprint.len().min(SIGNATURE_HEX_LEN);
    format!("{}{}", SIGNATURE_PREFIX, &fingerprint[..end])
}
