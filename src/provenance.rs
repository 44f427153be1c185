//! Provenance record returned with every signed latent.
//!
//! The record carries the key fingerprint and the parameters needed to
//! regenerate the signature, never the key itself.

use crate::error::Result;
use crate::identity::{Identity, DIGEST_BITS};
use crate::params::{BlendRatio, ShuffleMode, SliceSeeding};
use crate::tensor::Shape;
use serde::{Deserialize, Serialize};

/// Schema version of the serialized record
pub const PROVENANCE_VERSION: &str = "1.0.0";

/// Name of the producing system
pub const SYSTEM_NAME: &str = "CryptoNoise";

/// Sampler settings from the host, stored verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub seed: u64,
    pub steps: u32,
    pub cfg: f64,
    pub sampler: String,
    pub scheduler: String,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            seed: 0,
            steps: 20,
            cfg: 8.0,
            sampler: "euler".into(),
            scheduler: "normal".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    /// Hex SHA-256 of the secret key
    pub key_hash: String,
    pub signature: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoParameters {
    pub blend_strength: BlendRatio,
    pub shuffle_mode: ShuffleMode,
    pub latent_shape: Shape,
    pub crypto_seed: u32,
    #[serde(default)]
    pub slice_seeding: SliceSeeding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationInfo {
    pub method: String,
    pub expected_result: String,
    pub proof_type: String,
    pub collision_probability: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub version: String,
    pub system: String,
    /// RFC 3339 time the identity was derived
    pub timestamp: String,
    pub artist: ArtistInfo,
    pub crypto_parameters: CryptoParameters,
    pub generation_parameters: GenerationParameters,
    pub verification: VerificationInfo,
    pub legal_notice: String,
}

impl ProvenanceRecord {
    pub fn new(
        identity: &Identity,
        blend: BlendRatio,
        mode: ShuffleMode,
        slice_seeding: SliceSeeding,
        generation: &GenerationParameters,
    ) -> Self {
        Self {
            version: PROVENANCE_VERSION.into(),
            system: SYSTEM_NAME.into(),
            timestamp: identity.derived_at.to_rfc3339(),
            artist: ArtistInfo {
                key_hash: identity.fingerprint(),
                signature: identity.signature(),
                note: "Key hash only; the key itself stays sealed".into(),
            },
            crypto_parameters: CryptoParameters {
                blend_strength: blend,
                shuffle_mode: mode,
                latent_shape: identity.shape,
                crypto_seed: identity.seed,
                slice_seeding,
            },
            generation_parameters: generation.clone(),
            verification: VerificationInfo {
                method: "Regenerate with the disclosed key and recorded parameters, compare SSIM on the latent".into(),
                expected_result: "SSIM ≈ 1.0 if the key matches".into(),
                proof_type: format!("Deterministic SHA-{} derivation", DIGEST_BITS),
                collision_probability: collision_probability(DIGEST_BITS),
            },
            legal_notice: "The signature is part of the generation process and cannot be removed without regenerating the output. The key must be disclosed for verification.".into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Order-of-magnitude chance that two keys share a digest, `~10^-k` for 2^-bits
pub fn collision_probability(bits: u32) -> String {
    let exponent = (bits as f64 * std::f64::consts::LOG10_2).floor() as u32;
    format!("~10^-{} (SHA-{} based)", exponent, bits)
}
