use crate::error::{CryptoNoiseError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ratios at or below this leave the latent untouched
pub const BLEND_EPSILON: f64 = 0.01;

/// Block edge length for coarse-grained shuffling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockSize {
    B8,
    B16,
    B32,
}

impl BlockSize {
    pub fn pixels(&self) -> usize {
        match self {
            Self::B8 => 8,
            Self::B16 => 16,
            Self::B32 => 32,
        }
    }

    pub fn from_pixels(pixels: usize) -> Option<Self> {
        match pixels {
            8 => Some(Self::B8),
            16 => Some(Self::B16),
            32 => Some(Self::B32),
            _ => None,
        }
    }
}

/// Shuffle granularity options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShuffleMode {
    /// Permute individual elements of each plane
    Pixel,
    /// Permute S×S blocks, one permutation shared by every plane
    Block(BlockSize),
}

impl Default for ShuffleMode {
    fn default() -> Self {
        Self::Block(BlockSize::B8)
    }
}

impl std::str::FromStr for ShuffleMode {
    type Err = CryptoNoiseError;
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        if lower == "pixel" {
            return Ok(Self::Pixel);
        }
        lower
            .strip_prefix("block_")
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(BlockSize::from_pixels)
            .map(Self::Block)
            .ok_or_else(|| CryptoNoiseError::UnsupportedMode(s.to_string()))
    }
}

impl TryFrom<String> for ShuffleMode {
    type Error = CryptoNoiseError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ShuffleMode> for String {
    fn from(mode: ShuffleMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for ShuffleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pixel => write!(f, "pixel"),
            Self::Block(size) => write!(f, "block_{}", size.pixels()),
        }
    }
}

/// How pixel mode derives one seed per (batch, channel) plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SliceSeeding {
    /// HMAC-SHA256 over (seed, batch, channel), keyed by the key digest
    #[default]
    Keyed,
    /// `seed + batch * channels + channel`; reproduces legacy artifacts
    Offset,
}

impl std::str::FromStr for SliceSeeding {
    type Err = CryptoNoiseError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keyed" | "hmac" => Ok(Self::Keyed),
            "offset" | "legacy" => Ok(Self::Offset),
            _ => Err(CryptoNoiseError::UnsupportedSeeding(s.to_string())),
        }
    }
}

impl fmt::Display for SliceSeeding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyed => write!(f, "keyed"),
            Self::Offset => write!(f, "offset"),
        }
    }
}

/// Interpolation weight in [0, 1] between the original latent and shuffled noise
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BlendRatio(f64);

impl BlendRatio {
    pub const OFF: BlendRatio = BlendRatio(0.0);
    pub const FULL: BlendRatio = BlendRatio(1.0);

    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(CryptoNoiseError::InvalidBlendRatio(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// True when the ratio is too small to bother signing
    pub fn is_negligible(&self) -> bool {
        self.0 <= BLEND_EPSILON
    }
}

impl Default for BlendRatio {
    fn default() -> Self {
        Self(0.5)
    }
}

impl TryFrom<f64> for BlendRatio {
    type Error = CryptoNoiseError;
    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BlendRatio> for f64 {
    fn from(ratio: BlendRatio) -> Self {
        ratio.0
    }
}

impl std::str::FromStr for BlendRatio {
    type Err = CryptoNoiseError;
    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| CryptoNoiseError::UnparsableBlendRatio(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for BlendRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffle_mode_parse() {
        assert_eq!("pixel".parse::<ShuffleMode>().unwrap(), ShuffleMode::Pixel);
        assert_eq!(
            "block_8".parse::<ShuffleMode>().unwrap(),
            ShuffleMode::Block(BlockSize::B8)
        );
        assert_eq!(
            "BLOCK_32".parse::<ShuffleMode>().unwrap(),
            ShuffleMode::Block(BlockSize::B32)
        );
        assert!("block_12".parse::<ShuffleMode>().is_err());
        assert!("block_".parse::<ShuffleMode>().is_err());
        assert!("tiles".parse::<ShuffleMode>().is_err());
    }

    #[test]
    fn test_shuffle_mode_display_matches_parse() {
        for mode in [
            ShuffleMode::Pixel,
            ShuffleMode::Block(BlockSize::B8),
            ShuffleMode::Block(BlockSize::B16),
            ShuffleMode::Block(BlockSize::B32),
        ] {
            assert_eq!(mode.to_string().parse::<ShuffleMode>().unwrap(), mode);
        }
        assert_eq!(
            serde_json::to_string(&ShuffleMode::Block(BlockSize::B16)).unwrap(),
            "\"block_16\""
        );
    }

    #[test]
    fn test_blend_ratio_bounds() {
        assert!(BlendRatio::new(0.0).is_ok());
        assert!(BlendRatio::new(1.0).is_ok());
        assert!(BlendRatio::new(-0.01).is_err());
        assert!(BlendRatio::new(1.5).is_err());
        assert!(BlendRatio::new(f64::NAN).is_err());
        assert!("abc".parse::<BlendRatio>().is_err());
        assert_eq!("0.25".parse::<BlendRatio>().unwrap().value(), 0.25);
    }

    #[test]
    fn test_blend_ratio_parse_error_keeps_input() {
        let err = "abc".parse::<BlendRatio>().unwrap_err();
        assert!(matches!(err, CryptoNoiseError::UnparsableBlendRatio(ref s) if s == "abc"));
        assert!(err.to_string().contains("'abc'"));
        assert!(!err.to_string().contains("NaN"));

        let err = "1.5".parse::<BlendRatio>().unwrap_err();
        assert!(matches!(err, CryptoNoiseError::InvalidBlendRatio(v) if v == 1.5));
    }

    #[test]
    fn test_blend_ratio_negligible() {
        assert!(BlendRatio::OFF.is_negligible());
        assert!(BlendRatio::new(0.01).unwrap().is_negligible());
        assert!(!BlendRatio::new(0.02).unwrap().is_negligible());
    }

    #[test]
    fn test_slice_seeding_parse() {
        assert_eq!("keyed".parse::<SliceSeeding>().unwrap(), SliceSeeding::Keyed);
        assert_eq!("Offset".parse::<SliceSeeding>().unwrap(), SliceSeeding::Offset);
        assert!("random".parse::<SliceSeeding>().is_err());
    }
}
