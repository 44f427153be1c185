use crate::error::{CryptoNoiseError, Result};
use crate::identity::Identity;
use crate::params::SliceSeeding;
use hmac::{Hmac, Mac};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// ChaCha stream reserved for permutations; noise uses its own stream
pub const PERMUTATION_STREAM: u64 = 0;

type HmacSha256 = Hmac<Sha256>;

const SLICE_SEED_DOMAIN: &[u8] = b"cryptonoise_slice_seed_v1";

/// A bijection over `0..len`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Validate raw indices: every value in `0..len` exactly once
    pub fn from_indices(indices: Vec<usize>) -> Result<Self> {
        let n = indices.len();
        let mut seen = vec![false; n];
        for &idx in &indices {
            if idx >= n {
                return Err(CryptoNoiseError::InvalidPermutation(format!(
                    "index {} out of range for length {}",
                    idx, n
                )));
            }
            if seen[idx] {
                return Err(CryptoNoiseError::InvalidPermutation(format!(
                    "index {} appears twice",
                    idx
                )));
            }
            seen[idx] = true;
        }
        Ok(Self(indices))
    }

    pub fn identity(len: usize) -> Self {
        Self((0..len).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Number of indices moved from their original position
    pub fn displaced(&self) -> usize {
        self.0.iter().enumerate().filter(|(i, &p)| *i != p).count()
    }

    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0usize; self.0.len()];
        for (new_pos, &old_pos) in self.0.iter().enumerate() {
            inverse[old_pos] = new_pos;
        }
        Self(inverse)
    }
}

/// Uniform permutation of `0..n`, reproducible for the same (seed, n)
///
/// A fresh ChaCha20 generator is built for every call, so no state is
/// shared between calls or threads.
pub fn generate_permutation(seed: u64, n: usize) -> Permutation {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(PERMUTATION_STREAM);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    Permutation(indices)
}

/// Per-plane seeds for pixel mode
#[derive(Clone)]
pub struct SliceSeeder {
    strategy: SliceSeeding,
    seed: u32,
    channels: usize,
    digest: [u8; 32],
}

impl SliceSeeder {
    pub fn new(identity: &Identity, strategy: SliceSeeding) -> Self {
        Self {
            strategy,
            seed: identity.seed,
            channels: identity.shape.channels,
            digest: *identity.digest(),
        }
    }

    pub fn strategy(&self) -> SliceSeeding {
        self.strategy
    }

    /// Channel count the offsets were laid out for
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Seed for the plane at (batch, channel)
    pub fn seed_for(&self, batch: usize, channel: usize) -> u64 {
        match self.strategy {
            SliceSeeding::Offset => {
                self.seed as u64 + (batch * self.channels + channel) as u64
            }
            SliceSeeding::Keyed => self.keyed_seed(batch, channel),
        }
    }

    fn keyed_seed(&self, batch: usize, channel: usize) -> u64 {
        let mut mac =
            HmacSha256::new_from_slice(&self.digest).expect("HMAC can take key of any size");
        mac.update(SLICE_SEED_DOMAIN);
        mac.update(&self.seed.to_be_bytes());
        mac.update(&(batch as u64).to_be_bytes());
        mac.update(&(channel as u64).to_be_bytes());
        let tag = mac.finalize().into_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&tag[..8]);
        u64::from_be_bytes(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{derive_identity, SecretKey};
    use crate::tensor::Shape;

    #[test]
    fn test_permutation_is_bijection() {
        for n in [0usize, 1, 2, 7, 64, 1000] {
            let perm = generate_permutation(42, n);
            assert_eq!(perm.len(), n);
            assert!(Permutation::from_indices(perm.as_slice().to_vec()).is_ok());
        }
    }

    #[test]
    fn test_permutation_is_deterministic() {
        let a = generate_permutation(2_131_624_111, 64);
        let b = generate_permutation(2_131_624_111, 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_permutation(1, 256);
        let b = generate_permutation(2, 256);
        assert_ne!(a, b);
    }

    #[test]
    fn test_permutation_moves_indices() {
        let perm = generate_permutation(7, 64);
        assert!(perm.displaced() > 32);
    }

    #[test]
    fn test_inverse() {
        let perm = generate_permutation(9, 50);
        let inv = perm.inverse();
        for (i, &p) in perm.as_slice().iter().enumerate() {
            assert_eq!(inv.as_slice()[p], i);
        }
    }

    #[test]
    fn test_from_indices_rejects_invalid() {
        assert!(Permutation::from_indices(vec![0, 0, 1]).is_err());
        assert!(Permutation::from_indices(vec![0, 3, 1]).is_err());
        assert!(Permutation::from_indices(vec![2, 0, 1]).is_ok());
    }

    #[test]
    fn test_offset_seeding() {
        let identity = derive_identity(&SecretKey::from("alice"), Shape::new(2, 4, 8, 8).unwrap());
        let seeder = SliceSeeder::new(&identity, SliceSeeding::Offset);
        assert_eq!(seeder.seed_for(0, 0), identity.seed as u64);
        assert_eq!(seeder.seed_for(1, 3), identity.seed as u64 + 7);
    }

    #[test]
    fn test_keyed_seeding_is_distinct_and_stable() {
        let identity = derive_identity(&SecretKey::from("alice"), Shape::new(2, 4, 8, 8).unwrap());
        let seeder = SliceSeeder::new(&identity, SliceSeeding::Keyed);
        let mut seeds = Vec::new();
        for b in 0..2 {
            for c in 0..4 {
                seeds.push(seeder.seed_for(b, c));
            }
        }
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), seeds.len());
        assert_eq!(seeder.seed_for(1, 2), seeder.clone().seed_for(1, 2));
    }

    #[test]
    fn test_keyed_seeding_depends_on_key() {
        let shape = Shape::new(1, 4, 8, 8).unwrap();
        let a = SliceSeeder::new(&derive_identity(&SecretKey::from("alice"), shape), SliceSeeding::Keyed);
        let b = SliceSeeder::new(&derive_identity(&SecretKey::from("bob"), shape), SliceSeeding::Keyed);
        assert_ne!(a.seed_for(0, 0), b.seed_for(0, 0));
    }
}
