use crate::error::{CryptoNoiseError, Result};
use crate::identity::Identity;
use crate::params::{BlockSize, ShuffleMode, SliceSeeding};
use crate::pipeline::permutation::{generate_permutation, Permutation, SliceSeeder};
use crate::tensor::{Element, Tensor};
use rayon::prelude::*;

/// Grid of whole S×S blocks covering the top-left of a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    pub size: usize,
    pub height: usize,
    pub width: usize,
    pub blocks_h: usize,
    pub blocks_w: usize,
}

impl BlockGeometry {
    /// None when the plane is smaller than one block in either direction
    pub fn new(size: usize, height: usize, width: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }
        let blocks_h = height / size;
        let blocks_w = width / size;
        if blocks_h == 0 || blocks_w == 0 {
            return None;
        }
        Some(Self {
            size,
            height,
            width,
            blocks_h,
            blocks_w,
        })
    }

    pub fn total_blocks(&self) -> usize {
        self.blocks_h * self.blocks_w
    }

    /// Top-left element offset of block `idx` (row-major block order)
    fn origin(&self, idx: usize) -> usize {
        let y = (idx / self.blocks_w) * self.size;
        let x = (idx % self.blocks_w) * self.size;
        y * self.width + x
    }
}

/// Shuffle granularity resolved against a concrete identity and geometry
#[derive(Clone)]
pub enum ShuffleStrategy {
    /// One permutation of H×W elements per plane, each from its own seed
    Pixel(SliceSeeder),
    /// One block permutation shared by every plane
    Block {
        geometry: BlockGeometry,
        permutation: Permutation,
    },
}

/// Outcome of [`ShuffleStrategy::select`]
pub struct StrategySelection {
    pub strategy: ShuffleStrategy,
    /// Set when block mode was requested but the plane is too small for it
    pub fallback: Option<BlockSize>,
}

impl ShuffleStrategy {
    /// Choose the strategy once per invocation
    pub fn select(mode: ShuffleMode, identity: &Identity, seeding: SliceSeeding) -> StrategySelection {
        let shape = identity.shape;
        match mode {
            ShuffleMode::Pixel => StrategySelection {
                strategy: Self::Pixel(SliceSeeder::new(identity, seeding)),
                fallback: None,
            },
            ShuffleMode::Block(size) => {
                match BlockGeometry::new(size.pixels(), shape.height, shape.width) {
                    Some(geometry) => StrategySelection {
                        strategy: Self::Block {
                            geometry,
                            permutation: generate_permutation(
                                identity.seed as u64,
                                geometry.total_blocks(),
                            ),
                        },
                        fallback: None,
                    },
                    None => StrategySelection {
                        strategy: Self::Pixel(SliceSeeder::new(identity, seeding)),
                        fallback: Some(size),
                    },
                }
            }
        }
    }

    /// Block strategy with an explicit permutation
    pub fn block(geometry: BlockGeometry, permutation: Permutation) -> Result<Self> {
        if permutation.len() != geometry.total_blocks() {
            return Err(CryptoNoiseError::InvalidPermutation(format!(
                "{} indices for {} blocks",
                permutation.len(),
                geometry.total_blocks()
            )));
        }
        Ok(Self::Block {
            geometry,
            permutation,
        })
    }

    /// Rearrange `noise` plane by plane; shape, dtype and device are kept
    pub fn apply<T: Element>(&self, noise: &Tensor<T>) -> Result<Tensor<T>> {
        let shape = noise.shape();
        match self {
            Self::Pixel(seeder) => {
                if seeder.channels() != shape.channels {
                    return Err(CryptoNoiseError::ShapeMismatch {
                        expected: format!("{} channels", seeder.channels()),
                        actual: shape.to_string(),
                    });
                }
            }
            Self::Block { geometry, .. } => {
                if geometry.height != shape.height || geometry.width != shape.width {
                    return Err(CryptoNoiseError::ShapeMismatch {
                        expected: format!("{}×{} planes", geometry.height, geometry.width),
                        actual: shape.to_string(),
                    });
                }
            }
        }

        let slice_len = shape.slice_len();
        let channels = shape.channels;
        let mut out = noise.data().to_vec();

        // Planes are disjoint, so the parallel result equals the sequential one
        out.par_chunks_mut(slice_len)
            .zip(noise.data().par_chunks(slice_len))
            .enumerate()
            .for_each(|(plane, (dst, src))| match self {
                Self::Pixel(seeder) => {
                    let seed = seeder.seed_for(plane / channels, plane % channels);
                    let permutation = generate_permutation(seed, slice_len);
                    gather(src, dst, &permutation);
                }
                Self::Block {
                    geometry,
                    permutation,
                } => scatter_blocks(src, dst, geometry, permutation),
            });

        Ok(noise.with_data(out))
    }
}

/// `dst[i] = src[permutation[i]]`
fn gather<T: Copy>(src: &[T], dst: &mut [T], permutation: &Permutation) {
    for (slot, &from) in dst.iter_mut().zip(permutation.as_slice()) {
        *slot = src[from];
    }
}

/// Block `i` of `src` lands at block `permutation[i]` of `dst`.
/// Rows and columns outside the block grid keep whatever `dst` held.
fn scatter_blocks<T: Copy>(
    src: &[T],
    dst: &mut [T],
    geometry: &BlockGeometry,
    permutation: &Permutation,
) {
    let size = geometry.size;
    let width = geometry.width;
    for (src_idx, &dst_idx) in permutation.as_slice().iter().enumerate() {
        let src_origin = geometry.origin(src_idx);
        let dst_origin = geometry.origin(dst_idx);
        for row in 0..size {
            let s = src_origin + row * width;
            let d = dst_origin + row * width;
            dst[d..d + size].copy_from_slice(&src[s..s + size]);
        }
    }
}
