use crate::tensor::{Device, Element, Shape, Tensor};
use rand::distributions::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;

/// ChaCha stream for noise values, disjoint from the permutation stream
pub const NOISE_STREAM: u64 = 1;

/// Standard-normal tensor of the given shape, reproducible for the same (seed, shape, dtype)
///
/// Values are drawn from a ChaCha20 generator that shares the permutation
/// seed but reads a different stream.
pub fn synthesize_noise<T: Element>(seed: u64, shape: Shape, device: Device) -> Tensor<T> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(NOISE_STREAM);

    let gaussian = StandardNormal;
    let data = (0..shape.numel())
        .map(|_| {
            let sample: f64 = gaussian.sample(&mut rng);
            T::from_f64(sample)
        })
        .collect();

    Tensor::from_parts(shape, device, data)
}
