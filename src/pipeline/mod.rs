//! Signing stages: permutation, noise, shuffle, blend.

pub mod blend;
pub mod noise;
pub mod permutation;
pub mod shuffle;

pub use blend::*;
pub use noise::*;
pub use permutation::*;
pub use shuffle::*;
