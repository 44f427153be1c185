//! CryptoNoise - key-derived latent noise shuffling with provenance
//!
//! A secret key deterministically rearranges the noise that seeds a
//! diffusion sampler. The rearranged noise is blended into the latent,
//! so every output carries a signature that only the key reproduces.
//! A provenance record stores the key's fingerprint and the parameters
//! needed to regenerate the output, never the key itself.
//!
//! ## Signing Pipeline
//!
//! ```text
//! Key → Identity → Noise(seed) → Shuffle(permutation) → Blend(ratio) → Output + Provenance
//! ```
//!
//! - **Identity**: SHA-256 of the key; seed, fingerprint and `CN-` label
//! - **Noise**: standard normal from a ChaCha20 stream seeded by the identity
//! - **Shuffle**: keyed permutation of pixels or of 8/16/32 blocks
//! - **Blend**: `original * (1 - r) + shuffled * r`
//!
//! ## Example
//!
//! ```no_run
//! use cryptonoise::{sign_latent, Device, SecretKey, Shape, SignOptions, Tensor};
//!
//! let shape = Shape::new(1, 4, 64, 64).unwrap();
//! let latent = Tensor::<f32>::zeros(shape, Device::Cpu);
//!
//! let outcome = sign_latent(&latent, &SecretKey::from("my_secret"), &SignOptions::default());
//! println!("{}", outcome.signature);
//! if let Some(record) = outcome.provenance {
//!     println!("{}", record.to_json().unwrap());
//! }
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod latent_file;
pub mod params;
pub mod pipeline;
pub mod provenance;
pub mod tensor;
pub mod verify;

pub use engine::{sign_any, sign_latent, sign_latent_with_sink, SignOptions, SignOutcome, Signature};
pub use error::{CryptoNoiseError, Result};
pub use events::{EventSink, SigningEvent};
pub use identity::{derive_identity, Identity, SecretKey};
pub use latent_file::{read_latent_file, write_latent_file};
pub use params::{BlendRatio, BlockSize, ShuffleMode, SliceSeeding};
pub use provenance::ProvenanceRecord;
pub use tensor::{DType, Device, Latent, Shape, Tensor};
pub use verify::{verify_latent, verify_provenance};
