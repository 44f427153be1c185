//! Signing entry point.
//!
//! ```text
//! Key → Identity → Noise(seed) → Shuffle(permutation) → Blend(ratio) → Output + Provenance
//! ```
//!
//! Signing never fails the caller. Any error inside the pipeline is
//! reported through the event sink and the original latent comes back
//! unmodified, labelled `error`.

use crate::error::Result;
use crate::events::{EventSink, SigningEvent, TracingSink};
use crate::identity::{derive_identity, Identity, SecretKey};
use crate::params::{BlendRatio, ShuffleMode, SliceSeeding};
use crate::pipeline::{blend, synthesize_noise, ShuffleStrategy};
use crate::provenance::{GenerationParameters, ProvenanceRecord};
use crate::tensor::{Element, Latent, Tensor};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Shuffled noise closer than this to the raw noise is reported as degenerate
pub const DEGENERATE_THRESHOLD: f64 = 1e-4;

/// Options for signing a latent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignOptions {
    pub blend: BlendRatio,
    pub mode: ShuffleMode,
    pub slice_seeding: SliceSeeding,
    /// Passed through into the provenance record
    pub generation: GenerationParameters,
}

/// Short label returned next to the latent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// `CN-` plus 16 fingerprint hex characters
    Signed(String),
    Unsigned,
    Error,
}

impl Signature {
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed(_))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed(label) => write!(f, "{}", label),
            Self::Unsigned => write!(f, "unsigned"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Measurements taken while signing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    /// Mean |shuffled - raw noise|
    pub shuffle_difference: f64,
    /// Mean |output - input|
    pub blend_difference: f64,
    /// Block mode was requested but pixel mode ran
    pub fell_back_to_pixel: bool,
}

#[derive(Debug, Clone)]
pub struct SignOutcome<L> {
    pub latent: L,
    pub signature: Signature,
    /// Present only when the latent was signed
    pub provenance: Option<ProvenanceRecord>,
    pub diagnostics: Option<Diagnostics>,
}

impl<L> SignOutcome<L> {
    pub fn map<M>(self, f: impl FnOnce(L) -> M) -> SignOutcome<M> {
        SignOutcome {
            latent: f(self.latent),
            signature: self.signature,
            provenance: self.provenance,
            diagnostics: self.diagnostics,
        }
    }

    fn passthrough(latent: L, signature: Signature) -> Self {
        Self {
            latent,
            signature,
            provenance: None,
            diagnostics: None,
        }
    }
}

/// Sign `latent` with `key`, logging through `tracing`
pub fn sign_latent<T: Element>(
    latent: &Tensor<T>,
    key: &SecretKey,
    options: &SignOptions,
) -> SignOutcome<Tensor<T>> {
    sign_latent_with_sink(latent, key, options, &TracingSink)
}

/// Sign `latent` with `key`, reporting to `sink`
pub fn sign_latent_with_sink<T: Element>(
    latent: &Tensor<T>,
    key: &SecretKey,
    options: &SignOptions,
    sink: &dyn EventSink,
) -> SignOutcome<Tensor<T>> {
    if key.is_placeholder() {
        sink.emit(&SigningEvent::PlaceholderKey {
            key_length: key.len(),
        });
    }

    if options.blend.is_negligible() {
        sink.emit(&SigningEvent::Disabled {
            blend: options.blend.value(),
        });
        return SignOutcome::passthrough(latent.clone(), Signature::Unsigned);
    }

    let identity = derive_identity(key, latent.shape());
    sink.emit(&SigningEvent::Started {
        shape: latent.shape(),
        blend: options.blend,
        mode: options.mode,
        key_length: identity.key_length,
        signature: identity.signature(),
    });

    guarded(latent, sink, || run_pipeline(latent, &identity, options, sink))
}

/// Dtype-erased [`sign_latent_with_sink`]
pub fn sign_any(
    latent: &Latent,
    key: &SecretKey,
    options: &SignOptions,
    sink: &dyn EventSink,
) -> SignOutcome<Latent> {
    match latent {
        Latent::F32(t) => sign_latent_with_sink(t, key, options, sink).map(Latent::F32),
        Latent::F64(t) => sign_latent_with_sink(t, key, options, sink).map(Latent::F64),
    }
}

/// Run `f`, turning errors and panics into an unsigned passthrough
fn guarded<T, F>(latent: &Tensor<T>, sink: &dyn EventSink, f: F) -> SignOutcome<Tensor<T>>
where
    T: Element,
    F: FnOnce() -> Result<SignOutcome<Tensor<T>>>,
{
    let error = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(outcome)) => return outcome,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    sink.emit(&SigningEvent::Failed { error });
    SignOutcome::passthrough(latent.clone(), Signature::Error)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic in signing pipeline".to_string()
    }
}

fn run_pipeline<T: Element>(
    latent: &Tensor<T>,
    identity: &Identity,
    options: &SignOptions,
    sink: &dyn EventSink,
) -> Result<SignOutcome<Tensor<T>>> {
    let shape = latent.shape();

    // Step 1: Key-derived noise on the input's device
    let noise = synthesize_noise::<T>(identity.seed as u64, shape, latent.device().clone());

    // Step 2: Shuffle the noise, not the input latent
    let selection = ShuffleStrategy::select(options.mode, identity, options.slice_seeding);
    if let Some(size) = selection.fallback {
        sink.emit(&SigningEvent::BlockFallback {
            block_size: size.pixels(),
            height: shape.height,
            width: shape.width,
        });
    }
    let shuffled = selection.strategy.apply(&noise)?;

    let shuffle_difference = shuffled.mean_abs_diff(&noise)?;
    sink.emit(&SigningEvent::ShuffleApplied {
        difference: shuffle_difference,
    });
    if shuffle_difference < DEGENERATE_THRESHOLD {
        sink.emit(&SigningEvent::DegenerateShuffle {
            difference: shuffle_difference,
            threshold: DEGENERATE_THRESHOLD,
        });
    }

    // Step 3: Blend into the original
    let signed = blend(latent, &shuffled, options.blend)?;
    let blend_difference = signed.mean_abs_diff(latent)?;

    let signature = identity.signature();
    sink.emit(&SigningEvent::Signed {
        signature: signature.clone(),
        blend_difference,
    });

    let provenance = ProvenanceRecord::new(
        identity,
        options.blend,
        options.mode,
        options.slice_seeding,
        &options.generation,
    );

    Ok(SignOutcome {
        latent: signed,
        signature: Signature::Signed(signature),
        provenance: Some(provenance),
        diagnostics: Some(Diagnostics {
            shuffle_difference,
            blend_difference,
            fell_back_to_pixel: selection.fallback.is_some(),
        }),
    })
}
