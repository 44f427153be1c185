//! Structured events emitted while signing.
//!
//! The engine never writes to the console. It reports through an
//! [`EventSink`]; the default [`TracingSink`] forwards to `tracing`.

use crate::params::{BlendRatio, ShuffleMode};
use crate::tensor::Shape;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum SigningEvent {
    /// Key is empty or the template default; signing continues
    PlaceholderKey { key_length: usize },
    /// Ratio at or below the epsilon; the latent passes through untouched
    Disabled { blend: f64 },
    Started {
        shape: Shape,
        blend: BlendRatio,
        mode: ShuffleMode,
        key_length: usize,
        signature: String,
    },
    /// Block size exceeds the plane; pixel shuffle used instead
    BlockFallback {
        block_size: usize,
        height: usize,
        width: usize,
    },
    ShuffleApplied { difference: f64 },
    /// Shuffled noise is nearly identical to the raw noise
    DegenerateShuffle { difference: f64, threshold: f64 },
    Signed {
        signature: String,
        blend_difference: f64,
    },
    /// Signing failed; the original latent is returned unsigned
    Failed { error: String },
}

/// Receiver for [`SigningEvent`]s
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SigningEvent);
}

impl<F> EventSink for F
where
    F: Fn(&SigningEvent) + Send + Sync,
{
    fn emit(&self, event: &SigningEvent) {
        self(event)
    }
}

/// Forwards events to `tracing` with structured fields
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SigningEvent) {
        match event {
            SigningEvent::PlaceholderKey { key_length } => tracing::warn!(
                key_length,
                "using default or empty key; set a unique key for real protection"
            ),
            SigningEvent::Disabled { blend } => {
                tracing::info!(blend, "signing disabled, blend below threshold")
            }
            SigningEvent::Started {
                shape,
                blend,
                mode,
                key_length,
                signature,
            } => tracing::info!(
                shape = %shape,
                blend = blend.value(),
                mode = %mode,
                key_length,
                signature = %signature,
                "signing latent"
            ),
            SigningEvent::BlockFallback {
                block_size,
                height,
                width,
            } => tracing::warn!(
                block_size,
                height,
                width,
                "block size too large, falling back to pixel shuffle"
            ),
            SigningEvent::ShuffleApplied { difference } => {
                tracing::info!(difference, "shuffle applied")
            }
            SigningEvent::DegenerateShuffle {
                difference,
                threshold,
            } => tracing::warn!(difference, threshold, "shuffle had minimal effect"),
            SigningEvent::Signed {
                signature,
                blend_difference,
            } => tracing::info!(
                signature = %signature,
                blend_difference,
                "signature applied"
            ),
            SigningEvent::Failed { error } => {
                tracing::error!(error = %error, "signing failed, falling back to unsigned latent")
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &SigningEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SigningEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events so far
    pub fn events(&self) -> Vec<SigningEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SigningEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
