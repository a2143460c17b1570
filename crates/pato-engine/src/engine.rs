//! Per-block ducking engine and its control handle.
//!
//! [`DuckingEngine`] is the processing-thread half: it owns the gate
//! state and scratch buffers and runs the per-sample loop. Its paired
//! [`EngineControl`] is a cheap clone handed to whichever threads the
//! host updates configuration and drives [`tick`](EngineControl::tick)
//! from. The split encodes the thread model in types instead of
//! documentation.
//!
//! Three locks exist, one per shared resource: the derived parameters,
//! the sidechain binding, and the sidechain ring. They are fine-grained
//! on purpose — a slow control-thread operation must never stall the
//! audio thread on an unrelated lock — and no two of them are ever
//! held at the same time.

use std::sync::{Arc, Mutex, PoisonError};

use pato_core::{DerivedParams, DuckGate, DuckerConfig, MAX_CHANNELS, duck_gain};

use crate::binding::BindingManager;
use crate::ring::SidechainRing;
use crate::source::{CaptureTap, SourceRegistry};
use crate::{Error, Result};

/// Engine configuration: the DSP parameters plus the sidechain source
/// binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Control-law parameters.
    pub ducker: DuckerConfig,
    /// Name of the sidechain source, or `None` to run pass-through.
    pub source: Option<String>,
}

/// The host-facing filter interface.
///
/// A host drives a filter through five entry points: creation,
/// destruction, configuration updates, per-block processing, and a
/// periodic tick. Creation and destruction map onto the constructor
/// and `Drop`; the remaining three are this trait.
pub trait HostFilter {
    /// Apply a new configuration atomically with respect to processing.
    fn update(&self, config: &EngineConfig);

    /// Process one block of interleaved-per-channel audio in place.
    ///
    /// Every slice in `channels` must have the same length; that length
    /// is the block's frame count and may vary between calls.
    fn process_block(&mut self, channels: &mut [&mut [f32]]);

    /// Drive periodic work (sidechain re-resolution) with the elapsed
    /// time since the previous call, in seconds.
    fn tick(&self, seconds: f32);
}

/// State shared between the engine and its control handles.
struct Shared {
    params: Mutex<DerivedParams>,
    binding: BindingManager,
    ring: Arc<SidechainRing>,
    /// The ring, pre-coerced to a tap so subscribe/unsubscribe always
    /// compare the same allocation.
    tap: Arc<dyn CaptureTap>,
    registry: Arc<dyn SourceRegistry>,
}

impl Shared {
    fn apply_config(&self, config: &EngineConfig) {
        let params = DerivedParams::from_config(&config.ducker);
        {
            let mut current = self.params.lock().unwrap_or_else(PoisonError::into_inner);
            *current = params;
        }
        // Channel-count changes invalidate buffered sidechain audio.
        self.ring.set_channels(params.channels);

        let old = self.binding.retarget(config.source.as_deref());
        if let Some(old) = old {
            // Teardown outside every lock; unsubscribe may call back
            // into host code of unknown cost.
            old.unsubscribe(&self.tap);
        }
    }

    fn snapshot_params(&self) -> DerivedParams {
        *self.params.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable control handle for the configuration and tick threads.
#[derive(Clone)]
pub struct EngineControl {
    shared: Arc<Shared>,
}

impl EngineControl {
    /// Apply a new configuration.
    ///
    /// Takes effect atomically: blocks already running finish with the
    /// old parameters, every later block uses the new ones.
    pub fn update(&self, config: &EngineConfig) {
        self.shared.apply_config(config);
    }

    /// Drive periodic sidechain re-resolution.
    ///
    /// `seconds` is the elapsed time since the previous call. Cheap
    /// when nothing needs resolving; actual lookups are rate-limited
    /// internally.
    pub fn tick(&self, seconds: f32) {
        self.shared
            .binding
            .tick(seconds, &*self.shared.registry, &self.shared.tap);
    }

    /// Whether a live sidechain source is currently bound.
    pub fn is_bound(&self) -> bool {
        self.shared.binding.snapshot().is_some()
    }
}

/// Real-time sidechain ducker.
///
/// Owned by the processing thread. Per block it snapshots the derived
/// parameters and the binding, pulls sidechain frames from the ring,
/// and applies the gate and gain law sample by sample. Unbound, it
/// passes audio through untouched.
///
/// # Example
///
/// ```rust,ignore
/// let registry: Arc<dyn SourceRegistry> = host_registry();
/// let (mut engine, control) = DuckingEngine::new(&config, registry)?;
///
/// // control goes to the UI thread:
/// control.update(&new_config);
///
/// // audio thread, once per block:
/// engine.process_block(&mut channel_slices);
/// ```
pub struct DuckingEngine {
    shared: Arc<Shared>,
    gate: DuckGate,
    /// Per-channel sidechain scratch, sized to the largest block seen.
    scratch: Vec<Vec<f32>>,
    block_len: usize,
}

impl DuckingEngine {
    /// Create an engine and its control handle.
    ///
    /// Fails when the config carries a zero sample rate or a channel
    /// count outside 1..=[`MAX_CHANNELS`]; all other out-of-range
    /// values are clamped.
    pub fn new(
        config: &EngineConfig,
        registry: Arc<dyn SourceRegistry>,
    ) -> Result<(Self, EngineControl)> {
        if config.ducker.sample_rate == 0 {
            return Err(Error::InvalidParameter {
                param: "sample_rate",
                reason: "must be positive".into(),
            });
        }
        if config.ducker.channels == 0 || config.ducker.channels > MAX_CHANNELS {
            return Err(Error::InvalidParameter {
                param: "channels",
                reason: format!("must be 1..={MAX_CHANNELS}, got {}", config.ducker.channels),
            });
        }

        let params = DerivedParams::from_config(&config.ducker);
        let ring = Arc::new(SidechainRing::new(params.channels));
        let tap: Arc<dyn CaptureTap> = Arc::clone(&ring) as Arc<dyn CaptureTap>;

        let shared = Arc::new(Shared {
            params: Mutex::new(params),
            binding: BindingManager::new(),
            ring,
            tap,
            registry,
        });
        shared.binding.retarget(config.source.as_deref());

        let engine = Self {
            shared: Arc::clone(&shared),
            gate: DuckGate::new(),
            scratch: Vec::new(),
            block_len: 0,
        };
        let control = EngineControl { shared };
        Ok((engine, control))
    }

    /// Current gate envelope value, for metering.
    pub fn gate_value(&self) -> f32 {
        self.gate.value()
    }

    /// Reset the gate state without touching configuration.
    pub fn reset(&mut self) {
        self.gate.reset();
    }

    /// Grow scratch storage for `frames` frames across `channels`
    /// channels. Only ever grows, so steady-state blocks allocate
    /// nothing.
    fn ensure_scratch(&mut self, channels: usize, frames: usize) {
        if frames > self.block_len {
            self.block_len = frames;
        }
        if self.scratch.len() != channels {
            self.scratch.resize_with(channels, Vec::new);
        }
        for channel in &mut self.scratch {
            if channel.len() < self.block_len {
                channel.resize(self.block_len, 0.0);
            }
        }
    }

    /// Process one block in place. See [`HostFilter::process_block`].
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        let frames = channels.first().map_or(0, |c| c.len());
        if frames == 0 {
            return;
        }

        let params = self.shared.snapshot_params();

        // Unbound (or expired) sidechain: pass through unmodified. The
        // snapshot also validates the weak reference for this block.
        if self.shared.binding.snapshot().is_none() {
            return;
        }

        self.ensure_scratch(params.channels, frames);
        self.shared.ring.pull(&mut self.scratch, frames);

        for i in 0..frames {
            let mut level = 0.0f32;
            for channel in channels.iter() {
                level = level.max(channel[i].abs());
            }
            let mut sidechain_level = 0.0f32;
            for channel in &self.scratch {
                sidechain_level = sidechain_level.max(channel[i].abs());
            }

            let gate = self.gate.advance(sidechain_level, &params);
            let gain = duck_gain(level, gate, &params);

            for channel in channels.iter_mut() {
                channel[i] *= gain;
            }
        }
    }
}

impl HostFilter for DuckingEngine {
    fn update(&self, config: &EngineConfig) {
        self.shared.apply_config(config);
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        DuckingEngine::process_block(self, channels);
    }

    fn tick(&self, seconds: f32) {
        self.shared
            .binding
            .tick(seconds, &*self.shared.registry, &self.shared.tap);
    }
}

impl Drop for DuckingEngine {
    fn drop(&mut self) {
        if let Some(source) = self.shared.binding.take() {
            source.unsubscribe(&self.shared.tap);
        }
    }
}
