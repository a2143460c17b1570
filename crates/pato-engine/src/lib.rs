//! Real-time sidechain ducking engine.
//!
//! This crate wires the pato-core control law into a live audio
//! pipeline: a primary stream is attenuated based on the energy of a
//! separately captured sidechain stream. The hard requirements are no
//! dropouts and no unbounded latency — every per-block operation is
//! allocation-free in steady state and blocks only on short,
//! fine-grained mutex sections.
//!
//! # Architecture
//!
//! - [`SidechainRing`] - mutex-guarded per-channel buffer bridging the
//!   capture thread and the processing thread, with zero-fill underrun
//!   handling and a high-water-mark trim policy
//! - [`SourceRegistry`] / [`CaptureSource`] / [`CaptureTap`] - the
//!   boundary to the host's source world; [`MemoryRegistry`] and
//!   [`BroadcastSource`] are in-memory implementations
//! - [`BindingManager`] - weak-reference binding to a named source
//!   with rate-limited re-resolution
//! - [`DuckingEngine`] / [`EngineControl`] - the processing-thread
//!   driver and its cross-thread control handle, tied together by the
//!   [`HostFilter`] interface
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pato_engine::{BroadcastSource, DuckingEngine, EngineConfig, MemoryRegistry};
//!
//! let registry = Arc::new(MemoryRegistry::new());
//! let music = Arc::new(BroadcastSource::new());
//! registry.insert("music", &music);
//!
//! let config = EngineConfig {
//!     source: Some("music".into()),
//!     ..EngineConfig::default()
//! };
//! let (mut engine, control) = DuckingEngine::new(&config, registry).unwrap();
//!
//! // Bind the sidechain (normally driven periodically by the host).
//! control.tick(0.0);
//!
//! // Capture thread delivers sidechain frames...
//! let loud = [0.9f32; 256];
//! music.deliver(&[&loud, &loud], 256, false);
//!
//! // ...and the audio thread processes the primary stream in place.
//! let mut left = [0.8f32; 256];
//! let mut right = [0.8f32; 256];
//! let mut channels: Vec<&mut [f32]> = vec![&mut left, &mut right];
//! engine.process_block(&mut channels);
//! assert!(left[255] < 0.8);
//! ```

pub mod binding;
pub mod engine;
pub mod ring;
pub mod source;

pub use binding::{BindingManager, RESOLVE_INTERVAL_S};
pub use engine::{DuckingEngine, EngineConfig, EngineControl, HostFilter};
pub use ring::{Ring, SidechainRing};
pub use source::{BroadcastSource, CaptureSource, CaptureTap, MemoryRegistry, SourceRegistry};

// Re-export the core types hosts need to build a config.
pub use pato_core::{DerivedParams, DuckGate, DuckerConfig, MAX_CHANNELS};

/// Errors from engine construction and configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value violated the caller contract.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        param: &'static str,
        /// Description of why the value is invalid.
        reason: String,
    },
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
