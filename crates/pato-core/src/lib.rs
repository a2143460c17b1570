//! Pato Core - sidechain ducking DSP primitives
//!
//! This crate holds the pure, allocation-free half of the pato ducking
//! engine: the control law that turns a sidechain level into a gain
//! multiplier. Everything here is per-sample scalar math with no locks,
//! no I/O, and no heap, so it can run inside a hard real-time audio
//! callback (or on embedded targets via `no_std`).
//!
//! # Core Abstractions
//!
//! - [`DuckerConfig`] - user-facing configuration in dB / ms
//! - [`DerivedParams`] - the compiled per-sample parameters a block
//!   snapshots atomically
//! - [`DuckGate`] - gated envelope follower with open/close hysteresis,
//!   hold, and attack/release ramps
//! - [`duck_gain`] - ratio compression combined with a hard limiter
//!   ceiling, scaled by the gate value
//!
//! # Signal Flow
//!
//! ```text
//! sidechain level → DuckGate → gate ∈ [0,1]
//!                                 ↓
//! primary level ────────────→ duck_gain → multiplier applied per channel
//! ```
//!
//! # Example
//!
//! ```rust
//! use pato_core::{DerivedParams, DuckGate, DuckerConfig, duck_gain};
//!
//! let params = DerivedParams::from_config(&DuckerConfig::default());
//! let mut gate = DuckGate::new();
//!
//! // One sample: loud sidechain, loud primary.
//! let g = gate.advance(0.5, &params);
//! let gain = duck_gain(0.9, g, &params);
//! assert!(gain <= 1.0);
//! ```
//!
//! # no_std Support
//!
//! Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! pato-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod config;
pub mod gain;
pub mod gate;
pub mod math;

pub use config::{
    ATTACK_MS_RANGE, DerivedParams, DuckerConfig, HOLD_RELEASE_MS_RANGE, MAX_CHANNELS,
    RATIO_RANGE, THRESHOLD_DB_RANGE,
};
pub use gain::duck_gain;
pub use gate::DuckGate;
pub use math::{LEVEL_FLOOR, db_to_linear, linear_to_db, ms_to_secs};
