//! Gated envelope follower driving the duck amount.
//!
//! The gate watches the sidechain level and produces a control value in
//! [0, 1] that scales the gain reduction: 1 means the duck is fully
//! engaged, 0 means the primary signal passes untouched. Opening and
//! closing use separate thresholds so levels sitting between the two
//! don't chatter the gate.

use crate::config::DerivedParams;

/// Per-sample gate state.
///
/// This is a continuous-time filter state: it persists across blocks
/// and is only ever advanced by the processing thread.
///
/// # Example
///
/// ```rust
/// use pato_core::{DerivedParams, DuckGate};
///
/// let params = DerivedParams::default();
/// let mut gate = DuckGate::new();
///
/// // A loud sidechain sample pushes the gate toward 1.
/// let g = gate.advance(0.5, &params);
/// assert!(g > 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DuckGate {
    /// Envelope value in [0, 1].
    gate: f32,
    /// Whether the sidechain level last crossed the open threshold.
    open: bool,
    /// Time spent in hold since the gate closed, in seconds.
    held_s: f32,
}

impl DuckGate {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current envelope value in [0, 1].
    pub fn value(&self) -> f32 {
        self.gate
    }

    /// Whether the gate is currently open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Clear all state without touching parameters.
    pub fn reset(&mut self) {
        self.gate = 0.0;
        self.open = false;
        self.held_s = 0.0;
    }

    /// Advance the gate by one sample and return the new envelope value.
    ///
    /// `sidechain_level` is the linear peak magnitude across sidechain
    /// channels for this sample. While the gate is open the envelope
    /// rises at the attack rate; after it closes the envelope keeps
    /// rising for the hold time, then falls at the release rate.
    #[inline]
    pub fn advance(&mut self, sidechain_level: f32, params: &DerivedParams) -> f32 {
        if sidechain_level > params.open_threshold_mul {
            self.open = true;
            self.held_s = 0.0;
        } else if sidechain_level < params.close_threshold_mul {
            self.open = false;
        }
        // Levels between the two thresholds keep the previous state.

        if self.open {
            self.gate = (self.gate + params.attack_rate).min(1.0);
        } else if self.held_s < params.hold_time_s {
            self.held_s += params.sample_period_s;
            self.gate = (self.gate + params.attack_rate).min(1.0);
        } else {
            self.gate = (self.gate - params.release_rate).max(0.0);
        }

        self.gate
    }
}
