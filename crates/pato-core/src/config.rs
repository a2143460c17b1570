//! Ducker configuration and derived per-sample parameters.
//!
//! Hosts describe the ducker with [`DuckerConfig`] in user-facing units
//! (dB, milliseconds). The audio path never touches those units: every
//! config change is compiled once into [`DerivedParams`], the linear
//! multipliers and per-sample rates the inner loop reads. Keeping the
//! two separated is what makes a config swap atomic — a block snapshots
//! one `DerivedParams` value and never sees a half-applied update.

use crate::math::{db_to_linear, ms_to_secs};

/// Maximum number of audio channels the engine supports.
pub const MAX_CHANNELS: usize = 8;

/// Compression ratio range.
pub const RATIO_RANGE: (f32, f32) = (1.0, 32.0);
/// Threshold range in dB, shared by all four thresholds.
pub const THRESHOLD_DB_RANGE: (f32, f32) = (-60.0, 0.0);
/// Attack time range in milliseconds.
pub const ATTACK_MS_RANGE: (f32, f32) = (1.0, 500.0);
/// Hold and release time range in milliseconds.
pub const HOLD_RELEASE_MS_RANGE: (f32, f32) = (1.0, 10000.0);

/// User-facing ducker configuration.
///
/// All fields are in natural units (dB, ms). Out-of-range values are
/// clamped when parameters are derived, never rejected; the only hard
/// contract violations are a zero sample rate or channel count, which
/// the engine layer rejects at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuckerConfig {
    /// Compression ratio (X:1), 1 to 32.
    pub ratio: f32,
    /// Compression knee in dB, -60 to 0.
    pub threshold_db: f32,
    /// Hard limiter ceiling in dB, -60 to 0.
    pub limiter_threshold_db: f32,
    /// Sidechain level that opens the gate, in dB.
    pub open_threshold_db: f32,
    /// Sidechain level below which the gate closes, in dB.
    pub close_threshold_db: f32,
    /// Gate attack time in ms, 1 to 500.
    pub attack_ms: f32,
    /// Gate hold time in ms, 1 to 10000.
    pub hold_ms: f32,
    /// Gate release time in ms, 1 to 10000.
    pub release_ms: f32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of audio channels, 1 to [`MAX_CHANNELS`].
    pub channels: usize,
}

impl Default for DuckerConfig {
    fn default() -> Self {
        Self {
            ratio: 2.0,
            threshold_db: -18.0,
            limiter_threshold_db: 0.0,
            open_threshold_db: -30.0,
            close_threshold_db: -30.0,
            attack_ms: 6.0,
            hold_ms: 200.0,
            release_ms: 60.0,
            sample_rate: 48000,
            channels: 2,
        }
    }
}

impl DuckerConfig {
    /// Return a copy with every field clamped into its valid range.
    pub fn clamped(&self) -> Self {
        let (db_lo, db_hi) = THRESHOLD_DB_RANGE;
        Self {
            ratio: self.ratio.clamp(RATIO_RANGE.0, RATIO_RANGE.1),
            threshold_db: self.threshold_db.clamp(db_lo, db_hi),
            limiter_threshold_db: self.limiter_threshold_db.clamp(db_lo, db_hi),
            open_threshold_db: self.open_threshold_db.clamp(db_lo, db_hi),
            close_threshold_db: self.close_threshold_db.clamp(db_lo, db_hi),
            attack_ms: self.attack_ms.clamp(ATTACK_MS_RANGE.0, ATTACK_MS_RANGE.1),
            hold_ms: self
                .hold_ms
                .clamp(HOLD_RELEASE_MS_RANGE.0, HOLD_RELEASE_MS_RANGE.1),
            release_ms: self
                .release_ms
                .clamp(HOLD_RELEASE_MS_RANGE.0, HOLD_RELEASE_MS_RANGE.1),
            sample_rate: self.sample_rate.max(1),
            channels: self.channels.clamp(1, MAX_CHANNELS),
        }
    }
}

/// Parameters derived from a [`DuckerConfig`], in the units the
/// per-sample loop consumes.
///
/// `Copy` on purpose: a processing block snapshots one value of this
/// struct, so a concurrent config update can never tear mid-block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedParams {
    /// Compression ratio (X:1).
    pub ratio: f32,
    /// Compression knee in dB.
    pub threshold_db: f32,
    /// Limiter ceiling in dB.
    pub limiter_threshold_db: f32,
    /// Linear sidechain level that opens the gate.
    pub open_threshold_mul: f32,
    /// Linear sidechain level below which the gate closes.
    pub close_threshold_mul: f32,
    /// Gate rise per sample while attacking.
    pub attack_rate: f32,
    /// Gate fall per sample while releasing.
    pub release_rate: f32,
    /// Hold time in seconds.
    pub hold_time_s: f32,
    /// Duration of one sample in seconds.
    pub sample_period_s: f32,
    /// Number of audio channels.
    pub channels: usize,
}

/// Smallest denominator allowed when deriving rates.
///
/// Guards against a degenerate config producing infinite rates; with
/// clamped inputs this floor is never reached, but derived values must
/// stay finite for any bit pattern a caller hands us.
const MIN_DENOMINATOR: f32 = 1e-6;

impl DerivedParams {
    /// Derive per-sample parameters from a config.
    ///
    /// The config is clamped first, so the same (possibly out-of-range)
    /// input always produces the same derived values.
    pub fn from_config(config: &DuckerConfig) -> Self {
        let c = config.clamped();
        let sample_rate = c.sample_rate as f32;

        let attack_samples = (ms_to_secs(c.attack_ms) * sample_rate).max(MIN_DENOMINATOR);
        let release_samples = (ms_to_secs(c.release_ms) * sample_rate).max(MIN_DENOMINATOR);

        Self {
            ratio: c.ratio,
            threshold_db: c.threshold_db,
            limiter_threshold_db: c.limiter_threshold_db,
            open_threshold_mul: db_to_linear(c.open_threshold_db),
            close_threshold_mul: db_to_linear(c.close_threshold_db),
            attack_rate: 1.0 / attack_samples,
            release_rate: 1.0 / release_samples,
            hold_time_s: ms_to_secs(c.hold_ms),
            sample_period_s: 1.0 / sample_rate.max(MIN_DENOMINATOR),
            channels: c.channels,
        }
    }
}

impl Default for DerivedParams {
    fn default() -> Self {
        Self::from_config(&DuckerConfig::default())
    }
}
