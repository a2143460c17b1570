//! Level conversion math for the ducking DSP path.
//!
//! All functions are allocation-free and suitable for `no_std`. The
//! per-sample gain law works in the dB domain, so these conversions are
//! the innermost functions of the engine.

use libm::{expf, logf};

/// Floor applied to linear levels before taking the logarithm.
///
/// Maps silence to roughly -200 dB instead of -inf, so the gain law
/// treats a silent sample as "far below every threshold" without any
/// NaN/Inf special-casing downstream.
pub const LEVEL_FLOOR: f32 = 1e-10;

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use pato_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// The input is floored at [`LEVEL_FLOOR`], so the result is always
/// finite (silence maps to about -200 dB).
///
/// # Example
/// ```rust
/// use pato_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(LEVEL_FLOOR)) * FACTOR
}

/// Convert milliseconds to seconds.
#[inline]
pub fn ms_to_secs(ms: f32) -> f32 {
    ms / 1000.0
}
