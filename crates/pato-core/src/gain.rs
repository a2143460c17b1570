//! Gain law: ratio compression plus a hard limiter ceiling.
//!
//! Converts the primary signal's instantaneous level and the gate value
//! into one linear multiplier applied to every channel of the sample.

use crate::config::DerivedParams;
use crate::math::{db_to_linear, linear_to_db};

/// Compute the linear gain for one sample.
///
/// `level` is the linear peak magnitude across primary channels, `gate`
/// the current envelope value in [0, 1]. The reduction is the larger of
/// the ratio law (overage scaled by `1 - 1/ratio`) and the limiter term
/// (everything above the limiter ceiling), scaled by the gate. The
/// result is always in (0, 1]; the ducker never amplifies.
#[inline]
pub fn duck_gain(level: f32, gate: f32, params: &DerivedParams) -> f32 {
    let level_db = linear_to_db(level);

    let delta_db = (level_db - params.threshold_db).max(0.0);
    let ratio_reduction_db = delta_db - delta_db / params.ratio;
    let limiter_reduction_db = level_db - params.limiter_threshold_db;

    let reduction_db = ratio_reduction_db.max(limiter_reduction_db) * gate;

    if reduction_db > 0.0 {
        1.0 / db_to_linear(reduction_db)
    } else {
        1.0
    }
}
