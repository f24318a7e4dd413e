//! # Spectral Subtraction Canceller
//!
//! Per-sample time-domain subtraction: the reference scaled by the
//! subtraction strength is treated as the noise estimate and removed from
//! the mic sample, bounded below by a spectral floor so over-subtraction
//! never collapses the voice. Stateless across frames.

use crate::error::{DebleedError, Result};
use crate::frame::Sample;

/// Minimum output magnitude relative to the mic sample
pub const SPECTRAL_FLOOR_RATIO: f32 = 0.1;

/// Per-sample spectral subtraction canceller
pub struct SpectralCanceller {
    /// Subtraction strength alpha in [0, 1]
    strength: f32,
}

impl SpectralCanceller {
    pub fn new(strength: f32) -> Result<Self> {
        if !strength.is_finite() || !(0.0..=1.0).contains(&strength) {
            return Err(DebleedError::InvalidConfiguration {
                field: "spectral_strength".to_string(),
                value: strength.to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        Ok(Self { strength })
    }

    pub fn set_strength(&mut self, strength: f32) {
        debug_assert!((0.0..=1.0).contains(&strength));
        self.strength = strength;
    }

    /// Subtract the scaled reference from the mic, floor-bounded.
    ///
    /// strength 0 passes the mic through unchanged; strength 1 is
    /// full-strength subtraction still bounded by the floor.
    pub fn process(&self, mic: &[Sample], reference: &[Sample], output: &mut [Sample]) {
        for i in 0..mic.len() {
            let estimated_noise = self.strength * reference[i];
            let subtracted = mic[i] - estimated_noise;
            let floor = SPECTRAL_FLOOR_RATIO * mic[i].abs();
            output[i] = subtracted.signum() * subtracted.abs().max(floor);
        }
    }
}
