//! # Noise Gate
//!
//! Post-processing attenuator for residual low-level noise. Tracks a
//! single envelope with fast attack and slow release; below the threshold
//! the gain falls off quadratically with the envelope, so attenuation is
//! monotonic in input level and the gain never jumps.

use crate::error::{DebleedError, Result};
use crate::frame::Sample;

const ATTACK_TIME_S: f32 = 0.001;
const RELEASE_TIME_S: f32 = 0.1;

/// Envelope-smoothed noise gate. The envelope is the only state carried
/// across frames; it is cleared on reset.
pub struct NoiseGate {
    /// Linear amplitude cutoff; 0 disables the gate
    threshold: f32,
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl NoiseGate {
    pub fn new(threshold: f32, sample_rate: u32) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "gate_threshold".to_string(),
                value: threshold.to_string(),
                reason: "must be zero or positive".to_string(),
            });
        }
        let rate = sample_rate as f32;
        Ok(Self {
            threshold,
            envelope: 0.0,
            attack_coeff: (-1.0 / (ATTACK_TIME_S * rate)).exp(),
            release_coeff: (-1.0 / (RELEASE_TIME_S * rate)).exp(),
        })
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        debug_assert!(threshold.is_finite() && threshold >= 0.0);
        self.threshold = threshold;
    }

    /// Gate the frame in place
    pub fn process(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            let level = sample.abs();

            if level > self.envelope {
                self.envelope = level + (self.envelope - level) * self.attack_coeff;
            } else {
                self.envelope = level + (self.envelope - level) * self.release_coeff;
            }

            *sample *= self.gain();
        }
    }

    // Unity above threshold, quadratic falloff below; monotonic in the
    // envelope and continuous at the threshold.
    fn gain(&self) -> f32 {
        if self.threshold <= 0.0 || self.envelope > self.threshold {
            1.0
        } else {
            let ratio = self.envelope / self.threshold;
            ratio * ratio
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
