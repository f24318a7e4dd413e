//! # Adaptive Echo Canceller (NLMS)
//!
//! Models the loudspeaker-to-microphone path with an adaptive FIR filter,
//! subtracts the predicted echo from the mic signal, and adapts the filter
//! toward minimizing the residual:
//!
//! ```text
//! w(n+1) = w(n) + mu * e(n) * x(n) / (||x||^2 + eps)
//! ```
//!
//! where `w` is the weight vector, `x` the most recent reference samples,
//! `e` the residual, and `eps` keeps the update defined when the reference
//! is silent.

use crate::error::{DebleedError, Result};
use crate::frame::{Sample, EPSILON};

/// NLMS adaptive echo canceller.
///
/// The reference history is a fixed-capacity circular buffer indexed with
/// an offset, preserving the most-recent-first ordering without shifting
/// elements each sample.
pub struct AdaptiveCanceller {
    /// Adaptive filter coefficients, one per history tap
    weights: Vec<Sample>,
    /// Last `filter_length` reference samples, circular
    history: Vec<Sample>,
    /// Index of the most recent reference sample in `history`
    newest: usize,
    /// Adaptation step size mu
    step_size: f32,
}

impl AdaptiveCanceller {
    /// Create a canceller with `filter_length` taps.
    ///
    /// `filter_length` of 0 or a non-positive `step_size` is a
    /// configuration error, not a clamp.
    pub fn new(filter_length: usize, step_size: f32) -> Result<Self> {
        if filter_length == 0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "filter_length".to_string(),
                value: filter_length.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "step_size".to_string(),
                value: step_size.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(Self {
            weights: vec![0.0; filter_length],
            history: vec![0.0; filter_length],
            newest: 0,
            step_size,
        })
    }

    /// Process one frame; the residual error is the output.
    ///
    /// Samples are consumed in strict temporal order; each one updates the
    /// history, the prediction, and the weights before the next is read.
    pub fn process(&mut self, mic: &[Sample], reference: &[Sample], output: &mut [Sample]) {
        let taps = self.weights.len();

        for i in 0..mic.len() {
            // Newest reference sample lands at the head of the window
            self.newest = (self.newest + taps - 1) % taps;
            self.history[self.newest] = reference[i];

            // Predicted echo: weights against history, most-recent-first
            let mut predicted = 0.0f32;
            for j in 0..taps {
                predicted += self.weights[j] * self.history[(self.newest + j) % taps];
            }

            let error = mic[i] - predicted;
            output[i] = error;

            // Reference power for normalization; eps keeps silence safe
            let mut power = 0.0f32;
            for &sample in &self.history {
                power += sample * sample;
            }
            let gain = self.step_size * error / (power + EPSILON);

            for j in 0..taps {
                self.weights[j] += gain * self.history[(self.newest + j) % taps];
            }
        }
    }

    /// Adjust the step size; the learned weights are untouched.
    pub fn set_step_size(&mut self, step_size: f32) {
        debug_assert!(step_size.is_finite() && step_size > 0.0);
        self.step_size = step_size;
    }

    /// Current filter weights, for diagnostics
    pub fn weights(&self) -> &[Sample] {
        &self.weights
    }

    /// Clear the learned echo model and the reference history
    pub fn reset(&mut self) {
        self.weights.fill(0.0);
        self.history.fill(0.0);
        self.newest = 0;
    }
}
