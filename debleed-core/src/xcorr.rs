//! # Cross-Correlation Delay Canceller
//!
//! Estimates the echo path delay (speaker-to-mic propagation plus buffering
//! latency) by searching the cross-correlation between the mic frame and
//! the reference over a bounded lag range, then subtracts a scaled copy of
//! the reference aligned at the best lag. The search window is the current
//! frame extended with trailing history carried across frames, so the
//! estimate does not oscillate sample-to-sample.
//!
//! Cost is O(frame_size * max_lag) per frame, the dominant cost of the
//! engine; `max_lag` is validated against the frame size at configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DebleedError, Result};
use crate::frame::{self, Sample, EPSILON};

/// Result of one delay search: the winning lag in samples and its
/// normalized correlation magnitude. Recomputed every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayEstimate {
    /// Echo path delay in samples; positive means the mic lags the reference
    pub lag: i32,
    /// Normalized correlation magnitude at the winning lag, in [0, 1]
    pub score: f32,
}

/// Delay-estimating canceller with rolling trailing histories
pub struct CrossCorrelationCanceller {
    max_lag: usize,
    /// Last `max_lag` mic samples from the previous frame, oldest first
    mic_history: Vec<Sample>,
    /// Last `max_lag` reference samples from the previous frame, oldest first
    ref_history: Vec<Sample>,
    last_estimate: Option<DelayEstimate>,
}

impl CrossCorrelationCanceller {
    /// Create a canceller searching lags in [-max_lag, +max_lag].
    ///
    /// The trailing histories are refilled from a single frame, so
    /// `max_lag` must not exceed `frame_size`.
    pub fn new(max_lag: usize, frame_size: usize) -> Result<Self> {
        if max_lag == 0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "max_lag".to_string(),
                value: max_lag.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if max_lag > frame_size {
            return Err(DebleedError::InvalidConfiguration {
                field: "max_lag".to_string(),
                value: max_lag.to_string(),
                reason: format!("exceeds available history (frame size is {})", frame_size),
            });
        }
        Ok(Self {
            max_lag,
            mic_history: vec![0.0; max_lag],
            ref_history: vec![0.0; max_lag],
            last_estimate: None,
        })
    }

    /// Estimate the delay over the current window and cancel the aligned,
    /// scaled reference from the mic frame.
    pub fn process(&mut self, mic: &[Sample], reference: &[Sample], output: &mut [Sample]) {
        let n = mic.len();
        let span = self.max_lag as i32;

        // Search for the lag with the strongest correlation magnitude;
        // ties resolve toward the smallest |lag|.
        let mut best_lag = 0i32;
        let mut best_corr = 0.0f32;
        let mut best_mag = f32::NEG_INFINITY;
        for lag in -span..=span {
            let corr = self.correlation_at(mic, reference, lag);
            let mag = corr.abs();
            if mag > best_mag || (mag == best_mag && lag.abs() < best_lag.abs()) {
                best_mag = mag;
                best_corr = corr;
                best_lag = lag;
            }
        }

        // Coupling gain: correlation normalized by aligned reference energy
        let ref_energy = self.aligned_ref_energy(reference, best_lag, n);
        let beta = best_corr / (ref_energy + EPSILON);

        // Subtract the aligned, scaled reference. For a negative lag the
        // tail samples whose aligned reference is not yet available pass
        // through uncancelled.
        for i in 0..n {
            output[i] = mic[i] - beta * self.ref_at(reference, i as i32 - best_lag);
        }

        let norm = (frame::energy(mic) * ref_energy).sqrt();
        let score = if norm > EPSILON {
            (best_mag / norm).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.last_estimate = Some(DelayEstimate { lag: best_lag, score });

        self.mic_history.copy_from_slice(&mic[n - self.max_lag..]);
        self.ref_history.copy_from_slice(&reference[n - self.max_lag..]);
    }

    /// Most recent delay estimate, if a frame has been processed
    pub fn last_estimate(&self) -> Option<DelayEstimate> {
        self.last_estimate
    }

    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    /// Clear the trailing histories and the last estimate
    pub fn reset(&mut self) {
        self.mic_history.fill(0.0);
        self.ref_history.fill(0.0);
        self.last_estimate = None;
    }

    // Reference sample at window index: negative indices read the trailing
    // history, indices past the frame (future samples) contribute zero.
    fn ref_at(&self, reference: &[Sample], idx: i32) -> Sample {
        if idx < 0 {
            self.ref_history[(self.max_lag as i32 + idx) as usize]
        } else if (idx as usize) < reference.len() {
            reference[idx as usize]
        } else {
            0.0
        }
    }

    fn mic_at(&self, mic: &[Sample], idx: i32) -> Sample {
        if idx < 0 {
            self.mic_history[(self.max_lag as i32 + idx) as usize]
        } else {
            mic[idx as usize]
        }
    }

    // Cross-correlation of mic[i] with reference[i - lag] over the frame.
    // Both forms sum exactly frame_size products; out-of-frame indices
    // come from the trailing histories.
    fn correlation_at(&self, mic: &[Sample], reference: &[Sample], lag: i32) -> f32 {
        let n = mic.len() as i32;
        let mut corr = 0.0f32;
        if lag >= 0 {
            for i in 0..n {
                corr += mic[i as usize] * self.ref_at(reference, i - lag);
            }
        } else {
            for j in 0..n {
                corr += self.mic_at(mic, j + lag) * reference[j as usize];
            }
        }
        corr
    }

    // Energy of the reference samples the correlation was computed against
    fn aligned_ref_energy(&self, reference: &[Sample], lag: i32, n: usize) -> f32 {
        if lag >= 0 {
            let mut energy = 0.0f32;
            for i in 0..n as i32 {
                let r = self.ref_at(reference, i - lag);
                energy += r * r;
            }
            energy
        } else {
            reference.iter().map(|&r| r * r).sum()
        }
    }
}
