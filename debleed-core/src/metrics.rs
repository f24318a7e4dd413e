//! # Separation Metrics
//!
//! Per-frame quality and performance metrics, published as a snapshot that
//! observers read without ever contending with the processing path. The
//! metrics are observational only and never feed back into cancellation.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::warn;

use crate::frame::{Sample, EPSILON};
use crate::xcorr::DelayEstimate;

/// Voice/noise split floor used when the gate is disabled (-60 dBFS)
const DEFAULT_SPLIT_LEVEL: f32 = 1e-3;

/// EMA weight for latency and load smoothing
const SMOOTHING: f32 = 0.9;

/// Published metrics snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Normalized drop in reference correlation from mic to output, 0-100
    pub echo_reduction_pct: f32,
    /// Output voice/noise ratio minus mic voice/noise ratio, in dB
    pub snr_improvement_db: f32,
    /// Smoothed wall-clock cost of one frame in milliseconds
    pub processing_latency_ms: f32,
    /// Smoothed processing time as a percentage of the frame period
    pub cpu_load_pct: f32,
    /// Total frames processed since start or reset
    pub frames_processed: u64,
    /// Frames whose processing time exceeded the frame period
    pub overload_count: u64,
    /// Most recent delay estimate, when the delay canceller has run
    pub delay_estimate: Option<DelayEstimate>,
}

/// Collector owning the published snapshot.
///
/// The processing path writes once per frame; observers clone the latest
/// snapshot through a read lock and never block the frame loop.
pub struct MetricsCollector {
    snapshot: RwLock<MetricsSnapshot>,
}

impl MetricsCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: RwLock::new(MetricsSnapshot::default()),
        })
    }

    /// Fold one processed frame into the published metrics.
    #[allow(clippy::too_many_arguments)]
    pub fn record_frame(
        &self,
        mic: &[Sample],
        reference: &[Sample],
        output: &[Sample],
        elapsed: Duration,
        frame_period: Duration,
        gate_threshold: f32,
        delay_estimate: Option<DelayEstimate>,
    ) {
        let latency_ms = elapsed.as_secs_f32() * 1000.0;
        let period_ms = frame_period.as_secs_f32() * 1000.0;
        let load_pct = if period_ms > 0.0 {
            latency_ms / period_ms * 100.0
        } else {
            0.0
        };
        let overloaded = elapsed > frame_period;
        if overloaded {
            warn!(
                "processing overload: {:.3}ms exceeds the {:.3}ms frame period; \
                 reduce max_lag or use a larger frame size",
                latency_ms, period_ms
            );
        }

        let echo_reduction = echo_reduction_pct(mic, reference, output);
        let snr_improvement = snr_improvement_db(mic, output, gate_threshold);

        if let Ok(mut snap) = self.snapshot.write() {
            if snap.frames_processed == 0 {
                snap.processing_latency_ms = latency_ms;
                snap.cpu_load_pct = load_pct;
            } else {
                snap.processing_latency_ms =
                    SMOOTHING * snap.processing_latency_ms + (1.0 - SMOOTHING) * latency_ms;
                snap.cpu_load_pct = SMOOTHING * snap.cpu_load_pct + (1.0 - SMOOTHING) * load_pct;
            }
            snap.echo_reduction_pct = echo_reduction;
            snap.snr_improvement_db = snr_improvement;
            snap.frames_processed += 1;
            if overloaded {
                snap.overload_count += 1;
            }
            snap.delay_estimate = delay_estimate;
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot
            .read()
            .map(|snap| snap.clone())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut snap) = self.snapshot.write() {
            *snap = MetricsSnapshot::default();
        }
    }
}

// Normalized cross-correlation of two equal-length frames
fn normalized_correlation(a: &[Sample], b: &[Sample]) -> f32 {
    let mut dot = 0.0f32;
    let mut energy_a = 0.0f32;
    let mut energy_b = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        energy_a += a[i] * a[i];
        energy_b += b[i] * b[i];
    }
    let norm = (energy_a * energy_b).sqrt();
    if norm > EPSILON {
        dot / norm
    } else {
        0.0
    }
}

// How much of the reference's presence in the mic survived into the output
fn echo_reduction_pct(mic: &[Sample], reference: &[Sample], output: &[Sample]) -> f32 {
    let corr_mic = normalized_correlation(reference, mic).abs();
    let corr_out = normalized_correlation(reference, output).abs();
    if corr_mic > 1e-6 {
        ((corr_mic - corr_out) / corr_mic * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

// Voice/noise ratio in dB, splitting samples at the gate threshold (or the
// default floor when the gate is disabled)
fn snr_db(frame: &[Sample], split_level: f32) -> f32 {
    let mut voice_power = 0.0f32;
    let mut voice_count = 0u32;
    let mut noise_power = 0.0f32;
    let mut noise_count = 0u32;

    for &sample in frame {
        if sample.abs() >= split_level {
            voice_power += sample * sample;
            voice_count += 1;
        } else {
            noise_power += sample * sample;
            noise_count += 1;
        }
    }

    let voice = if voice_count > 0 {
        voice_power / voice_count as f32
    } else {
        EPSILON
    };
    let noise = if noise_count > 0 {
        noise_power / noise_count as f32
    } else {
        EPSILON
    };
    10.0 * (voice.max(EPSILON) / noise.max(EPSILON)).log10()
}

fn snr_improvement_db(mic: &[Sample], output: &[Sample], gate_threshold: f32) -> f32 {
    let split_level = if gate_threshold > 0.0 {
        gate_threshold
    } else {
        DEFAULT_SPLIT_LEVEL
    };
    snr_db(output, split_level) - snr_db(mic, split_level)
}
