//! # Debleed Core
//!
//! Real-time separation of voice from loudspeaker bleed. Two synchronized
//! streams come in - a microphone frame contaminated by what the speakers
//! are playing, and a reference frame of that speaker signal - and a clean
//! voice frame comes out.
//!
//! This library provides:
//! - NLMS adaptive echo cancellation with numerically stable normalization
//! - Per-sample spectral subtraction with an over-subtraction floor
//! - Cross-correlation delay estimation and aligned cancellation
//! - A hybrid chain (adaptive residual into spectral subtraction)
//! - An envelope-smoothed noise gate and per-frame quality metrics
//!
//! ## Example Usage
//!
//! ```rust
//! use debleed_core::{Config, DebleedProcessor};
//!
//! # fn main() -> Result<(), debleed_core::DebleedError> {
//! let config = Config::default();
//! let frame_size = config.session.frame_size;
//! let mut processor = DebleedProcessor::new(config)?;
//!
//! let mic = vec![0.1f32; frame_size];
//! let reference = vec![0.05f32; frame_size];
//! let mut output = vec![0.0f32; frame_size];
//!
//! processor.process_frame(&mic, &reference, &mut output)?;
//! let metrics = processor.metrics();
//! println!("echo reduction: {:.1}%", metrics.echo_reduction_pct);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod gate;
pub mod metrics;
pub mod nlms;
pub mod pipeline;
pub mod spectral;
pub mod xcorr;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub use config::{CancellationMode, Config, ProcessingParams, SessionConfig};
pub use error::{DebleedError, Result};
pub use frame::Sample;
pub use gate::NoiseGate;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use nlms::AdaptiveCanceller;
pub use pipeline::SeparationPipeline;
pub use spectral::SpectralCanceller;
pub use xcorr::{CrossCorrelationCanceller, DelayEstimate};

/// Top-level separation session.
///
/// Owns the pipeline, the current parameter snapshot, and the metrics
/// collector. Frames are processed strictly sequentially; parameter
/// updates land atomically between frames via [`configure`].
///
/// [`configure`]: DebleedProcessor::configure
pub struct DebleedProcessor {
    session: SessionConfig,
    params: ProcessingParams,
    pipeline: SeparationPipeline,
    metrics: Arc<MetricsCollector>,
    frame_period: Duration,
}

impl DebleedProcessor {
    /// Create a processor from a validated configuration. Construction
    /// fails before any frame is processed if the configuration is
    /// invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing debleed processor: {}Hz, {} frames, mode {}",
            config.session.sample_rate, config.session.frame_size, config.params.mode
        );
        debug!(
            "filter length {}, max lag {}, mu {}, alpha {}, gate {}",
            config.session.filter_length,
            config.params.max_lag,
            config.params.step_size,
            config.params.spectral_strength,
            config.params.gate_threshold
        );

        let pipeline = SeparationPipeline::new(&config.session, &config.params)?;
        let frame_period = config.session.frame_period();

        Ok(Self {
            session: config.session,
            params: config.params,
            pipeline,
            metrics: MetricsCollector::new(),
            frame_period,
        })
    }

    /// Swap in a new parameter snapshot between frames.
    ///
    /// The whole snapshot is validated before anything is applied, so a
    /// rejected update leaves the previous parameters fully in effect.
    /// Mode switches never reset the adaptive filter state.
    pub fn configure(&mut self, params: ProcessingParams) -> Result<()> {
        params.validate(self.session.frame_size)?;
        self.pipeline.apply_params(&params)?;
        if params.mode != self.params.mode {
            debug!("switching mode: {} -> {}", self.params.mode, params.mode);
        }
        self.params = params;
        Ok(())
    }

    /// Process one mic/reference frame pair into `output`.
    ///
    /// All three frames must have the session's fixed frame length; a
    /// mismatch fails the call without touching any persistent state.
    pub fn process_frame(
        &mut self,
        mic: &[Sample],
        reference: &[Sample],
        output: &mut [Sample],
    ) -> Result<()> {
        let start = Instant::now();
        self.pipeline.process(self.params.mode, mic, reference, output)?;
        let elapsed = start.elapsed();

        self.metrics.record_frame(
            mic,
            reference,
            output,
            elapsed,
            self.frame_period,
            self.params.gate_threshold,
            self.pipeline.delay_estimate(),
        );
        Ok(())
    }

    /// Latest published metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Shared handle for observers that poll metrics from another thread
    pub fn metrics_handle(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    /// Session geometry (fixed for the processor lifetime)
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Current parameter snapshot
    pub fn params(&self) -> &ProcessingParams {
        &self.params
    }

    /// Reinitialize all persistent state: filter weights, histories, delay
    /// window, gate envelope, and metrics counters.
    pub fn reset(&mut self) {
        info!("Resetting debleed processor");
        self.pipeline.reset();
        self.metrics.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, step: f32, offset: usize) -> Vec<f32> {
        (0..len)
            .map(|i| ((i + offset) as f32 * step).sin() * 0.4)
            .collect()
    }

    #[test]
    fn test_processor_creation() {
        assert!(DebleedProcessor::new(Config::default()).is_ok());

        let mut config = Config::default();
        config.params.step_size = -1.0;
        assert!(DebleedProcessor::new(config).is_err());

        let mut config = Config::default();
        config.params.max_lag = config.session.frame_size + 1;
        assert!(DebleedProcessor::new(config).is_err());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let config = Config::default();
        let n = config.session.frame_size;
        let mut a = DebleedProcessor::new(config.clone()).unwrap();
        let mut b = DebleedProcessor::new(config).unwrap();

        let mut out_a = vec![0.0f32; n];
        let mut out_b = vec![0.0f32; n];

        for k in 0..20 {
            let mic = tone(n, 0.13, k * n);
            let reference = tone(n, 0.07, k * n);
            a.process_frame(&mic, &reference, &mut out_a).unwrap();
            b.process_frame(&mic, &reference, &mut out_b).unwrap();
            assert_eq!(out_a, out_b, "frame {}", k);
        }
    }

    #[test]
    fn test_mode_switch_is_safe() {
        let config = Config::default();
        let n = config.session.frame_size;
        let mut processor = DebleedProcessor::new(config.clone()).unwrap();
        let mic = tone(n, 0.13, 0);
        let reference = tone(n, 0.07, 0);
        let mut output = vec![0.0f32; n];

        processor.process_frame(&mic, &reference, &mut output).unwrap();

        for &mode in CancellationMode::all() {
            let mut params = *processor.params();
            params.mode = mode;
            assert!(processor.configure(params).is_ok());
            assert!(processor.process_frame(&mic, &reference, &mut output).is_ok());
        }
    }

    #[test]
    fn test_precondition_violation() {
        let config = Config::default();
        let n = config.session.frame_size;
        let mut processor = DebleedProcessor::new(config).unwrap();
        let mic = tone(n, 0.13, 0);
        let reference = tone(n / 2, 0.07, 0);
        let mut output = vec![0.0f32; n];

        let err = processor.process_frame(&mic, &reference, &mut output).unwrap_err();
        assert!(matches!(err, DebleedError::FrameMismatch { .. }));

        // Nothing was recorded for the failed call
        assert_eq!(processor.metrics().frames_processed, 0);
    }

    #[test]
    fn test_rejected_configure_keeps_previous_params() {
        let config = Config::default();
        let mut processor = DebleedProcessor::new(config).unwrap();
        let before = *processor.params();

        let mut bad = before;
        bad.spectral_strength = 2.0;
        assert!(processor.configure(bad).is_err());
        assert_eq!(*processor.params(), before);
    }

    #[test]
    fn test_adaptive_end_to_end_reduces_bleed() {
        // Mic hears an attenuated copy of the reference plus a quiet tone;
        // after adaptation the reference correlation should mostly vanish.
        let mut config = Config::default();
        config.params.mode = CancellationMode::Adaptive;
        let n = config.session.frame_size;
        let mut processor = DebleedProcessor::new(config).unwrap();
        let mut output = vec![0.0f32; n];

        for k in 0..60 {
            let reference = tone(n, 0.19, k * n);
            let voice = tone(n, 0.031, k * n);
            let mic: Vec<f32> = reference
                .iter()
                .zip(&voice)
                .map(|(&r, &v)| 0.6 * r + 0.2 * v)
                .collect();
            processor.process_frame(&mic, &reference, &mut output).unwrap();
        }

        let metrics = processor.metrics();
        assert!(
            metrics.echo_reduction_pct > 30.0,
            "echo reduction {}",
            metrics.echo_reduction_pct
        );
        assert_eq!(metrics.frames_processed, 60);
    }

    #[test]
    fn test_reset_reinitializes() {
        let config = Config::default();
        let n = config.session.frame_size;
        let mut processor = DebleedProcessor::new(config).unwrap();
        let mic = tone(n, 0.13, 0);
        let reference = tone(n, 0.07, 0);
        let mut output = vec![0.0f32; n];

        processor.process_frame(&mic, &reference, &mut output).unwrap();
        assert_eq!(processor.metrics().frames_processed, 1);

        processor.reset();
        assert_eq!(processor.metrics().frames_processed, 0);
    }
}
