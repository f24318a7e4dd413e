//! # Separation Pipeline
//!
//! Routes each mic/reference frame pair through the canceller selected by
//! the current mode, then the noise gate. Owns every piece of persistent
//! algorithm state; all buffers are allocated at construction and reused,
//! so the per-frame path is allocation-free.

use crate::config::{CancellationMode, ProcessingParams, SessionConfig};
use crate::error::Result;
use crate::frame::{self, Sample};
use crate::gate::NoiseGate;
use crate::nlms::AdaptiveCanceller;
use crate::spectral::SpectralCanceller;
use crate::xcorr::{CrossCorrelationCanceller, DelayEstimate};

/// The processing chain behind `DebleedProcessor`.
///
/// Mode dispatch happens per call; the adaptive filter state survives mode
/// switches and is only cleared by an explicit `reset`.
pub struct SeparationPipeline {
    frame_size: usize,
    adaptive: AdaptiveCanceller,
    spectral: SpectralCanceller,
    xcorr: CrossCorrelationCanceller,
    gate: NoiseGate,
    /// Intermediate buffer for the hybrid chain
    scratch: Vec<Sample>,
}

impl SeparationPipeline {
    pub fn new(session: &SessionConfig, params: &ProcessingParams) -> Result<Self> {
        session.validate()?;
        params.validate(session.frame_size)?;

        Ok(Self {
            frame_size: session.frame_size,
            adaptive: AdaptiveCanceller::new(session.filter_length, params.step_size)?,
            spectral: SpectralCanceller::new(params.spectral_strength)?,
            xcorr: CrossCorrelationCanceller::new(params.max_lag, session.frame_size)?,
            gate: NoiseGate::new(params.gate_threshold, session.sample_rate)?,
            scratch: vec![0.0; session.frame_size],
        })
    }

    /// Apply a validated parameter snapshot. Tuning values update in
    /// place; a changed `max_lag` rebuilds only the transient delay
    /// window, never the adaptive filter state.
    pub fn apply_params(&mut self, params: &ProcessingParams) -> Result<()> {
        params.validate(self.frame_size)?;

        self.adaptive.set_step_size(params.step_size);
        self.spectral.set_strength(params.spectral_strength);
        self.gate.set_threshold(params.gate_threshold);
        if params.max_lag != self.xcorr.max_lag() {
            self.xcorr = CrossCorrelationCanceller::new(params.max_lag, self.frame_size)?;
        }
        Ok(())
    }

    /// Process one frame pair through the selected canceller and the gate.
    ///
    /// Frame shapes are checked before any state is touched; a mismatch
    /// fails the call and leaves every canceller untouched.
    pub fn process(
        &mut self,
        mode: CancellationMode,
        mic: &[Sample],
        reference: &[Sample],
        output: &mut [Sample],
    ) -> Result<()> {
        frame::validate_frames(mic, reference, output, self.frame_size)?;

        match mode {
            CancellationMode::Adaptive => {
                self.adaptive.process(mic, reference, output);
            }
            CancellationMode::Spectral => {
                self.spectral.process(mic, reference, output);
            }
            CancellationMode::CrossCorrelation => {
                self.xcorr.process(mic, reference, output);
            }
            CancellationMode::Hybrid => {
                self.adaptive.process(mic, reference, &mut self.scratch);
                self.spectral.process(&self.scratch, reference, output);
            }
        }

        self.gate.process(output);
        Ok(())
    }

    /// Most recent delay estimate from the cross-correlation canceller
    pub fn delay_estimate(&self) -> Option<DelayEstimate> {
        self.xcorr.last_estimate()
    }

    /// Current adaptive filter weights, for diagnostics
    pub fn adaptive_weights(&self) -> &[Sample] {
        self.adaptive.weights()
    }

    /// Reinitialize all persistent state: weights, histories, delay
    /// window, and gate envelope.
    pub fn reset(&mut self) {
        self.adaptive.reset();
        self.xcorr.reset();
        self.gate.reset();
        self.scratch.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_pipeline() -> SeparationPipeline {
        let config = Config::default();
        SeparationPipeline::new(&config.session, &config.params).unwrap()
    }

    fn tone(len: usize, step: f32) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * step).sin() * 0.4).collect()
    }

    #[test]
    fn test_all_modes_dispatch() {
        let mut pipeline = test_pipeline();
        let n = 256;
        let mic = tone(n, 0.13);
        let reference = tone(n, 0.07);
        let mut output = vec![0.0f32; n];

        for &mode in CancellationMode::all() {
            assert!(pipeline.process(mode, &mic, &reference, &mut output).is_ok());
            assert!(output.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn test_hybrid_chains_adaptive_into_spectral() {
        let n = 256;
        let mic = tone(n, 0.13);
        let reference = tone(n, 0.07);

        let config = Config::default();
        let mut hybrid = SeparationPipeline::new(&config.session, &config.params).unwrap();
        let mut manual = SeparationPipeline::new(&config.session, &config.params).unwrap();

        let mut hybrid_out = vec![0.0f32; n];
        hybrid.process(CancellationMode::Hybrid, &mic, &reference, &mut hybrid_out).unwrap();

        // Same composition by hand: adaptive residual becomes the spectral
        // canceller's mic input, then the gate.
        let mut residual = vec![0.0f32; n];
        manual.adaptive.process(&mic, &reference, &mut residual);
        let mut manual_out = vec![0.0f32; n];
        manual.spectral.process(&residual, &reference, &mut manual_out);
        manual.gate.process(&mut manual_out);

        assert_eq!(hybrid_out, manual_out);
    }

    #[test]
    fn test_mismatch_leaves_state_unchanged() {
        let mut pipeline = test_pipeline();
        let n = 256;
        let mic = tone(n, 0.13);
        let reference = tone(n, 0.07);
        let mut output = vec![0.0f32; n];

        // Learn something first
        pipeline
            .process(CancellationMode::Adaptive, &mic, &reference, &mut output)
            .unwrap();
        let weights_before = pipeline.adaptive_weights().to_vec();

        let short = vec![0.0f32; n / 2];
        assert!(pipeline
            .process(CancellationMode::Adaptive, &mic, &short, &mut output)
            .is_err());
        assert!(pipeline
            .process(CancellationMode::Adaptive, &short, &reference, &mut output)
            .is_err());

        assert_eq!(pipeline.adaptive_weights(), &weights_before[..]);
    }

    #[test]
    fn test_mode_switch_preserves_adaptive_state() {
        let mut pipeline = test_pipeline();
        let n = 256;
        let mic = tone(n, 0.13);
        let reference = tone(n, 0.07);
        let mut output = vec![0.0f32; n];

        pipeline
            .process(CancellationMode::Adaptive, &mic, &reference, &mut output)
            .unwrap();
        let weights = pipeline.adaptive_weights().to_vec();

        // Other modes never touch the adaptive filter
        pipeline
            .process(CancellationMode::Spectral, &mic, &reference, &mut output)
            .unwrap();
        pipeline
            .process(CancellationMode::CrossCorrelation, &mic, &reference, &mut output)
            .unwrap();
        assert_eq!(pipeline.adaptive_weights(), &weights[..]);

        pipeline.reset();
        assert!(pipeline.adaptive_weights().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_apply_params_keeps_weights() {
        let config = Config::default();
        let mut pipeline = SeparationPipeline::new(&config.session, &config.params).unwrap();
        let n = 256;
        let mic = tone(n, 0.13);
        let reference = tone(n, 0.07);
        let mut output = vec![0.0f32; n];

        pipeline
            .process(CancellationMode::Adaptive, &mic, &reference, &mut output)
            .unwrap();
        let weights = pipeline.adaptive_weights().to_vec();

        let mut params = config.params;
        params.step_size = 0.8;
        params.max_lag = 64;
        pipeline.apply_params(&params).unwrap();

        assert_eq!(pipeline.adaptive_weights(), &weights[..]);
    }
}
