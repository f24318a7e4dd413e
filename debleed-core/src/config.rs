//! # Session Configuration and Processing Parameters
//!
//! Splits configuration the way the engine consumes it: `SessionConfig`
//! fixes the frame geometry for the lifetime of a processor, while
//! `ProcessingParams` carries the tuning knobs that may be swapped
//! atomically between frames via `DebleedProcessor::configure`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DebleedError, Result};

/// Cancellation algorithms selectable per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancellationMode {
    /// NLMS adaptive FIR filter - models the echo path, adapts per sample
    Adaptive,
    /// Per-sample spectral subtraction with an over-subtraction floor
    Spectral,
    /// Delay estimation by cross-correlation, then scaled aligned subtraction
    CrossCorrelation,
    /// Adaptive canceller feeding spectral subtraction
    Hybrid,
}

impl CancellationMode {
    /// Get all available modes
    pub fn all() -> &'static [CancellationMode] {
        &[
            CancellationMode::Adaptive,
            CancellationMode::Spectral,
            CancellationMode::CrossCorrelation,
            CancellationMode::Hybrid,
        ]
    }

    /// Get mode description
    pub fn description(&self) -> &'static str {
        match self {
            CancellationMode::Adaptive => "NLMS adaptive echo cancellation",
            CancellationMode::Spectral => "per-sample spectral subtraction",
            CancellationMode::CrossCorrelation => "delay-aligned reference subtraction",
            CancellationMode::Hybrid => "adaptive cancellation followed by spectral subtraction",
        }
    }
}

impl Default for CancellationMode {
    fn default() -> Self {
        CancellationMode::Hybrid
    }
}

impl std::fmt::Display for CancellationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationMode::Adaptive => write!(f, "adaptive"),
            CancellationMode::Spectral => write!(f, "spectral"),
            CancellationMode::CrossCorrelation => write!(f, "cross-correlation"),
            CancellationMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl std::str::FromStr for CancellationMode {
    type Err = DebleedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "adaptive" => Ok(CancellationMode::Adaptive),
            "spectral" => Ok(CancellationMode::Spectral),
            "cross-correlation" | "crosscorrelation" | "xcorr" => {
                Ok(CancellationMode::CrossCorrelation)
            }
            "hybrid" => Ok(CancellationMode::Hybrid),
            _ => Err(DebleedError::InvalidConfiguration {
                field: "mode".to_string(),
                value: s.to_string(),
                reason: "expected one of: adaptive, spectral, cross-correlation, hybrid"
                    .to_string(),
            }),
        }
    }
}

/// Frame geometry fixed for the lifetime of a processing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Frame length in samples; every mic/reference/output frame must match
    pub frame_size: usize,
    /// NLMS filter length in taps
    pub filter_length: usize,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "sample_rate".to_string(),
                value: self.sample_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.frame_size == 0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "frame_size".to_string(),
                value: self.frame_size.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.filter_length == 0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "filter_length".to_string(),
                value: self.filter_length.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Duration of one frame at the session sample rate
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(self.frame_size as f64 / self.sample_rate as f64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            frame_size: 256,
            filter_length: 128,
        }
    }
}

/// Runtime tuning, applied as a consistent snapshot between frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParams {
    /// Active cancellation algorithm
    pub mode: CancellationMode,
    /// NLMS step size mu; adaptation speed vs stability, typical range (0, 1]
    pub step_size: f32,
    /// Spectral subtraction strength alpha in [0, 1]
    pub spectral_strength: f32,
    /// Noise gate amplitude cutoff, linear, >= 0; 0 disables the gate
    pub gate_threshold: f32,
    /// Delay search bound in samples for the cross-correlation canceller
    pub max_lag: usize,
}

impl ProcessingParams {
    /// Validate against the session's fixed frame size. Out-of-range values
    /// are rejected, never clamped.
    pub fn validate(&self, frame_size: usize) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "step_size".to_string(),
                value: self.step_size.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !self.spectral_strength.is_finite()
            || !(0.0..=1.0).contains(&self.spectral_strength)
        {
            return Err(DebleedError::InvalidConfiguration {
                field: "spectral_strength".to_string(),
                value: self.spectral_strength.to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        if !self.gate_threshold.is_finite() || self.gate_threshold < 0.0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "gate_threshold".to_string(),
                value: self.gate_threshold.to_string(),
                reason: "must be zero or positive".to_string(),
            });
        }
        if self.max_lag == 0 {
            return Err(DebleedError::InvalidConfiguration {
                field: "max_lag".to_string(),
                value: self.max_lag.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_lag > frame_size {
            return Err(DebleedError::InvalidConfiguration {
                field: "max_lag".to_string(),
                value: self.max_lag.to_string(),
                reason: format!(
                    "exceeds available history (frame size is {})",
                    frame_size
                ),
            });
        }
        Ok(())
    }
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            mode: CancellationMode::Hybrid,
            step_size: 0.5,
            spectral_strength: 0.5,
            gate_threshold: 0.02,
            max_lag: 128,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    pub params: ProcessingParams,
}

impl Default for Config {
    fn default() -> Self {
        Self::balanced()
    }
}

impl Config {
    /// Load a named preset, or a JSON config file from the user's config
    /// directory for unknown names. Environment variables
    /// `DEBLEED_SAMPLE_RATE` and `DEBLEED_FRAME_SIZE` override the result.
    pub fn load(preset_name: &str) -> anyhow::Result<Self> {
        let mut config = match preset_name {
            "balanced" => Self::balanced(),
            "aggressive" => Self::aggressive(),
            "gentle" => Self::gentle(),
            _ => {
                let config_path = Self::config_path(preset_name)?;
                let content = std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read config from {:?}", config_path))?;
                serde_json::from_str(&content)
                    .with_context(|| "Failed to parse config JSON")?
            }
        };

        if let Ok(sample_rate) = std::env::var("DEBLEED_SAMPLE_RATE") {
            if let Ok(rate) = sample_rate.parse::<u32>() {
                config.session.sample_rate = rate;
            }
        }

        if let Ok(frame_size) = std::env::var("DEBLEED_FRAME_SIZE") {
            if let Ok(frames) = frame_size.parse::<usize>() {
                config.session.frame_size = frames;
            }
        }

        Ok(config)
    }

    pub fn with_overrides(mut self, sample_rate: Option<u32>, frame_size: Option<usize>) -> Self {
        if let Some(rate) = sample_rate {
            self.session.sample_rate = rate;
        }
        if let Some(frames) = frame_size {
            self.session.frame_size = frames;
        }
        self
    }

    /// Validate session geometry and runtime parameters together
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;
        self.params.validate(self.session.frame_size)
    }

    fn config_path(preset_name: &str) -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir().context("Failed to get config directory")?;
        path.push("debleed");
        path.push(format!("{}.json", preset_name));
        Ok(path)
    }

    fn balanced() -> Self {
        Self {
            session: SessionConfig {
                sample_rate: 48000,
                frame_size: 256,
                filter_length: 128,
            },
            params: ProcessingParams {
                mode: CancellationMode::Hybrid,
                step_size: 0.5,
                spectral_strength: 0.5,
                gate_threshold: 0.02,
                max_lag: 128,
            },
        }
    }

    fn aggressive() -> Self {
        Self {
            session: SessionConfig {
                sample_rate: 48000,
                frame_size: 256,
                filter_length: 256,
            },
            params: ProcessingParams {
                mode: CancellationMode::Hybrid,
                step_size: 0.7,
                spectral_strength: 0.85,
                gate_threshold: 0.05,
                max_lag: 192,
            },
        }
    }

    fn gentle() -> Self {
        Self {
            session: SessionConfig {
                sample_rate: 48000,
                frame_size: 512,
                filter_length: 128,
            },
            params: ProcessingParams {
                mode: CancellationMode::Adaptive,
                step_size: 0.25,
                spectral_strength: 0.3,
                gate_threshold: 0.01,
                max_lag: 64,
            },
        }
    }
}
