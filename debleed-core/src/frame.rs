//! # Audio Frame Conventions
//!
//! Frames are plain `f32` slices of the session's fixed length, amplitude
//! nominally in [-1, 1]. The engine never allocates per frame; callers own
//! the buffers and the pipeline validates their shape on every call.

use crate::error::{DebleedError, Result};

/// Standard audio sample type used throughout debleed
pub type Sample = f32;

/// Regularization constant guarding divisions against silent signals
pub const EPSILON: f32 = 1e-10;

/// Validate that mic, reference, and output frames all match the session's
/// fixed frame length. Fails before any sample is read.
pub fn validate_frames(
    mic: &[Sample],
    reference: &[Sample],
    output: &[Sample],
    expected: usize,
) -> Result<()> {
    if mic.len() != expected || reference.len() != expected || output.len() != expected {
        return Err(DebleedError::FrameMismatch {
            mic: mic.len(),
            reference: reference.len(),
            output: output.len(),
            expected,
        });
    }
    Ok(())
}

/// Sum of squared samples
pub fn energy(frame: &[Sample]) -> f32 {
    frame.iter().map(|&x| x * x).sum()
}

/// Root-mean-square level
pub fn rms(frame: &[Sample]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (energy(frame) / frame.len() as f32).sqrt()
}

/// Peak absolute level
pub fn peak(frame: &[Sample]) -> f32 {
    frame.iter().fold(0.0, |max, &x| max.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_frames() {
        let a = vec![0.0; 128];
        let b = vec![0.0; 128];
        let c = vec![0.0; 128];
        assert!(validate_frames(&a, &b, &c, 128).is_ok());
        assert!(validate_frames(&a, &b[..64], &c, 128).is_err());
        assert!(validate_frames(&a, &b, &c, 256).is_err());
    }

    #[test]
    fn test_levels() {
        let frame = vec![1.0, -1.0, 1.0, -1.0];
        assert!((rms(&frame) - 1.0).abs() < 1e-6);
        assert_eq!(peak(&frame), 1.0);
        assert!((energy(&frame) - 4.0).abs() < 1e-6);

        assert_eq!(rms(&[]), 0.0);
    }
}
