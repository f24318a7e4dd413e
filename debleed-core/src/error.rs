//! # Debleed Error Types
//!
//! Structured errors for the debleed-core library. Configuration problems
//! are rejected before any frame is processed; frame-shape violations fail
//! the offending call and leave all persistent state untouched.

use std::error::Error;
use std::fmt;

/// Debleed library error type
#[derive(Debug, Clone, PartialEq)]
pub enum DebleedError {
    /// A configuration value is out of its legal range. Raised at
    /// construction or `configure` time, never mid-frame, and never
    /// silently clamped.
    InvalidConfiguration {
        field: String,
        value: String,
        reason: String,
    },

    /// Mic, reference, and output frames must all have the session's
    /// fixed frame length. The call fails before any sample is touched.
    FrameMismatch {
        mic: usize,
        reference: usize,
        output: usize,
        expected: usize,
    },
}

impl fmt::Display for DebleedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { field, value, reason } => {
                write!(f, "Invalid configuration: {} = '{}' - {}", field, value, reason)
            }
            Self::FrameMismatch { mic, reference, output, expected } => {
                write!(
                    f,
                    "Frame length mismatch: mic {}, reference {}, output {} (session frame size is {})",
                    mic, reference, output, expected
                )
            }
        }
    }
}

impl Error for DebleedError {}

/// Result type alias using DebleedError
pub type Result<T> = std::result::Result<T, DebleedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DebleedError::FrameMismatch {
            mic: 256,
            reference: 128,
            output: 256,
            expected: 256,
        };
        assert!(err.to_string().contains("128"));
        assert!(err.to_string().contains("256"));
    }

    #[test]
    fn test_configuration_display() {
        let err = DebleedError::InvalidConfiguration {
            field: "step_size".to_string(),
            value: "-0.5".to_string(),
            reason: "must be positive".to_string(),
        };
        assert!(err.to_string().contains("step_size"));
        assert!(err.to_string().contains("must be positive"));
    }
}
