//! Error types for seven-segment synthesis and recognition.
//!
//! This module defines the errors that can surface from the crate's public
//! operations: invalid digits, zero-sized images, malformed activation vectors,
//! arbitration where no method produced a digit, configuration problems, and
//! failures reported by external collaborators. It also provides helper
//! constructors so call sites stay short.

use crate::domain::RecognitionMethod;
use thiserror::Error;

/// Boxed error type used for failures coming from external collaborators.
pub type OpaqueError = Box<dyn std::error::Error + Send + Sync>;

/// A single failed recognition attempt, as reported by the arbitrator.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodFailure {
    /// The method that was attempted.
    pub method: RecognitionMethod,
    /// Human-readable reason the attempt produced no digit.
    pub reason: String,
}

impl std::fmt::Display for MethodFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.method, self.reason)
    }
}

/// Enum representing the errors that can occur in this crate.
#[derive(Error, Debug)]
pub enum OCRError {
    /// A digit outside `0..=9` was supplied.
    #[error("invalid digit {digit}: expected a value in 0..=9")]
    InvalidDigit {
        /// The rejected value.
        digit: u32,
    },

    /// An image buffer with zero width or height was supplied.
    #[error("invalid image: {width}x{height} buffer has no pixels")]
    InvalidImage {
        /// Width of the rejected buffer.
        width: u32,
        /// Height of the rejected buffer.
        height: u32,
    },

    /// An activation vector did not contain exactly seven entries.
    #[error("invalid activation vector: expected 7 entries, got {len}")]
    InvalidActivationVector {
        /// Length of the rejected vector.
        len: usize,
    },

    /// No requested recognition method produced a digit.
    #[error("all recognition methods failed: {}", format_failures(.failures))]
    AllMethodsFailed {
        /// Every attempted method and the reason it failed.
        failures: Vec<MethodFailure>,
    },

    /// An external collaborator failed or returned malformed output.
    #[error("{method} collaborator: {message}")]
    Collaborator {
        /// The method whose collaborator failed.
        method: RecognitionMethod,
        /// Description of the failure.
        message: String,
        /// The underlying error, if the collaborator reported one.
        #[source]
        source: Option<OpaqueError>,
    },

    /// Error raised by the image crate while encoding a buffer.
    #[error("image encoding failed")]
    Image(#[from] image::ImageError),

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },
}

/// Convenient result alias for operations in this crate.
pub type OcrResult<T> = Result<T, OCRError>;

fn format_failures(failures: &[MethodFailure]) -> String {
    if failures.is_empty() {
        return "no methods were requested".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl OCRError {
    /// Creates an error for a digit outside `0..=9`.
    pub fn invalid_digit(digit: impl Into<u32>) -> Self {
        Self::InvalidDigit {
            digit: digit.into(),
        }
    }

    /// Creates an error for a zero-sized image buffer.
    pub fn invalid_image(width: u32, height: u32) -> Self {
        Self::InvalidImage { width, height }
    }

    /// Creates an error for an activation vector of the wrong length.
    pub fn invalid_activation_vector(len: usize) -> Self {
        Self::InvalidActivationVector { len }
    }

    /// Creates an error for malformed collaborator output.
    ///
    /// # Arguments
    ///
    /// * `method` - The method whose collaborator misbehaved.
    /// * `message` - A description of what was wrong.
    pub fn collaborator(method: RecognitionMethod, message: impl Into<String>) -> Self {
        Self::Collaborator {
            method,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping a failure raised inside a collaborator.
    ///
    /// # Arguments
    ///
    /// * `method` - The method whose collaborator failed.
    /// * `error` - The underlying error that caused this error.
    pub fn collaborator_failed(method: RecognitionMethod, error: OpaqueError) -> Self {
        Self::Collaborator {
            method,
            message: error.to_string(),
            source: Some(error),
        }
    }

    /// Creates an OCRError for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

/// Implementation of From<crate::core::config::ConfigError> for OCRError.
///
/// This allows crate::core::config::ConfigError to be automatically converted to OCRError.
impl From<crate::core::config::ConfigError> for OCRError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_digit_message() {
        let err = OCRError::invalid_digit(12u8);
        assert_eq!(err.to_string(), "invalid digit 12: expected a value in 0..=9");
    }

    #[test]
    fn test_all_methods_failed_lists_every_attempt() {
        let err = OCRError::AllMethodsFailed {
            failures: vec![
                MethodFailure {
                    method: RecognitionMethod::Neural,
                    reason: "classifier not configured".to_string(),
                },
                MethodFailure {
                    method: RecognitionMethod::Structural,
                    reason: "no segment pattern matched".to_string(),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("neural: classifier not configured"));
        assert!(message.contains("structural: no segment pattern matched"));
    }

    #[test]
    fn test_collaborator_failed_keeps_source() {
        let io = std::io::Error::other("engine crashed");
        let err = OCRError::collaborator_failed(RecognitionMethod::Traditional, Box::new(io));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "traditional collaborator: engine crashed");
    }
}
