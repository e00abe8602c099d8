//! Interfaces to the recognizers consulted by the arbitrator.
//!
//! The crate never trains or runs a neural network and never ships an OCR
//! engine. Both are reached through these traits so callers can plug in
//! whatever backend they have, and tests can plug in stubs.

use crate::core::errors::{OcrResult, OpaqueError};
use crate::domain::{RecognitionMethod, RecognitionResult};
use image::RgbImage;

/// One recognition method as seen by the arbitrator.
///
/// Implementations turn an image into a [`RecognitionResult`] tagged with
/// their method. A result without a digit is a normal outcome; errors are
/// reserved for failures and malformed collaborator output.
pub trait DigitRecognizer: Send + Sync {
    /// The method this recognizer implements.
    fn method(&self) -> RecognitionMethod;

    /// Recognizes the digit shown in `image`.
    fn recognize(&self, image: &RgbImage) -> OcrResult<RecognitionResult>;
}

/// A learned digit classifier.
pub trait DigitClassifier: Send + Sync {
    /// Returns one probability per digit class, indexed by digit.
    ///
    /// # Arguments
    ///
    /// * `image` - The cell to classify.
    ///
    /// # Returns
    ///
    /// A vector of ten class probabilities, or the backend's error.
    fn predict(&self, image: &RgbImage) -> Result<Vec<f32>, OpaqueError>;
}

/// What a traditional OCR engine read from a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrReading {
    /// The digit the engine reported, if any.
    pub digit: Option<u8>,
    /// The raw text the engine produced.
    pub raw_text: String,
}

/// A traditional (non-learned) OCR engine.
pub trait TraditionalOcr: Send + Sync {
    /// Reads a single digit from `image`.
    fn recognize(&self, image: &RgbImage) -> Result<OcrReading, OpaqueError>;
}
