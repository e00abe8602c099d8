//! Adapters that wrap external collaborators as [`DigitRecognizer`]s.
//!
//! Collaborator output is validated before it becomes a result. Anything
//! malformed is logged and reported as `OCRError::Collaborator` so the
//! arbitrator can record the attempt as failed.

use crate::core::traits::{DigitClassifier, DigitRecognizer, OcrReading, TraditionalOcr};
use crate::core::{
    DEFAULT_CONFIDENCE_THRESHOLD, DIGIT_COUNT, OCRError, OcrResult, TRADITIONAL_OCR_CONFIDENCE,
};
use crate::domain::{Diagnostics, Digit, RecognitionMethod, RecognitionResult};
use image::RgbImage;
use tracing::{debug, warn};

/// Turns a class-probability vector into a neural result.
///
/// The most probable class wins, the lower digit on ties, and its probability
/// becomes the confidence.
///
/// # Errors
///
/// Returns `OCRError::Collaborator` unless `probabilities` holds exactly ten
/// finite values.
pub fn interpret_probabilities(probabilities: &[f32]) -> OcrResult<RecognitionResult> {
    if probabilities.len() != DIGIT_COUNT {
        return Err(discard(
            RecognitionMethod::Neural,
            format!(
                "expected {} class probabilities, got {}",
                DIGIT_COUNT,
                probabilities.len()
            ),
        ));
    }
    if let Some(index) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(discard(
            RecognitionMethod::Neural,
            format!("probability for class {index} is not finite"),
        ));
    }

    let (best_index, best_probability) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (index, p)| {
            if p > best.1 { (index, p) } else { best }
        });
    let digit = Digit::new(best_index as u8)?;

    Ok(RecognitionResult::new(
        RecognitionMethod::Neural,
        Some(digit),
        best_probability,
        Diagnostics::Neural {
            probabilities: probabilities.to_vec(),
        },
    ))
}

/// Turns an OCR reading into a traditional result with the fixed confidence.
///
/// A reading without a digit becomes a result without a digit.
///
/// # Errors
///
/// Returns `OCRError::Collaborator` if the reported digit is out of range or
/// the raw text, ignoring surrounding whitespace, is not exactly that digit.
pub fn interpret_reading(reading: OcrReading) -> OcrResult<RecognitionResult> {
    let diagnostics = Diagnostics::Traditional {
        raw_text: reading.raw_text.clone(),
    };
    let Some(value) = reading.digit else {
        return Ok(RecognitionResult::no_match(
            RecognitionMethod::Traditional,
            diagnostics,
        ));
    };
    let digit = Digit::new(value).map_err(|_| {
        discard(
            RecognitionMethod::Traditional,
            format!("reported digit {value} is out of range"),
        )
    })?;

    let text = reading.raw_text.trim();
    let mut chars = text.chars();
    let matches = match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_digit(10) == Some(u32::from(value)) && c.is_ascii_digit(),
        _ => false,
    };
    if !matches {
        return Err(discard(
            RecognitionMethod::Traditional,
            format!("raw text {text:?} does not match reported digit {value}"),
        ));
    }

    Ok(RecognitionResult::new(
        RecognitionMethod::Traditional,
        Some(digit),
        TRADITIONAL_OCR_CONFIDENCE,
        diagnostics,
    ))
}

fn discard(method: RecognitionMethod, message: String) -> OCRError {
    warn!("Discarding {} output: {}", method, message);
    OCRError::collaborator(method, message)
}

/// A [`DigitClassifier`] exposed as the neural method.
pub struct NeuralRecognizer<C> {
    classifier: C,
    confidence_threshold: f32,
}

impl<C: DigitClassifier> NeuralRecognizer<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Sets the threshold used for `RecognitionResult::is_confident`.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

impl<C: DigitClassifier> DigitRecognizer for NeuralRecognizer<C> {
    fn method(&self) -> RecognitionMethod {
        RecognitionMethod::Neural
    }

    fn recognize(&self, image: &RgbImage) -> OcrResult<RecognitionResult> {
        let probabilities = self
            .classifier
            .predict(image)
            .map_err(|e| OCRError::collaborator_failed(RecognitionMethod::Neural, e))?;
        let result = interpret_probabilities(&probabilities)?;
        debug!("Neural prediction {:?} ({:.3})", result.digit, result.confidence);
        Ok(result.with_confidence_threshold(self.confidence_threshold))
    }
}

/// A [`TraditionalOcr`] engine exposed as the traditional method.
pub struct TraditionalRecognizer<O> {
    engine: O,
    confidence_threshold: f32,
}

impl<O: TraditionalOcr> TraditionalRecognizer<O> {
    pub fn new(engine: O) -> Self {
        Self {
            engine,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Sets the threshold used for `RecognitionResult::is_confident`.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

impl<O: TraditionalOcr> DigitRecognizer for TraditionalRecognizer<O> {
    fn method(&self) -> RecognitionMethod {
        RecognitionMethod::Traditional
    }

    fn recognize(&self, image: &RgbImage) -> OcrResult<RecognitionResult> {
        let reading = self
            .engine
            .recognize(image)
            .map_err(|e| OCRError::collaborator_failed(RecognitionMethod::Traditional, e))?;
        let result = interpret_reading(reading)?;
        debug!("Traditional reading {:?}", result.digit);
        Ok(result.with_confidence_threshold(self.confidence_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OpaqueError;

    struct FixedClassifier(Vec<f32>);

    impl DigitClassifier for FixedClassifier {
        fn predict(&self, _image: &RgbImage) -> Result<Vec<f32>, OpaqueError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenEngine;

    impl TraditionalOcr for BrokenEngine {
        fn recognize(&self, _image: &RgbImage) -> Result<OcrReading, OpaqueError> {
            Err("engine not installed".into())
        }
    }

    fn reading(digit: Option<u8>, raw_text: &str) -> OcrReading {
        OcrReading {
            digit,
            raw_text: raw_text.to_string(),
        }
    }

    #[test]
    fn test_probabilities_pick_argmax() {
        let mut probabilities = vec![0.01; 10];
        probabilities[7] = 0.82;
        let result = interpret_probabilities(&probabilities).unwrap();
        assert_eq!(result.digit, Some(Digit::new(7).unwrap()));
        assert!((result.confidence - 0.82).abs() < 1e-6);
        assert_eq!(result.method, RecognitionMethod::Neural);
        assert!(result.is_confident);
    }

    #[test]
    fn test_probability_ties_pick_lower_digit() {
        let mut probabilities = vec![0.0; 10];
        probabilities[4] = 0.5;
        probabilities[2] = 0.5;
        let result = interpret_probabilities(&probabilities).unwrap();
        assert_eq!(result.digit, Some(Digit::new(2).unwrap()));
    }

    #[test]
    fn test_malformed_probabilities_rejected() {
        assert!(matches!(
            interpret_probabilities(&[0.5; 9]),
            Err(OCRError::Collaborator {
                method: RecognitionMethod::Neural,
                ..
            })
        ));
        let mut probabilities = vec![0.1; 10];
        probabilities[3] = f32::NAN;
        assert!(interpret_probabilities(&probabilities).is_err());
        probabilities[3] = f32::INFINITY;
        assert!(interpret_probabilities(&probabilities).is_err());
    }

    #[test]
    fn test_reading_validation() {
        let result = interpret_reading(reading(Some(4), "4\n")).unwrap();
        assert_eq!(result.digit, Some(Digit::new(4).unwrap()));
        assert!((result.confidence - TRADITIONAL_OCR_CONFIDENCE).abs() < 1e-6);

        assert!(interpret_reading(reading(Some(4), "5")).is_err());
        assert!(interpret_reading(reading(Some(4), "44")).is_err());
        assert!(interpret_reading(reading(Some(4), "")).is_err());
        assert!(interpret_reading(reading(Some(12), "12")).is_err());
        // Fullwidth digits are not ASCII.
        assert!(interpret_reading(reading(Some(4), "４")).is_err());
    }

    #[test]
    fn test_reading_without_digit_is_no_match() {
        let result = interpret_reading(reading(None, "?")).unwrap();
        assert!(result.digit.is_none());
        assert_eq!(
            result.diagnostics,
            Diagnostics::Traditional {
                raw_text: "?".to_string()
            }
        );
    }

    #[test]
    fn test_recognizers_wrap_collaborators() {
        let image = RgbImage::new(4, 4);
        let mut probabilities = vec![0.0; 10];
        probabilities[1] = 0.45;
        let neural = NeuralRecognizer::new(FixedClassifier(probabilities))
            .with_confidence_threshold(0.4);
        let result = neural.recognize(&image).unwrap();
        assert_eq!(neural.method(), RecognitionMethod::Neural);
        assert!(result.is_confident);

        let traditional = TraditionalRecognizer::new(BrokenEngine);
        let err = traditional.recognize(&image).unwrap_err();
        assert!(err.to_string().contains("engine not installed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
