//! Multi-method prediction.
//!
//! The arbitrator runs every requested recognition method on one image and
//! keeps the most confident result. Equal confidences go to the method with
//! the higher priority (neural, then structural, then traditional). Every
//! attempt, successful or not, is returned alongside the winner.

use super::collaborators::{NeuralRecognizer, TraditionalRecognizer};
use super::structural::StructuralRecognizer;
use crate::core::config::{ConfigError, ConfigValidator, ConfigValidatorExt};
use crate::core::traits::{DigitClassifier, DigitRecognizer, TraditionalOcr};
use crate::core::{MethodFailure, OCRError, OcrResult};
use crate::domain::{RecognitionMethod, RecognitionResult};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Arbitrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitratorConfig {
    /// Methods run by [`PredictionArbitrator::predict_default`].
    pub methods: Vec<RecognitionMethod>,
}

impl Default for ArbitratorConfig {
    fn default() -> Self {
        Self {
            methods: RecognitionMethod::ALL.to_vec(),
        }
    }
}

impl ConfigValidator for ArbitratorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.methods.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "at least one recognition method is required".to_string(),
            });
        }
        for (i, method) in self.methods.iter().enumerate() {
            if self.methods[..i].contains(method) {
                return Err(ConfigError::InvalidConfig {
                    message: format!("recognition method {method} is listed twice"),
                });
            }
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// What happened when one method was run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The method returned a result, with or without a digit.
    Completed { result: RecognitionResult },
    /// The method raised an error or was not configured.
    Failed { reason: String },
}

/// One method's attempt on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodAttempt {
    pub method: RecognitionMethod,
    pub outcome: AttemptOutcome,
}

impl MethodAttempt {
    /// The result, if the attempt produced a digit.
    pub fn recognized(&self) -> Option<&RecognitionResult> {
        match &self.outcome {
            AttemptOutcome::Completed { result } if result.is_match() => Some(result),
            _ => None,
        }
    }

    fn failure_reason(&self) -> String {
        match &self.outcome {
            AttemptOutcome::Completed { .. } => "no digit recognized".to_string(),
            AttemptOutcome::Failed { reason } => reason.clone(),
        }
    }
}

/// The winning result and every attempt that led to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub best: RecognitionResult,
    pub attempts: Vec<MethodAttempt>,
}

/// Combines recognition methods and picks the most confident answer.
///
/// The structural method is registered by default. Collaborators are added
/// with [`with_classifier`](Self::with_classifier),
/// [`with_traditional_ocr`](Self::with_traditional_ocr) or
/// [`with_recognizer`](Self::with_recognizer).
pub struct PredictionArbitrator {
    recognizers: Vec<Arc<dyn DigitRecognizer>>,
    config: ArbitratorConfig,
}

impl Default for PredictionArbitrator {
    fn default() -> Self {
        Self {
            recognizers: vec![Arc::new(StructuralRecognizer::default())],
            config: ArbitratorConfig::default(),
        }
    }
}

impl std::fmt::Debug for PredictionArbitrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionArbitrator")
            .field("methods", &self.available_methods())
            .field("config", &self.config)
            .finish()
    }
}

impl PredictionArbitrator {
    /// Creates an arbitrator with the default structural recognizer.
    pub fn new(config: ArbitratorConfig) -> OcrResult<Self> {
        Ok(Self {
            config: config.validate_and_wrap_ocr_error()?,
            ..Self::default()
        })
    }

    /// Creates an arbitrator with no recognizers registered.
    pub fn empty(config: ArbitratorConfig) -> OcrResult<Self> {
        Ok(Self {
            recognizers: Vec::new(),
            config: config.validate_and_wrap_ocr_error()?,
        })
    }

    /// Registers `recognizer`, replacing any recognizer for the same method.
    pub fn with_recognizer(mut self, recognizer: impl DigitRecognizer + 'static) -> Self {
        let method = recognizer.method();
        self.recognizers.retain(|r| r.method() != method);
        self.recognizers.push(Arc::new(recognizer));
        self
    }

    /// Registers a classifier as the neural method.
    pub fn with_classifier(self, classifier: impl DigitClassifier + 'static) -> Self {
        self.with_recognizer(NeuralRecognizer::new(classifier))
    }

    /// Registers an OCR engine as the traditional method.
    pub fn with_traditional_ocr(self, engine: impl TraditionalOcr + 'static) -> Self {
        self.with_recognizer(TraditionalRecognizer::new(engine))
    }

    pub fn config(&self) -> &ArbitratorConfig {
        &self.config
    }

    /// Methods that have a recognizer registered.
    pub fn available_methods(&self) -> Vec<RecognitionMethod> {
        self.recognizers.iter().map(|r| r.method()).collect()
    }

    /// Runs the configured default methods.
    pub fn predict_default(&self, image: &RgbImage) -> OcrResult<Prediction> {
        self.predict(image, &self.config.methods)
    }

    /// Runs `methods` on `image` and returns the most confident result.
    ///
    /// Methods run in the order given; repeats are ignored. A requested
    /// method without a registered recognizer counts as a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::AllMethodsFailed` with one entry per attempted
    /// method when no method produced a digit.
    pub fn predict(&self, image: &RgbImage, methods: &[RecognitionMethod]) -> OcrResult<Prediction> {
        let mut attempts: Vec<MethodAttempt> = Vec::with_capacity(methods.len());
        for &method in methods {
            if attempts.iter().any(|a| a.method == method) {
                continue;
            }
            let outcome = match self.recognizers.iter().find(|r| r.method() == method) {
                Some(recognizer) => match recognizer.recognize(image) {
                    Ok(result) => AttemptOutcome::Completed { result },
                    Err(e) => AttemptOutcome::Failed {
                        reason: e.to_string(),
                    },
                },
                None => AttemptOutcome::Failed {
                    reason: "no recognizer configured".to_string(),
                },
            };
            debug!("{} attempt: {:?}", method, outcome);
            attempts.push(MethodAttempt { method, outcome });
        }

        let best = attempts
            .iter()
            .filter_map(MethodAttempt::recognized)
            .fold(None::<&RecognitionResult>, |best, candidate| match best {
                Some(current) if !outranks(candidate, current) => Some(current),
                _ => Some(candidate),
            })
            .cloned();

        match best {
            Some(best) => {
                info!(
                    "Predicted {:?} via {} ({:.3})",
                    best.digit, best.method, best.confidence
                );
                Ok(Prediction { best, attempts })
            }
            None => Err(OCRError::AllMethodsFailed {
                failures: attempts
                    .iter()
                    .map(|a| MethodFailure {
                        method: a.method,
                        reason: a.failure_reason(),
                    })
                    .collect(),
            }),
        }
    }
}

fn outranks(candidate: &RecognitionResult, current: &RecognitionResult) -> bool {
    candidate.confidence > current.confidence
        || (candidate.confidence == current.confidence
            && candidate.method.priority() > current.method.priority())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::OcrReading;
    use crate::core::OpaqueError;
    use crate::domain::{Diagnostics, Digit};
    use crate::synthesis::ImageSynthesizer;

    struct Fixed {
        method: RecognitionMethod,
        digit: Option<u8>,
        confidence: f32,
    }

    impl Fixed {
        fn new(method: RecognitionMethod, digit: Option<u8>, confidence: f32) -> Self {
            Self {
                method,
                digit,
                confidence,
            }
        }
    }

    impl DigitRecognizer for Fixed {
        fn method(&self) -> RecognitionMethod {
            self.method
        }

        fn recognize(&self, _image: &RgbImage) -> OcrResult<RecognitionResult> {
            let digit = self.digit.map(Digit::new).transpose()?;
            Ok(RecognitionResult::new(
                self.method,
                digit,
                self.confidence,
                Diagnostics::None,
            ))
        }
    }

    struct OneHot(usize, f32);

    impl DigitClassifier for OneHot {
        fn predict(&self, _image: &RgbImage) -> Result<Vec<f32>, OpaqueError> {
            let mut probabilities = vec![0.0; 10];
            probabilities[self.0] = self.1;
            Ok(probabilities)
        }
    }

    struct Reader(&'static str);

    impl TraditionalOcr for Reader {
        fn recognize(&self, _image: &RgbImage) -> Result<OcrReading, OpaqueError> {
            Ok(OcrReading {
                digit: self.0.parse().ok(),
                raw_text: self.0.to_string(),
            })
        }
    }

    fn blank() -> RgbImage {
        RgbImage::new(8, 12)
    }

    #[test]
    fn test_single_candidate_returned_unchanged() {
        let stub = Fixed::new(RecognitionMethod::Structural, Some(6), 0.3);
        let expected = stub.recognize(&blank()).unwrap();
        let arbitrator = PredictionArbitrator::empty(ArbitratorConfig::default())
            .unwrap()
            .with_recognizer(stub);

        let prediction = arbitrator
            .predict(&blank(), &[RecognitionMethod::Structural])
            .unwrap();
        assert_eq!(prediction.best, expected);
        assert_eq!(prediction.best.digit, Some(Digit::new(6).unwrap()));
        assert!((prediction.best.confidence - 0.3).abs() < 1e-6);
        assert_eq!(prediction.attempts.len(), 1);
    }

    #[test]
    fn test_highest_confidence_wins() {
        let arbitrator = PredictionArbitrator::empty(ArbitratorConfig::default())
            .unwrap()
            .with_recognizer(Fixed::new(RecognitionMethod::Structural, Some(6), 0.3))
            .with_classifier(OneHot(5, 0.9))
            .with_traditional_ocr(Reader("6"));

        let prediction = arbitrator.predict_default(&blank()).unwrap();
        assert_eq!(prediction.best.method, RecognitionMethod::Neural);
        assert_eq!(prediction.best.digit, Some(Digit::new(5).unwrap()));
        assert_eq!(prediction.attempts.len(), 3);
    }

    #[test]
    fn test_equal_confidence_goes_to_priority() {
        let arbitrator = PredictionArbitrator::empty(ArbitratorConfig::default())
            .unwrap()
            .with_recognizer(Fixed::new(RecognitionMethod::Traditional, Some(1), 0.6))
            .with_recognizer(Fixed::new(RecognitionMethod::Structural, Some(7), 0.6));

        let prediction = arbitrator
            .predict(
                &blank(),
                &[RecognitionMethod::Traditional, RecognitionMethod::Structural],
            )
            .unwrap();
        assert_eq!(prediction.best.method, RecognitionMethod::Structural);
        assert_eq!(prediction.best.digit, Some(Digit::new(7).unwrap()));
    }

    #[test]
    fn test_no_digit_attempts_are_discarded() {
        let arbitrator = PredictionArbitrator::empty(ArbitratorConfig::default())
            .unwrap()
            .with_recognizer(Fixed::new(RecognitionMethod::Structural, None, 0.0))
            .with_traditional_ocr(Reader("3"));

        let prediction = arbitrator
            .predict(
                &blank(),
                &[RecognitionMethod::Structural, RecognitionMethod::Traditional],
            )
            .unwrap();
        assert_eq!(prediction.best.method, RecognitionMethod::Traditional);
        assert_eq!(prediction.attempts[0].recognized(), None);
    }

    #[test]
    fn test_all_methods_failed_lists_attempts() {
        let arbitrator = PredictionArbitrator::empty(ArbitratorConfig::default())
            .unwrap()
            .with_recognizer(Fixed::new(RecognitionMethod::Structural, None, 0.0))
            .with_traditional_ocr(Reader("x"));

        let err = arbitrator
            .predict(&blank(), &RecognitionMethod::ALL)
            .unwrap_err();
        match err {
            OCRError::AllMethodsFailed { failures } => {
                let methods: Vec<_> = failures.iter().map(|f| f.method).collect();
                assert_eq!(methods, RecognitionMethod::ALL.to_vec());
                assert_eq!(failures[0].reason, "no recognizer configured");
                assert_eq!(failures[1].reason, "no digit recognized");
                assert_eq!(failures[2].reason, "no digit recognized");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_collaborator_errors_become_failures() {
        let arbitrator = PredictionArbitrator::empty(ArbitratorConfig::default())
            .unwrap()
            .with_traditional_ocr(Reader("12"));
        let err = arbitrator
            .predict(&blank(), &[RecognitionMethod::Traditional])
            .unwrap_err();
        assert!(err.to_string().contains("traditional collaborator"));
    }

    #[test]
    fn test_empty_request_fails() {
        let err = PredictionArbitrator::default()
            .predict(&blank(), &[])
            .unwrap_err();
        assert!(matches!(err, OCRError::AllMethodsFailed { ref failures } if failures.is_empty()));
    }

    #[test]
    fn test_repeated_methods_run_once() {
        let arbitrator = PredictionArbitrator::empty(ArbitratorConfig::default())
            .unwrap()
            .with_recognizer(Fixed::new(RecognitionMethod::Structural, Some(2), 0.5));
        let prediction = arbitrator
            .predict(
                &blank(),
                &[RecognitionMethod::Structural, RecognitionMethod::Structural],
            )
            .unwrap();
        assert_eq!(prediction.attempts.len(), 1);
    }

    #[test]
    fn test_default_arbitrator_reads_rendered_digit() {
        let image = ImageSynthesizer::default().render(4, 200, 300).unwrap();
        let arbitrator = PredictionArbitrator::default();
        assert_eq!(
            arbitrator.available_methods(),
            vec![RecognitionMethod::Structural]
        );
        let prediction = arbitrator.predict_default(&image).unwrap();
        assert_eq!(prediction.best.digit, Some(Digit::new(4).unwrap()));
        assert!((prediction.best.confidence - 4.0 / 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        assert!(ArbitratorConfig::default().validate().is_ok());
        let empty = ArbitratorConfig { methods: vec![] };
        assert!(PredictionArbitrator::new(empty).is_err());
        let repeated = ArbitratorConfig {
            methods: vec![RecognitionMethod::Neural, RecognitionMethod::Neural],
        };
        assert!(repeated.validate().is_err());
    }
}
