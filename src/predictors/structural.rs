//! Rule-based digit decoding from segment activations.
//!
//! Each digit is scored against the observed segments:
//!
//! ```text
//! score = |expected ∩ observed| - 0.5 * |observed \ expected|
//! ```
//!
//! The highest score wins, ties going to the lowest digit, and the confidence
//! is `score / 7`, clamped to `[0, 1]`. A best score of zero or less yields a
//! result without a digit.

use crate::core::config::{ConfigError, ConfigValidator, ConfigValidatorExt};
use crate::core::traits::DigitRecognizer;
use crate::core::{DEFAULT_CONFIDENCE_THRESHOLD, DIGIT_COUNT, OcrResult, SEGMENT_COUNT};
use crate::domain::{
    ActivationVector, Diagnostics, Digit, RecognitionMethod, RecognitionResult, SegmentGeometry,
    SegmentSet,
};
use crate::processors::SegmentActivationEstimator;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Penalty per observed segment that the digit does not use.
pub const EXTRA_SEGMENT_PENALTY: f32 = 0.5;

/// Decoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Among equal scores, prefer the digit with the fewest expected segments
    /// left unobserved before falling back to the lowest digit. Off by default.
    ///
    /// With plain ranking, a digit whose segments are a subset of another's
    /// (1 within 0, 7 within 0, 9 within 8) ties with the larger digit and
    /// loses to the lower value, so its own segment pattern decodes as the
    /// other digit.
    pub prefer_complete_matches: bool,
    /// Threshold used for `RecognitionResult::is_confident`.
    pub confidence_threshold: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            prefer_complete_matches: false,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl ConfigValidator for DecoderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_confidence_threshold(self.confidence_threshold)
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Score of `expected` against `observed`.
pub fn match_score(expected: SegmentSet, observed: SegmentSet) -> f32 {
    let hits = expected.intersection(observed).len() as f32;
    let extras = observed.difference(expected).len() as f32;
    hits - EXTRA_SEGMENT_PENALTY * extras
}

/// Decodes activation vectors into digits.
#[derive(Debug, Clone, Default)]
pub struct StructuralDigitDecoder {
    config: DecoderConfig,
}

impl StructuralDigitDecoder {
    /// Creates a decoder from a validated configuration.
    pub fn new(config: DecoderConfig) -> OcrResult<Self> {
        Ok(Self {
            config: config.validate_and_wrap_ocr_error()?,
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes raw activations given in `A..G` order.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::InvalidActivationVector` unless `activations` has
    /// exactly seven entries. A vector that matches no digit is not an error;
    /// it yields a result whose `digit` is `None`.
    pub fn decode(&self, activations: &[bool]) -> OcrResult<RecognitionResult> {
        Ok(self.decode_vector(&ActivationVector::from_slice(activations)?))
    }

    /// Decodes a well-formed activation vector.
    pub fn decode_vector(&self, observed: &ActivationVector) -> RecognitionResult {
        let scores = self.scores(observed);
        let observed_set = observed.active_segments();

        let mut best: Option<(Digit, f32, usize)> = None;
        for digit in Digit::ALL {
            let score = scores[digit.index()];
            let missing = SegmentGeometry::active_segments(digit)
                .difference(observed_set)
                .len();
            let better = match best {
                None => true,
                Some((_, best_score, best_missing)) => {
                    score > best_score
                        || (self.config.prefer_complete_matches
                            && score == best_score
                            && missing < best_missing)
                }
            };
            if better {
                best = Some((digit, score, missing));
            }
        }

        let diagnostics = Diagnostics::Structural {
            observed: *observed,
            scores,
        };
        let result = match best {
            Some((digit, score, _)) if score > 0.0 => RecognitionResult::new(
                RecognitionMethod::Structural,
                Some(digit),
                (score / SEGMENT_COUNT as f32).min(1.0),
                diagnostics,
            ),
            _ => RecognitionResult::no_match(RecognitionMethod::Structural, diagnostics),
        };
        debug!(
            "Decoded {} as {:?} (confidence {:.3})",
            observed, result.digit, result.confidence
        );
        result.with_confidence_threshold(self.config.confidence_threshold)
    }

    /// Score of every digit against `observed`, indexed by digit.
    pub fn scores(&self, observed: &ActivationVector) -> [f32; DIGIT_COUNT] {
        let observed = observed.active_segments();
        let mut scores = [0.0f32; DIGIT_COUNT];
        for digit in Digit::ALL {
            scores[digit.index()] = match_score(SegmentGeometry::active_segments(digit), observed);
        }
        scores
    }

    /// Estimates activations from `image` and decodes them.
    pub fn recognize(
        &self,
        estimator: &SegmentActivationEstimator,
        image: &RgbImage,
    ) -> OcrResult<RecognitionResult> {
        let observed = estimator.estimate(image)?;
        Ok(self.decode_vector(&observed))
    }
}

/// Activation estimation followed by structural decoding.
#[derive(Debug, Clone, Default)]
pub struct StructuralRecognizer {
    estimator: SegmentActivationEstimator,
    decoder: StructuralDigitDecoder,
}

impl StructuralRecognizer {
    pub fn new(estimator: SegmentActivationEstimator, decoder: StructuralDigitDecoder) -> Self {
        Self { estimator, decoder }
    }

    pub fn estimator(&self) -> &SegmentActivationEstimator {
        &self.estimator
    }

    pub fn decoder(&self) -> &StructuralDigitDecoder {
        &self.decoder
    }
}

impl DigitRecognizer for StructuralRecognizer {
    fn method(&self) -> RecognitionMethod {
        RecognitionMethod::Structural
    }

    fn recognize(&self, image: &RgbImage) -> OcrResult<RecognitionResult> {
        self.decoder.recognize(&self.estimator, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OCRError;
    use crate::domain::Segment;
    use crate::synthesis::ImageSynthesizer;

    fn bits(pattern: &str) -> Vec<bool> {
        pattern.chars().map(|c| c == '1').collect()
    }

    fn digit_of(result: &RecognitionResult) -> Option<u8> {
        result.digit.map(Digit::value)
    }

    fn complete_match_decoder() -> StructuralDigitDecoder {
        StructuralDigitDecoder::new(DecoderConfig {
            prefer_complete_matches: true,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_truth_table_round_trip() {
        let decoder = complete_match_decoder();
        for digit in Digit::ALL {
            let expected = SegmentGeometry::active_segments(digit);
            let result = decoder.decode_vector(&ActivationVector::from(expected));
            assert_eq!(result.digit, Some(digit));
            assert_eq!(result.method, RecognitionMethod::Structural);
            let confidence = expected.len() as f32 / 7.0;
            assert!((result.confidence - confidence).abs() < 1e-6, "digit {digit}");
        }
        let eight = decoder.decode(&[true; 7]).unwrap();
        assert_eq!(digit_of(&eight), Some(8));
        assert_eq!(eight.confidence, 1.0);
        assert!(eight.is_confident);
    }

    #[test]
    fn test_regression_vector() {
        // A, B, D, E, F lit: digit 0 matches five segments with no extras.
        for prefer in [true, false] {
            let decoder = StructuralDigitDecoder::new(DecoderConfig {
                prefer_complete_matches: prefer,
                ..Default::default()
            })
            .unwrap();
            let result = decoder.decode(&bits("1101110")).unwrap();
            assert_eq!(digit_of(&result), Some(0));
            assert!((result.confidence - 5.0 / 7.0).abs() < 1e-6);
            match result.diagnostics {
                Diagnostics::Structural { scores, .. } => {
                    assert_eq!(scores[0], 5.0);
                    assert_eq!(scores[6], 3.5);
                    assert_eq!(scores[8], 5.0);
                }
                other => panic!("unexpected diagnostics {other:?}"),
            }
        }
    }

    #[test]
    fn test_ties_resolve_to_lower_digit() {
        for decoder in [StructuralDigitDecoder::default(), complete_match_decoder()] {
            // 0 and 9 both match five segments and each misses one.
            assert_eq!(digit_of(&decoder.decode(&bits("1111010")).unwrap()), Some(0));
            // 2 and 3 tie the same way.
            assert_eq!(digit_of(&decoder.decode(&bits("1101001")).unwrap()), Some(2));
            // 3 and 5 tie the same way.
            assert_eq!(digit_of(&decoder.decode(&bits("1011001")).unwrap()), Some(3));
        }
    }

    #[test]
    fn test_default_ranking_is_score_then_lowest_digit() {
        let decoder = StructuralDigitDecoder::default();
        assert!(!decoder.config().prefer_complete_matches);
        // 3, 8 and 9 all score 5 for digit 3's segments.
        assert_eq!(digit_of(&decoder.decode(&bits("1111001")).unwrap()), Some(3));

        // Digit 1's segments score 2 against every digit that contains them.
        let one = decoder.decode(&bits("0110000")).unwrap();
        assert_eq!(digit_of(&one), Some(0));
        assert!((one.confidence - 2.0 / 7.0).abs() < 1e-6);
        // 7 within 0 and 9 within 8 behave the same way.
        assert_eq!(digit_of(&decoder.decode(&bits("1110000")).unwrap()), Some(0));
        assert_eq!(digit_of(&decoder.decode(&bits("1111011")).unwrap()), Some(8));

        // Opting in to complete matches keeps the segment pattern's own digit.
        let complete = complete_match_decoder();
        assert_eq!(digit_of(&complete.decode(&bits("0110000")).unwrap()), Some(1));
        assert_eq!(digit_of(&complete.decode(&bits("1110000")).unwrap()), Some(7));
        assert_eq!(digit_of(&complete.decode(&bits("1111011")).unwrap()), Some(9));
    }

    #[test]
    fn test_default_config_deserializes_to_plain_ranking() {
        let config: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert!(!config.prefer_complete_matches);
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let decoder = StructuralDigitDecoder::default();
        let result = decoder.decode(&[false; 7]).unwrap();
        assert!(result.digit.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_confident);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let decoder = StructuralDigitDecoder::default();
        assert!(matches!(
            decoder.decode(&[true; 6]),
            Err(OCRError::InvalidActivationVector { len: 6 })
        ));
        assert!(matches!(
            decoder.decode(&[]),
            Err(OCRError::InvalidActivationVector { len: 0 })
        ));
    }

    #[test]
    fn test_match_score() {
        let observed = SegmentSet::from_segments(&[Segment::A, Segment::G]);
        let one = SegmentGeometry::active_segments_u8(1).unwrap();
        assert_eq!(match_score(one, observed), -1.0);
    }

    #[test]
    fn test_render_estimate_decode_eight() {
        let image = ImageSynthesizer::default().render(8, 200, 300).unwrap();
        let estimator = SegmentActivationEstimator::default();
        assert_eq!(estimator.estimate(&image).unwrap(), ActivationVector::new([true; 7]));

        let result = StructuralDigitDecoder::default()
            .recognize(&estimator, &image)
            .unwrap();
        assert_eq!(digit_of(&result), Some(8));
        assert_eq!(result.confidence, 1.0);

        let recognizer = StructuralRecognizer::default();
        assert_eq!(recognizer.method(), RecognitionMethod::Structural);
        assert_eq!(recognizer.recognize(&image).unwrap(), result);
    }

    #[test]
    fn test_render_estimate_decode_all_digits() {
        let synth = ImageSynthesizer::default();
        let estimator = SegmentActivationEstimator::default();
        let decoder = complete_match_decoder();
        for digit in 0..=9u8 {
            let image = synth.render(digit, 200, 300).unwrap();
            let result = decoder.recognize(&estimator, &image).unwrap();
            assert_eq!(digit_of(&result), Some(digit));
        }
    }
}
