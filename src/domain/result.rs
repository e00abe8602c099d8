//! Recognition result types shared by every recognition method.

use super::segment::{ActivationVector, Digit};
use crate::core::DEFAULT_CONFIDENCE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The method that produced a recognition result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionMethod {
    /// A learned classifier.
    Neural,
    /// The rule-based segment decoder.
    Structural,
    /// A traditional OCR engine.
    Traditional,
}

impl RecognitionMethod {
    /// All methods, highest priority first.
    pub const ALL: [RecognitionMethod; 3] = [
        RecognitionMethod::Neural,
        RecognitionMethod::Structural,
        RecognitionMethod::Traditional,
    ];

    /// Tie-break priority; higher wins.
    pub const fn priority(self) -> u8 {
        match self {
            RecognitionMethod::Neural => 3,
            RecognitionMethod::Structural => 2,
            RecognitionMethod::Traditional => 1,
        }
    }

    /// Lowercase name used in logs and serialized output.
    pub const fn as_str(self) -> &'static str {
        match self {
            RecognitionMethod::Neural => "neural",
            RecognitionMethod::Structural => "structural",
            RecognitionMethod::Traditional => "traditional",
        }
    }
}

impl fmt::Display for RecognitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method-specific evidence attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Diagnostics {
    /// No extra evidence.
    None,
    /// The decoded activation vector and the score of every digit.
    Structural {
        observed: ActivationVector,
        scores: [f32; 10],
    },
    /// The classifier's class probabilities.
    Neural { probabilities: Vec<f32> },
    /// The OCR engine's raw output.
    Traditional { raw_text: String },
}

/// Outcome of one recognition call.
///
/// Built once per call. `digit` is `None` when the method found no match,
/// which is a normal outcome rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// The recognized digit, if any.
    pub digit: Option<Digit>,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// The method that produced this result.
    pub method: RecognitionMethod,
    /// Whether the confidence meets the threshold in effect at construction.
    pub is_confident: bool,
    /// Method-specific evidence.
    pub diagnostics: Diagnostics,
}

impl RecognitionResult {
    /// Creates a result, clamping the confidence into `[0, 1]` and gating it
    /// against the default confidence threshold.
    pub fn new(
        method: RecognitionMethod,
        digit: Option<Digit>,
        confidence: f32,
        diagnostics: Diagnostics,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            digit,
            confidence,
            method,
            is_confident: digit.is_some() && confidence >= DEFAULT_CONFIDENCE_THRESHOLD,
            diagnostics,
        }
    }

    /// Creates a result with no digit and zero confidence.
    pub fn no_match(method: RecognitionMethod, diagnostics: Diagnostics) -> Self {
        Self::new(method, None, 0.0, diagnostics)
    }

    /// Re-gates the result against `threshold`.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.is_confident = self.digit.is_some() && self.confidence >= threshold;
        self
    }

    /// Returns true if a digit was recognized.
    pub fn is_match(&self) -> bool {
        self.digit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_priority_order() {
        let mut methods = RecognitionMethod::ALL;
        methods.sort_by_key(|m| std::cmp::Reverse(m.priority()));
        assert_eq!(methods, RecognitionMethod::ALL);
        assert_eq!(RecognitionMethod::Neural.to_string(), "neural");
    }

    #[test]
    fn test_confidence_is_clamped() {
        let digit = Digit::new(3).ok();
        let high = RecognitionResult::new(RecognitionMethod::Neural, digit, 1.7, Diagnostics::None);
        assert_eq!(high.confidence, 1.0);
        let nan = RecognitionResult::new(RecognitionMethod::Neural, digit, f32::NAN, Diagnostics::None);
        assert_eq!(nan.confidence, 0.0);
    }

    #[test]
    fn test_confidence_gate() {
        let digit = Digit::new(6).ok();
        let result =
            RecognitionResult::new(RecognitionMethod::Structural, digit, 0.3, Diagnostics::None);
        assert!(!result.is_confident);
        assert!(result.clone().with_confidence_threshold(0.25).is_confident);

        let none = RecognitionResult::no_match(RecognitionMethod::Structural, Diagnostics::None);
        assert!(!none.is_match());
        assert!(!none.with_confidence_threshold(0.0).is_confident);
    }

    #[test]
    fn test_serialized_method_tag() {
        let result = RecognitionResult::new(
            RecognitionMethod::Traditional,
            Digit::new(4).ok(),
            0.6,
            Diagnostics::Traditional {
                raw_text: "4".to_string(),
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "traditional");
        assert_eq!(json["digit"], 4);
        assert_eq!(json["diagnostics"]["kind"], "traditional");
    }
}
