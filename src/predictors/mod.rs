//! Digit recognition.
//!
//! The structural decoder works from segment activations alone. The
//! arbitrator combines it with external collaborators (a learned classifier
//! and a traditional OCR engine) and keeps the most confident answer.

pub mod arbitrator;
pub mod collaborators;
pub mod structural;

pub use arbitrator::{
    ArbitratorConfig, AttemptOutcome, MethodAttempt, Prediction, PredictionArbitrator,
};
pub use collaborators::{
    NeuralRecognizer, TraditionalRecognizer, interpret_probabilities, interpret_reading,
};
pub use structural::{
    DecoderConfig, EXTRA_SEGMENT_PENALTY, StructuralDigitDecoder, StructuralRecognizer,
    match_score,
};
