//! # sevenseg-ocr
//!
//! Synthetic seven-segment digits and rule-based recognition of them.
//!
//! ## Features
//!
//! - Deterministic rendering of digits 0-9 from fixed segment polygons
//! - A seeded degradation pipeline that imitates worn displays and cheap sensors
//! - Parallel, reproducible dataset generation with serializable metadata
//! - Segment activation estimation (CLAHE, adaptive threshold, region ratios)
//! - Structural decoding of activations into digits with a confidence score
//! - Arbitration between the structural decoder and external recognizers
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration validation, constants and collaborator traits
//! * [`domain`] - Segments, digits, geometry and recognition results
//! * [`synthesis`] - Rendering, degradation and dataset generation
//! * [`processors`] - Contrast enhancement, thresholding and activation estimation
//! * [`predictors`] - Structural decoding and multi-method arbitration
//! * [`utils`] - Image helpers
//!
//! ## Quick Start
//!
//! ### Render, degrade and recognize
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use sevenseg_ocr::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let clean = ImageSynthesizer::default().render(3, 200, 300)?;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let degraded = DegradationPipeline::default().degrade(&clean, &mut rng);
//! println!("applied: {:?}", degraded.effects);
//!
//! let prediction = PredictionArbitrator::default().predict(&clean, &[RecognitionMethod::Structural])?;
//! assert_eq!(prediction.best.digit.map(|d| d.value()), Some(3));
//! # Ok(())
//! # }
//! ```
//!
//! ### Dataset generation
//!
//! ```rust
//! use sevenseg_ocr::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SynthesisConfig::default().with_size(40, 60).with_seed(42);
//! let generator = SampleGenerator::new(config)?;
//! let samples = generator.generate_dataset(&DatasetPlan::new(2))?;
//! assert_eq!(samples.len(), 20);
//! assert!(DatasetReport::from_samples(&samples).is_valid());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod domain;

pub mod predictors;
pub mod processors;
pub mod synthesis;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use sevenseg_ocr::prelude::*;
/// ```
///
/// Included items cover the common path from rendering to recognition. For
/// the individual image operations and collaborator adapters, import from
/// `sevenseg_ocr::processors` and `sevenseg_ocr::predictors` directly.
pub mod prelude {
    // Domain
    pub use crate::domain::{
        ActivationVector, Digit, RecognitionMethod, RecognitionResult, Segment, SegmentGeometry,
    };

    // Synthesis
    pub use crate::synthesis::{
        DatasetPlan, DatasetReport, DegradationPipeline, ImageSynthesizer, SampleGenerator,
        SynthesisConfig,
    };

    // Recognition
    pub use crate::predictors::{PredictionArbitrator, StructuralDigitDecoder};
    pub use crate::processors::SegmentActivationEstimator;

    // Collaborators
    pub use crate::core::traits::{DigitClassifier, OcrReading, TraditionalOcr};

    // Error Handling (essential)
    pub use crate::core::{OCRError, OcrResult};
}
