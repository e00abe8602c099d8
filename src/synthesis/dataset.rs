//! Labeled sample generation.
//!
//! [`SampleGenerator`] ties the renderer and the degradation pipeline
//! together. Every sample owns an RNG seeded from the generator's base seed
//! and the sample's position in the plan, so a dataset is identical no matter
//! how many threads produce it.

use super::config::SynthesisConfig;
use super::degrade::{AppliedEffect, DegradationPipeline};
use super::render::ImageSynthesizer;
use crate::core::config::ConfigValidatorExt;
use crate::core::{OCRError, OcrResult};
use crate::domain::{ActivationVector, Digit, SegmentGeometry};
use crate::utils::encode_png;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Derives the RNG seed of sample `index` from `base_seed`.
///
/// Adjacent indices map to unrelated seeds (SplitMix64 finalizer).
pub fn seed_for_index(base_seed: u64, index: u64) -> u64 {
    let mut z = base_seed.wrapping_add(index.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// File name a writer should use for the `index`-th sample of `digit`.
pub fn sample_file_name(digit: Digit, index: usize) -> String {
    format!("seven_segment_{}_{:04}.png", digit, index)
}

/// Serializable description of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub digit: Digit,
    pub width: u32,
    pub height: u32,
    pub effects_applied: Vec<String>,
    pub filename: String,
    pub sample_id: usize,
    /// Seed of the sample's RNG; absent when the caller supplied the RNG.
    pub seed: Option<u64>,
}

/// A labeled synthetic image.
#[derive(Debug, Clone)]
pub struct Sample {
    pub image: RgbImage,
    pub digit: Digit,
    /// Ground-truth segment states from the truth table.
    pub activations: ActivationVector,
    pub effects: Vec<AppliedEffect>,
    pub metadata: SampleMetadata,
}

impl Sample {
    /// PNG bytes of the image, to be stored under `metadata.filename`.
    pub fn encode_png(&self) -> OcrResult<Vec<u8>> {
        encode_png(&self.image)
    }
}

/// How many samples to produce for which digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPlan {
    pub samples_per_digit: usize,
    #[serde(default = "DatasetPlan::all_digits")]
    pub digits: Vec<Digit>,
}

impl DatasetPlan {
    /// A plan covering all ten digits.
    pub fn new(samples_per_digit: usize) -> Self {
        Self {
            samples_per_digit,
            digits: Self::all_digits(),
        }
    }

    /// Restricts the plan to `digits`.
    pub fn with_digits(mut self, digits: impl Into<Vec<Digit>>) -> Self {
        self.digits = digits.into();
        self
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.digits.len() * self.samples_per_digit
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(sample_id, digit, per-digit index)` for every sample, digit-major.
    pub fn entries(&self) -> Vec<(usize, Digit, usize)> {
        self.digits
            .iter()
            .flat_map(|&digit| (0..self.samples_per_digit).map(move |index| (digit, index)))
            .enumerate()
            .map(|(sample_id, (digit, index))| (sample_id, digit, index))
            .collect()
    }

    fn all_digits() -> Vec<Digit> {
        Digit::ALL.to_vec()
    }
}

/// Canvas size recorded in a dataset summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Serializable summary of a generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_samples: usize,
    pub samples_per_digit: usize,
    pub digits: Vec<Digit>,
    pub image_dimensions: ImageDimensions,
    pub description: String,
}

/// Renders and degrades labeled samples.
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    config: SynthesisConfig,
    synthesizer: ImageSynthesizer,
    pipeline: DegradationPipeline,
    base_seed: u64,
}

impl SampleGenerator {
    /// Creates a generator from a validated configuration.
    ///
    /// When the configuration carries no seed, a random base seed is drawn
    /// once here and reported through [`SampleGenerator::base_seed`].
    pub fn new(config: SynthesisConfig) -> OcrResult<Self> {
        let config = config.validate_and_wrap_ocr_error()?;
        let base_seed = config.seed.unwrap_or_else(rand::random);
        Ok(Self {
            synthesizer: ImageSynthesizer::new(config.render.clone())?,
            pipeline: DegradationPipeline::new(config.degradation.clone())?,
            base_seed,
            config,
        })
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// The seed every per-sample seed is derived from.
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Generates one sample using the caller's RNG.
    ///
    /// # Arguments
    ///
    /// * `digit` - The label to render.
    /// * `index` - Per-digit index, used for the file name and as `sample_id`.
    /// * `rng` - Source of all randomness for the degradation.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        digit: Digit,
        index: usize,
        rng: &mut R,
    ) -> OcrResult<Sample> {
        self.build_sample(digit, index, index, None, rng)
    }

    /// Generates sample `sample_id` with its own derived seed.
    pub fn generate_seeded(&self, digit: Digit, index: usize, sample_id: usize) -> OcrResult<Sample> {
        let seed = seed_for_index(self.base_seed, sample_id as u64);
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_sample(digit, index, sample_id, Some(seed), &mut rng)
    }

    /// Generates every sample of `plan`, returned in plan order.
    ///
    /// Batches larger than the policy threshold are generated in parallel.
    pub fn generate_dataset(&self, plan: &DatasetPlan) -> OcrResult<Vec<Sample>> {
        let entries = plan.entries();
        let policy = &self.config.parallel;
        info!(
            "Generating {} samples ({} per digit, base seed {})",
            entries.len(),
            plan.samples_per_digit,
            self.base_seed
        );

        let produce = |entries: &[(usize, Digit, usize)]| -> OcrResult<Vec<Sample>> {
            if policy.should_parallelize(entries.len()) {
                debug!("Using parallel generation for {} samples", entries.len());
                entries
                    .par_iter()
                    .map(|&(sample_id, digit, index)| self.generate_seeded(digit, index, sample_id))
                    .collect()
            } else {
                debug!("Using sequential generation for {} samples", entries.len());
                entries
                    .iter()
                    .map(|&(sample_id, digit, index)| self.generate_seeded(digit, index, sample_id))
                    .collect()
            }
        };

        let samples = match policy.max_threads {
            Some(threads) if threads > 1 && policy.should_parallelize(entries.len()) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| OCRError::config_error(format!("failed to build thread pool: {e}")))?;
                pool.install(|| produce(entries.as_slice()))?
            }
            _ => produce(entries.as_slice())?,
        };

        info!("Generated {} samples", samples.len());
        Ok(samples)
    }

    /// Summarizes what `plan` produces with this generator's settings.
    pub fn summary(&self, plan: &DatasetPlan) -> DatasetSummary {
        DatasetSummary {
            total_samples: plan.len(),
            samples_per_digit: plan.samples_per_digit,
            digits: plan.digits.clone(),
            image_dimensions: ImageDimensions {
                width: self.config.width,
                height: self.config.height,
            },
            description: format!(
                "Synthetic seven-segment digits with {} degradation stages",
                self.pipeline.steps().len()
            ),
        }
    }

    fn build_sample<R: Rng + ?Sized>(
        &self,
        digit: Digit,
        index: usize,
        sample_id: usize,
        seed: Option<u64>,
        rng: &mut R,
    ) -> OcrResult<Sample> {
        let (width, height) = (self.config.width, self.config.height);
        let clean = self.synthesizer.render_digit(digit, width, height)?;
        let degraded = self.pipeline.degrade(&clean, rng);

        let metadata = SampleMetadata {
            digit,
            width,
            height,
            effects_applied: degraded.effects.iter().map(|e| e.name().to_string()).collect(),
            filename: sample_file_name(digit, index),
            sample_id,
            seed,
        };
        debug!("Generated sample {} ({})", sample_id, metadata.filename);

        Ok(Sample {
            image: degraded.image,
            digit,
            activations: ActivationVector::from(SegmentGeometry::active_segments(digit)),
            effects: degraded.effects,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParallelPolicy;

    fn small_config() -> SynthesisConfig {
        SynthesisConfig::default().with_size(40, 60).with_seed(1234)
    }

    #[test]
    fn test_seed_for_index_spreads_adjacent_indices() {
        let a = seed_for_index(42, 0);
        let b = seed_for_index(42, 1);
        assert_ne!(a, b);
        assert_eq!(a, seed_for_index(42, 0));
        assert_ne!(seed_for_index(42, 0), seed_for_index(43, 0));
    }

    #[test]
    fn test_sample_file_name() {
        let digit = Digit::new(7).unwrap();
        assert_eq!(sample_file_name(digit, 3), "seven_segment_7_0003.png");
        assert_eq!(sample_file_name(digit, 12345), "seven_segment_7_12345.png");
    }

    #[test]
    fn test_plan_entries_are_digit_major() {
        let plan = DatasetPlan::new(2);
        let entries = plan.entries();
        assert_eq!(entries.len(), 20);
        assert_eq!(entries[0], (0, Digit::new(0).unwrap(), 0));
        assert_eq!(entries[3], (3, Digit::new(1).unwrap(), 1));
        assert_eq!(entries[19], (19, Digit::new(9).unwrap(), 1));
    }

    #[test]
    fn test_generate_records_metadata() {
        let generator = SampleGenerator::new(small_config()).unwrap();
        let digit = Digit::new(4).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let sample = generator.generate(digit, 5, &mut rng).unwrap();

        assert_eq!(sample.image.dimensions(), (40, 60));
        assert_eq!(sample.activations.to_string(), "0110011");
        assert_eq!(sample.metadata.filename, "seven_segment_4_0005.png");
        assert_eq!(sample.metadata.effects_applied.len(), 6);
        assert_eq!(sample.metadata.effects_applied[0], "low_contrast");
        assert_eq!(sample.metadata.seed, None);

        let json = serde_json::to_value(&sample.metadata).unwrap();
        assert_eq!(json["digit"], 4);
        assert_eq!(json["sample_id"], 5);

        let png = sample.encode_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_dataset_independent_of_thread_count() {
        let plan = DatasetPlan::new(2);
        let sequential = SampleGenerator::new(
            small_config().with_parallel(ParallelPolicy::new().with_max_threads(Some(1))),
        )
        .unwrap()
        .generate_dataset(&plan)
        .unwrap();
        let parallel = SampleGenerator::new(
            small_config().with_parallel(
                ParallelPolicy::new()
                    .with_sample_threshold(1)
                    .with_max_threads(Some(3)),
            ),
        )
        .unwrap()
        .generate_dataset(&plan)
        .unwrap();

        assert_eq!(sequential.len(), 20);
        for (a, b) in sequential.iter().zip(&parallel) {
            assert_eq!(a.metadata, b.metadata);
            assert_eq!(a.image.as_raw(), b.image.as_raw());
        }
        assert_eq!(parallel[13].digit.value(), 6);
        assert_eq!(parallel[13].metadata.filename, "seven_segment_6_0001.png");
    }

    #[test]
    fn test_summary() {
        let generator = SampleGenerator::new(small_config()).unwrap();
        let plan = DatasetPlan::new(3).with_digits(vec![Digit::new(1).unwrap(), Digit::new(8).unwrap()]);
        let summary = generator.summary(&plan);
        assert_eq!(summary.total_samples, 6);
        assert_eq!(summary.image_dimensions, ImageDimensions { width: 40, height: 60 });

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["digits"], serde_json::json!([1, 8]));
    }

    #[test]
    fn test_generator_rejects_invalid_config() {
        assert!(SampleGenerator::new(SynthesisConfig::default().with_size(0, 10)).is_err());
    }
}
