//! Integrity checks and image statistics for generated datasets.

use super::dataset::{Sample, SampleMetadata};
use crate::core::DIGIT_COUNT;
use crate::domain::Digit;
use crate::processors::contrast::rgb_to_gray;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Minimum ratio between the rarest and the most common digit.
pub const MIN_BALANCE_RATIO: f32 = 0.8;

/// Mean, spread and range of a series of values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

impl SeriesStats {
    /// Population statistics of `values`; all zeros when empty.
    pub fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let variance = values
            .iter()
            .map(|&v| (f64::from(v) - mean).powi(2))
            .sum::<f64>()
            / n;
        Self {
            mean: mean as f32,
            std: variance.sqrt() as f32,
            min: values.iter().copied().fold(f32::INFINITY, f32::min),
            max: values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        }
    }
}

/// Brightness and contrast across a set of images.
///
/// Brightness is the mean gray level of an image; contrast is its gray-level
/// standard deviation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageStatistics {
    pub sample_count: usize,
    pub brightness: SeriesStats,
    pub contrast: SeriesStats,
}

impl ImageStatistics {
    /// Computes statistics over `images`.
    pub fn from_images<'a>(images: impl IntoIterator<Item = &'a RgbImage>) -> Self {
        let mut brightness = Vec::new();
        let mut contrast = Vec::new();
        for image in images {
            let gray = rgb_to_gray(image);
            let levels: Vec<f32> = gray.iter().map(|&v| f32::from(v)).collect();
            let stats = SeriesStats::from_values(&levels);
            brightness.push(stats.mean);
            contrast.push(stats.std);
        }
        Self {
            sample_count: brightness.len(),
            brightness: SeriesStats::from_values(&brightness),
            contrast: SeriesStats::from_values(&contrast),
        }
    }
}

/// Result of checking a dataset's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub total_samples: usize,
    /// Sample count per digit, indexed by digit.
    pub per_digit_counts: [usize; DIGIT_COUNT],
    pub missing_digits: Vec<Digit>,
    /// Rarest over most common count among present digits.
    pub balance_ratio: f32,
    pub is_balanced: bool,
    /// Every distinct `(width, height)` seen.
    pub dimensions: Vec<(u32, u32)>,
    pub consistent_dimensions: bool,
    pub statistics: Option<ImageStatistics>,
}

impl DatasetReport {
    /// Checks digit coverage, balance and dimension consistency.
    pub fn from_metadata(metadata: &[SampleMetadata]) -> Self {
        let mut per_digit_counts = [0usize; DIGIT_COUNT];
        let mut dimensions = BTreeSet::new();
        for record in metadata {
            per_digit_counts[record.digit.index()] += 1;
            dimensions.insert((record.width, record.height));
        }

        let missing_digits: Vec<Digit> = Digit::ALL
            .into_iter()
            .filter(|d| per_digit_counts[d.index()] == 0)
            .collect();
        let present: Vec<usize> = per_digit_counts.iter().copied().filter(|&c| c > 0).collect();
        let balance_ratio = match (present.iter().min(), present.iter().max()) {
            (Some(&min), Some(&max)) if max > 0 => min as f32 / max as f32,
            _ => 0.0,
        };

        let report = Self {
            total_samples: metadata.len(),
            per_digit_counts,
            missing_digits,
            balance_ratio,
            is_balanced: balance_ratio >= MIN_BALANCE_RATIO,
            consistent_dimensions: dimensions.len() <= 1,
            dimensions: dimensions.into_iter().collect(),
            statistics: None,
        };
        report.log();
        report
    }

    /// Checks metadata and computes image statistics for generated samples.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let metadata: Vec<SampleMetadata> = samples.iter().map(|s| s.metadata.clone()).collect();
        let mut report = Self::from_metadata(&metadata);
        let statistics = ImageStatistics::from_images(samples.iter().map(|s| &s.image));
        info!(
            "Brightness {:.1} ± {:.1}, contrast {:.1} ± {:.1} over {} images",
            statistics.brightness.mean,
            statistics.brightness.std,
            statistics.contrast.mean,
            statistics.contrast.std,
            statistics.sample_count
        );
        report.statistics = Some(statistics);
        report
    }

    /// Returns true if every digit is present, the dataset is balanced and
    /// all images share one size.
    pub fn is_valid(&self) -> bool {
        self.missing_digits.is_empty() && self.is_balanced && self.consistent_dimensions
    }

    fn log(&self) {
        info!(
            "Dataset check: {} samples, balance ratio {:.2}, {} distinct sizes",
            self.total_samples,
            self.balance_ratio,
            self.dimensions.len()
        );
        if !self.missing_digits.is_empty() {
            warn!("Missing digits: {:?}", self.missing_digits);
        }
        if !self.is_balanced {
            warn!("Dataset is unbalanced (ratio {:.2})", self.balance_ratio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::{DatasetPlan, SampleGenerator, SynthesisConfig};
    use image::Rgb;

    fn record(digit: u8, width: u32, height: u32) -> SampleMetadata {
        SampleMetadata {
            digit: Digit::new(digit).unwrap(),
            width,
            height,
            effects_applied: Vec::new(),
            filename: String::new(),
            sample_id: 0,
            seed: None,
        }
    }

    #[test]
    fn test_series_stats() {
        let stats = SeriesStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean - 5.0).abs() < 1e-6);
        assert!((stats.std - 2.0).abs() < 1e-6);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(SeriesStats::from_values(&[]), SeriesStats::default());
    }

    #[test]
    fn test_balanced_complete_dataset() {
        let metadata: Vec<_> = (0..10u8).flat_map(|d| [record(d, 200, 300), record(d, 200, 300)]).collect();
        let report = DatasetReport::from_metadata(&metadata);
        assert_eq!(report.total_samples, 20);
        assert_eq!(report.per_digit_counts, [2; 10]);
        assert_eq!(report.balance_ratio, 1.0);
        assert!(report.is_valid());
    }

    #[test]
    fn test_missing_and_unbalanced() {
        let mut metadata: Vec<_> = (0..9u8).map(|d| record(d, 200, 300)).collect();
        metadata.push(record(0, 200, 300));
        metadata.push(record(0, 100, 150));
        let report = DatasetReport::from_metadata(&metadata);
        assert_eq!(report.missing_digits, vec![Digit::new(9).unwrap()]);
        assert!((report.balance_ratio - 1.0 / 3.0).abs() < 1e-6);
        assert!(!report.is_balanced);
        assert!(!report.consistent_dimensions);
        assert_eq!(report.dimensions, vec![(100, 150), (200, 300)]);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_image_statistics() {
        let flat = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        let split = RgbImage::from_fn(4, 4, |x, _| if x < 2 { Rgb([0, 0, 0]) } else { Rgb([200, 200, 200]) });
        let stats = ImageStatistics::from_images([&flat, &split]);
        assert_eq!(stats.sample_count, 2);
        assert!((stats.brightness.mean - 100.0).abs() < 1e-3);
        assert!((stats.contrast.min - 0.0).abs() < 1e-3);
        assert!((stats.contrast.max - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_generated_dataset_passes() {
        let generator =
            SampleGenerator::new(SynthesisConfig::default().with_size(30, 45).with_seed(5)).unwrap();
        let samples = generator.generate_dataset(&DatasetPlan::new(1)).unwrap();
        let report = DatasetReport::from_samples(&samples);
        assert!(report.is_valid());
        let stats = report.statistics.unwrap();
        assert_eq!(stats.sample_count, 10);
        assert!(stats.brightness.mean > 0.0);
    }
}
