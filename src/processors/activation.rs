//! Segment activation estimation.
//!
//! Turns an image of a single display cell into per-segment evidence. The
//! default rule equalizes local contrast, binarizes against a local mean and
//! measures the foreground fraction inside a fixed region of interest (ROI)
//! per segment. A simpler rule thresholds at the global Otsu level instead.

use super::contrast::{
    adaptive_threshold_mean, adaptive_window_radius, clahe, clean_mask, gaussian_blur,
    otsu_dark_mask, rgb_to_gray,
};
use crate::core::config::{ConfigError, ConfigValidator, ConfigValidatorExt};
use crate::core::{
    ADAPTIVE_MEAN_ACTIVATION_THRESHOLD, OcrResult, RAW_RATIO_ACTIVATION_THRESHOLD, SEGMENT_COUNT,
};
use crate::domain::{ActivationVector, Segment};
use crate::utils::{dynamic_to_rgb, ensure_non_empty};
use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fractional ROI per segment as `(row_start, row_end, col_start, col_end)`,
/// indexed `A..G`.
const SEGMENT_ROIS: [(f64, f64, f64, f64); SEGMENT_COUNT] = [
    (0.08, 0.18, 0.22, 0.78),
    (0.18, 0.45, 0.75, 0.90),
    (0.55, 0.85, 0.75, 0.90),
    (0.82, 0.92, 0.22, 0.78),
    (0.55, 0.85, 0.10, 0.25),
    (0.18, 0.45, 0.10, 0.25),
    (0.45, 0.57, 0.22, 0.78),
];

/// A pixel rectangle, half-open on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiRect {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl RoiRect {
    /// Number of pixels inside the rectangle.
    pub fn area(&self) -> u64 {
        u64::from(self.bottom.saturating_sub(self.top)) * u64::from(self.right.saturating_sub(self.left))
    }
}

/// ROI of `segment` on a `width` x `height` image, truncating fractional bounds.
pub fn segment_roi(segment: Segment, width: u32, height: u32) -> RoiRect {
    let (r0, r1, c0, c1) = SEGMENT_ROIS[segment.index()];
    let (w, h) = (f64::from(width), f64::from(height));
    RoiRect {
        top: (h * r0) as u32,
        bottom: (h * r1) as u32,
        left: (w * c0) as u32,
        right: (w * c1) as u32,
    }
}

/// Fraction of foreground (non-zero) mask pixels inside `roi`; 0.0 when empty.
pub fn roi_ratio(mask: &GrayImage, roi: RoiRect) -> f32 {
    let bottom = roi.bottom.min(mask.height());
    let right = roi.right.min(mask.width());
    let clipped = RoiRect { bottom, right, ..roi };
    let area = clipped.area();
    if area == 0 {
        return 0.0;
    }
    let mut on = 0u64;
    for y in clipped.top..bottom {
        for x in clipped.left..right {
            if mask.get_pixel(x, y).0[0] > 0 {
                on += 1;
            }
        }
    }
    on as f32 / area as f32
}

/// How foreground pixels are found before measuring each ROI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationRule {
    /// CLAHE, blur and a local-mean threshold.
    AdaptiveMean,
    /// Pixels at or below the global Otsu level.
    RawRatio,
}

impl ActivationRule {
    /// The ROI fraction above which a segment counts as lit under this rule.
    pub const fn default_threshold(self) -> f32 {
        match self {
            ActivationRule::AdaptiveMean => ADAPTIVE_MEAN_ACTIVATION_THRESHOLD,
            ActivationRule::RawRatio => RAW_RATIO_ACTIVATION_THRESHOLD,
        }
    }
}

/// Estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub rule: ActivationRule,
    /// ROI fraction a segment must exceed; the rule's default when absent.
    pub activation_threshold: Option<f32>,
    /// CLAHE clip limit.
    pub clip_limit: f32,
    /// CLAHE grid as `(columns, rows)`.
    pub tile_grid: (u32, u32),
    /// Blur applied after equalization.
    pub blur_sigma: f32,
    /// How much darker than the local mean a foreground pixel must be.
    pub adaptive_offset: f32,
    /// Local-mean window radius; derived from the image size when absent.
    pub window_radius: Option<u32>,
    /// Close then open the binary mask.
    pub morphological_cleanup: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            rule: ActivationRule::AdaptiveMean,
            activation_threshold: None,
            clip_limit: 2.0,
            tile_grid: (8, 8),
            blur_sigma: 0.8,
            adaptive_offset: 2.0,
            window_radius: None,
            morphological_cleanup: true,
        }
    }
}

impl EstimatorConfig {
    /// Settings for the Otsu based rule.
    pub fn raw_ratio() -> Self {
        Self {
            rule: ActivationRule::RawRatio,
            ..Self::default()
        }
    }

    /// The threshold in effect.
    pub fn effective_threshold(&self) -> f32 {
        self.activation_threshold
            .unwrap_or_else(|| self.rule.default_threshold())
    }
}

impl ConfigValidator for EstimatorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = self.activation_threshold {
            self.validate_f32_range(threshold, 0.0, 1.0, "activation_threshold")?;
        }
        self.validate_positive_f32(self.clip_limit, "clip_limit")?;
        self.validate_positive_usize(self.tile_grid.0 as usize, "tile_grid columns")?;
        self.validate_positive_usize(self.tile_grid.1 as usize, "tile_grid rows")?;
        self.validate_f32_range(self.blur_sigma, 0.0, 10.0, "blur_sigma")?;
        self.validate_f32_range(self.adaptive_offset, -255.0, 255.0, "adaptive_offset")?;
        if let Some(radius) = self.window_radius {
            self.validate_positive_usize(radius as usize, "window_radius")?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Measures how lit each segment of a display cell is.
#[derive(Debug, Clone, Default)]
pub struct SegmentActivationEstimator {
    config: EstimatorConfig,
}

impl SegmentActivationEstimator {
    /// Creates an estimator from a validated configuration.
    pub fn new(config: EstimatorConfig) -> OcrResult<Self> {
        Ok(Self {
            config: config.validate_and_wrap_ocr_error()?,
        })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates the activation vector of an RGB image.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::InvalidImage` if the image has no pixels.
    pub fn estimate(&self, image: &RgbImage) -> OcrResult<ActivationVector> {
        ensure_non_empty(image.width(), image.height())?;
        self.estimate_gray(&rgb_to_gray(image))
    }

    /// Estimates the activation vector of a decoded image of any pixel format.
    pub fn estimate_dynamic(&self, image: DynamicImage) -> OcrResult<ActivationVector> {
        self.estimate(&dynamic_to_rgb(image))
    }

    /// Estimates the activation vector of a grayscale image.
    pub fn estimate_gray(&self, gray: &GrayImage) -> OcrResult<ActivationVector> {
        let scores = self.scores_gray(gray)?;
        let vector = ActivationVector::from_scores(&scores, self.config.effective_threshold());
        debug!("Estimated activations {} from scores {:?}", vector, scores);
        Ok(vector)
    }

    /// Per-segment foreground fractions in `[0, 1]`, indexed `A..G`.
    pub fn scores(&self, image: &RgbImage) -> OcrResult<[f32; SEGMENT_COUNT]> {
        ensure_non_empty(image.width(), image.height())?;
        self.scores_gray(&rgb_to_gray(image))
    }

    /// Per-segment foreground fractions of a grayscale image.
    pub fn scores_gray(&self, gray: &GrayImage) -> OcrResult<[f32; SEGMENT_COUNT]> {
        let (width, height) = gray.dimensions();
        ensure_non_empty(width, height)?;
        let mask = self.foreground_mask(gray);

        let mut scores = [0.0f32; SEGMENT_COUNT];
        for segment in Segment::ALL {
            scores[segment.index()] = roi_ratio(&mask, segment_roi(segment, width, height));
        }
        Ok(scores)
    }

    /// Binary foreground mask (255 = ink) according to the configured rule.
    pub fn foreground_mask(&self, gray: &GrayImage) -> GrayImage {
        let config = &self.config;
        let mask = match config.rule {
            ActivationRule::AdaptiveMean => {
                let equalized = clahe(gray, config.clip_limit, config.tile_grid);
                let smoothed = gaussian_blur(&equalized, config.blur_sigma);
                let radius = config
                    .window_radius
                    .unwrap_or_else(|| adaptive_window_radius(gray.width(), gray.height()));
                adaptive_threshold_mean(&smoothed, radius, config.adaptive_offset)
            }
            ActivationRule::RawRatio => otsu_dark_mask(gray),
        };
        if config.morphological_cleanup && config.rule == ActivationRule::AdaptiveMean {
            clean_mask(&mask)
        } else {
            mask
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OCRError;
    use crate::domain::SegmentGeometry;
    use crate::synthesis::{ImageSynthesizer, RenderConfig};

    fn truth(digit: u8) -> ActivationVector {
        ActivationVector::from(SegmentGeometry::active_segments_u8(digit).unwrap())
    }

    #[test]
    fn test_segment_roi_truncates() {
        assert_eq!(
            segment_roi(Segment::A, 200, 300),
            RoiRect {
                top: 24,
                bottom: 54,
                left: 44,
                right: 156
            }
        );
        assert_eq!(segment_roi(Segment::G, 1, 1).area(), 0);
    }

    #[test]
    fn test_roi_ratio_empty_is_zero() {
        let mask = GrayImage::new(4, 4);
        let roi = RoiRect {
            top: 2,
            bottom: 2,
            left: 0,
            right: 4,
        };
        assert_eq!(roi_ratio(&mask, roi), 0.0);
    }

    #[test]
    fn test_clean_renders_reproduce_truth_table() {
        let synth = ImageSynthesizer::default();
        let estimator = SegmentActivationEstimator::default();
        for digit in 0..=9 {
            let image = synth.render(digit, 200, 300).unwrap();
            assert_eq!(estimator.estimate(&image).unwrap(), truth(digit), "digit {digit}");
        }
    }

    #[test]
    fn test_estimate_dynamic_matches_rgb() {
        let image = ImageSynthesizer::default().render(2, 200, 300).unwrap();
        let estimator = SegmentActivationEstimator::default();
        let dynamic = DynamicImage::ImageRgb8(image.clone());
        assert_eq!(
            estimator.estimate_dynamic(dynamic).unwrap(),
            estimator.estimate(&image).unwrap()
        );
    }

    #[test]
    fn test_clean_renders_other_sizes_and_levels() {
        let estimator = SegmentActivationEstimator::default();
        let small = ImageSynthesizer::default();
        let dim = ImageSynthesizer::new(RenderConfig {
            background: 200,
            segment: 90,
        })
        .unwrap();
        for digit in 0..=9 {
            let image = small.render(digit, 100, 150).unwrap();
            assert_eq!(estimator.estimate(&image).unwrap(), truth(digit), "small {digit}");
            let image = dim.render(digit, 200, 300).unwrap();
            assert_eq!(estimator.estimate(&image).unwrap(), truth(digit), "dim {digit}");
        }
    }

    #[test]
    fn test_raw_ratio_rule_on_clean_renders() {
        let synth = ImageSynthesizer::default();
        let estimator = SegmentActivationEstimator::new(EstimatorConfig::raw_ratio()).unwrap();
        assert_eq!(estimator.config().effective_threshold(), 0.3);
        for digit in [0, 1, 4, 7, 8] {
            let image = synth.render(digit, 200, 300).unwrap();
            assert_eq!(estimator.estimate(&image).unwrap(), truth(digit), "digit {digit}");
        }
    }

    #[test]
    fn test_scores_separate_lit_and_unlit() {
        let image = ImageSynthesizer::default().render(7, 200, 300).unwrap();
        let scores = SegmentActivationEstimator::default().scores(&image).unwrap();
        for segment in Segment::ALL {
            let score = scores[segment.index()];
            assert!((0.0..=1.0).contains(&score));
            if matches!(segment, Segment::A | Segment::B | Segment::C) {
                assert!(score > 0.6, "{segment} = {score}");
            } else {
                assert!(score < 0.1, "{segment} = {score}");
            }
        }
    }

    #[test]
    fn test_empty_image_rejected() {
        let estimator = SegmentActivationEstimator::default();
        assert!(matches!(
            estimator.estimate(&RgbImage::new(0, 10)),
            Err(OCRError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_tiny_image_does_not_panic() {
        let estimator = SegmentActivationEstimator::default();
        let vector = estimator.estimate(&RgbImage::new(2, 3)).unwrap();
        assert_eq!(vector, ActivationVector::default());
    }

    #[test]
    fn test_config_validation() {
        let config = EstimatorConfig {
            activation_threshold: Some(1.5),
            ..Default::default()
        };
        assert!(SegmentActivationEstimator::new(config).is_err());
        let config = EstimatorConfig {
            tile_grid: (0, 8),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
