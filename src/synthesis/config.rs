//! Configuration for rendering, degradation and sample generation.
//!
//! Every random quantity the degradation pipeline draws is described by an
//! inclusive [`Bounds`] range. All structs deserialize with defaults for
//! missing fields, so a JSON document only needs the values it overrides.

use super::degrade::DegradationStep;
use crate::core::config::{ConfigError, ConfigValidator, ParallelPolicy};
use crate::core::{
    CLEAN_DARK_LEVEL, DEFAULT_BACKGROUND, DEFAULT_HEIGHT, DEFAULT_SEGMENT, DEFAULT_WIDTH, OCRError,
    OcrResult,
};
use rand::Rng;
use rand::distributions::uniform::SampleUniform;
use serde::{Deserialize, Serialize};

/// An inclusive sampling range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T> Bounds<T>
where
    T: Copy + PartialOrd + SampleUniform,
{
    /// Creates a range from `min` to `max` inclusive.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Draws a value uniformly from the range.
    ///
    /// A range whose bounds are equal (or reversed) always yields `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        if self.min < self.max {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    /// Returns true if `value` lies inside the range.
    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Pixel intensities used by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Background gray level, written to all channels.
    pub background: u8,
    /// Segment gray level, written to all channels.
    pub segment: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            segment: DEFAULT_SEGMENT,
        }
    }
}

impl ConfigValidator for RenderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.segment >= self.background {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "segment level {} must be darker than background level {}",
                    self.segment, self.background
                ),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Parameters of the sensor degradation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    /// Stages to run, in canonical order.
    pub steps: Vec<DegradationStep>,

    /// Contrast compression factor applied around mid-gray.
    pub contrast_factor: Bounds<f32>,
    /// Normalized offset added to pixels that were ink in the clean image.
    pub dark_lift: Bounds<f32>,
    /// A clean pixel is ink when every channel is below this level.
    pub clean_dark_level: u8,

    /// Number of radial highlights.
    pub reflection_count: Bounds<u32>,
    /// Highlight radius in pixels.
    pub reflection_radius: Bounds<u32>,
    /// Normalized highlight brightness at its center.
    pub reflection_intensity: Bounds<f32>,

    /// Number of smudges.
    pub smudge_count: Bounds<u32>,
    /// Semi-axis of a smudge along its rotated x axis, in pixels.
    pub smudge_semi_major: Bounds<u32>,
    /// Semi-axis of a smudge along its rotated y axis, in pixels.
    pub smudge_semi_minor: Bounds<u32>,
    /// Sigma of the blur that softens each smudge mask.
    pub smudge_blur_sigma: f32,
    /// Normalized darkening at the full-strength part of a smudge.
    pub smudge_intensity: Bounds<f32>,

    /// Number of dust particles.
    pub dust_count: Bounds<u32>,
    /// Particle radius in pixels; radius 1 is a single pixel.
    pub dust_radius: Bounds<u32>,
    /// Particle gray level.
    pub dust_gray: Bounds<u8>,

    /// Standard deviation of the additive Gaussian noise, drawn once per image.
    pub noise_sigma: Bounds<f32>,

    /// Lighting multiplier at the bright end of a linear gradient.
    pub lighting_bright: f32,
    /// Lighting multiplier at the dim end of a linear gradient.
    pub lighting_dim: f32,
    /// Lighting multiplier at the center of the radial gradient.
    pub lighting_center_peak: f32,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            steps: DegradationStep::ALL.to_vec(),
            contrast_factor: Bounds::new(0.3, 0.7),
            dark_lift: Bounds::new(0.1, 0.3),
            clean_dark_level: CLEAN_DARK_LEVEL,
            reflection_count: Bounds::new(1, 3),
            reflection_radius: Bounds::new(20, 80),
            reflection_intensity: Bounds::new(0.2, 0.6),
            smudge_count: Bounds::new(2, 5),
            smudge_semi_major: Bounds::new(10, 30),
            smudge_semi_minor: Bounds::new(7, 20),
            smudge_blur_sigma: 2.6,
            smudge_intensity: Bounds::new(0.05, 0.15),
            dust_count: Bounds::new(10, 30),
            dust_radius: Bounds::new(1, 3),
            dust_gray: Bounds::new(60, 180),
            noise_sigma: Bounds::new(2.0, 8.0),
            lighting_bright: 1.2,
            lighting_dim: 0.8,
            lighting_center_peak: 1.3,
        }
    }
}

impl DegradationConfig {
    /// A configuration with no stages; degradation returns the clean image.
    pub fn disabled() -> Self {
        Self {
            steps: Vec::new(),
            ..Self::default()
        }
    }

    /// Replaces the list of stages.
    pub fn with_steps(mut self, steps: impl Into<Vec<DegradationStep>>) -> Self {
        self.steps = steps.into();
        self
    }

    fn validate_unit_bounds(&self, bounds: &Bounds<f32>, field: &str) -> Result<(), ConfigError> {
        self.validate_ordered(bounds.min, bounds.max, field)?;
        self.validate_f32_range(bounds.min, 0.0, 1.0, field)?;
        self.validate_f32_range(bounds.max, 0.0, 1.0, field)
    }
}

impl ConfigValidator for DegradationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for pair in self.steps.windows(2) {
            if pair[0] >= pair[1] {
                return Err(ConfigError::InvalidConfig {
                    message: format!(
                        "degradation steps must follow the canonical order without repeats, got {:?}",
                        self.steps
                    ),
                });
            }
        }

        self.validate_unit_bounds(&self.contrast_factor, "contrast_factor")?;
        self.validate_unit_bounds(&self.dark_lift, "dark_lift")?;
        self.validate_unit_bounds(&self.reflection_intensity, "reflection_intensity")?;
        self.validate_unit_bounds(&self.smudge_intensity, "smudge_intensity")?;

        self.validate_ordered(self.reflection_count.min, self.reflection_count.max, "reflection_count")?;
        self.validate_ordered(self.reflection_radius.min, self.reflection_radius.max, "reflection_radius")?;
        self.validate_positive_usize(self.reflection_radius.min as usize, "reflection_radius")?;

        self.validate_ordered(self.smudge_count.min, self.smudge_count.max, "smudge_count")?;
        self.validate_ordered(self.smudge_semi_major.min, self.smudge_semi_major.max, "smudge_semi_major")?;
        self.validate_ordered(self.smudge_semi_minor.min, self.smudge_semi_minor.max, "smudge_semi_minor")?;
        self.validate_positive_usize(self.smudge_semi_major.min as usize, "smudge_semi_major")?;
        self.validate_positive_usize(self.smudge_semi_minor.min as usize, "smudge_semi_minor")?;
        self.validate_positive_f32(self.smudge_blur_sigma, "smudge_blur_sigma")?;

        self.validate_ordered(self.dust_count.min, self.dust_count.max, "dust_count")?;
        self.validate_ordered(self.dust_radius.min, self.dust_radius.max, "dust_radius")?;
        self.validate_positive_usize(self.dust_radius.min as usize, "dust_radius")?;
        self.validate_ordered(self.dust_gray.min, self.dust_gray.max, "dust_gray")?;

        self.validate_ordered(self.noise_sigma.min, self.noise_sigma.max, "noise_sigma")?;
        self.validate_f32_range(self.noise_sigma.min, 0.0, 255.0, "noise_sigma")?;
        self.validate_f32_range(self.noise_sigma.max, 0.0, 255.0, "noise_sigma")?;

        self.validate_f32_range(self.lighting_bright, 0.0, 4.0, "lighting_bright")?;
        self.validate_f32_range(self.lighting_dim, 0.0, 4.0, "lighting_dim")?;
        self.validate_f32_range(self.lighting_center_peak, 0.0, 4.0, "lighting_center_peak")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Top-level configuration for sample generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Base seed for per-sample RNGs. A random seed is chosen when absent.
    pub seed: Option<u64>,
    pub render: RenderConfig,
    pub degradation: DegradationConfig,
    pub parallel: ParallelPolicy,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: None,
            render: RenderConfig::default(),
            degradation: DegradationConfig::default(),
            parallel: ParallelPolicy::default(),
        }
    }
}

impl SynthesisConfig {
    /// Parses a configuration from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::ConfigError` if the document is malformed or any
    /// value fails validation.
    pub fn from_json_str(json: &str) -> OcrResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OCRError::config_error(format!("failed to parse synthesis config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the canvas size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the degradation configuration.
    pub fn with_degradation(mut self, degradation: DegradationConfig) -> Self {
        self.degradation = degradation;
        self
    }

    /// Sets the parallel policy.
    pub fn with_parallel(mut self, parallel: ParallelPolicy) -> Self {
        self.parallel = parallel;
        self
    }
}

impl ConfigValidator for SynthesisConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_image_dimensions(self.width, self.height)?;
        self.render.validate()?;
        self.degradation.validate()?;
        self.parallel.validate()
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
