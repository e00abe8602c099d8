//! Clean seven-segment rendering.

use super::config::RenderConfig;
use crate::core::config::ConfigValidatorExt;
use crate::core::OcrResult;
use crate::domain::{Digit, Segment, SegmentGeometry};
use crate::utils::{ensure_non_empty, fill_polygon};
use image::{Rgb, RgbImage};
use tracing::debug;

/// Renders clean digits: a uniform background with the lit segments filled
/// in a uniform dark level. Output depends only on the inputs.
#[derive(Debug, Clone, Default)]
pub struct ImageSynthesizer {
    config: RenderConfig,
}

impl ImageSynthesizer {
    /// Creates a synthesizer with validated intensities.
    pub fn new(config: RenderConfig) -> OcrResult<Self> {
        Ok(Self {
            config: config.validate_and_wrap_ocr_error()?,
        })
    }

    /// The intensities this synthesizer draws with.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders a raw digit value.
    ///
    /// # Arguments
    ///
    /// * `digit` - The digit to draw, `0..=9`.
    /// * `width` - Canvas width in pixels.
    /// * `height` - Canvas height in pixels.
    ///
    /// # Errors
    ///
    /// * `OCRError::InvalidDigit` if `digit` is not in `0..=9`.
    /// * `OCRError::InvalidImage` if either dimension is zero.
    pub fn render(&self, digit: u8, width: u32, height: u32) -> OcrResult<RgbImage> {
        self.render_digit(Digit::new(digit)?, width, height)
    }

    /// Renders a validated digit.
    pub fn render_digit(&self, digit: Digit, width: u32, height: u32) -> OcrResult<RgbImage> {
        ensure_non_empty(width, height)?;

        let background = self.config.background;
        let ink = Rgb([self.config.segment; 3]);
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([background; 3]));

        let segments = SegmentGeometry::active_segments(digit);
        for segment in segments.iter() {
            fill_polygon(&mut canvas, &SegmentGeometry::polygon(segment, width, height), ink);
        }

        debug!(
            "Rendered digit {} ({}x{}) with segments {}",
            digit, width, height, segments
        );
        Ok(canvas)
    }

    /// Renders a single segment on the background; handy for inspecting geometry.
    pub fn render_segment(&self, segment: Segment, width: u32, height: u32) -> OcrResult<RgbImage> {
        ensure_non_empty(width, height)?;
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([self.config.background; 3]));
        fill_polygon(
            &mut canvas,
            &SegmentGeometry::polygon(segment, width, height),
            Rgb([self.config.segment; 3]),
        );
        Ok(canvas)
    }
}
