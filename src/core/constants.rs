//! Constants used throughout synthesis and recognition.
//!
//! This module defines the default canvas, the pixel intensities used by the
//! renderer, and the thresholds shared by the activation estimator, the
//! degradation pipeline and the arbitrator.

/// The default canvas width in pixels.
pub const DEFAULT_WIDTH: u32 = 200;

/// The default canvas height in pixels.
pub const DEFAULT_HEIGHT: u32 = 300;

/// The default background intensity.
///
/// Written to all three channels of every pixel that is not covered by an
/// active segment.
pub const DEFAULT_BACKGROUND: u8 = 220;

/// The default segment intensity.
///
/// Written to all three channels of every pixel covered by an active segment.
pub const DEFAULT_SEGMENT: u8 = 40;

/// Channel value below which a clean-image pixel counts as segment ink.
///
/// Used by the contrast stage to decide which pixels receive the lightening
/// offset after contrast compression.
pub const CLEAN_DARK_LEVEL: u8 = 100;

/// Activation threshold applied to the mean of the adaptive binary mask in a ROI.
pub const ADAPTIVE_MEAN_ACTIVATION_THRESHOLD: f32 = 0.4;

/// Activation threshold applied to the raw dark-pixel ratio in a ROI.
///
/// Used by the Otsu based fallback rule, which sees more background bleed
/// than the adaptive mask and therefore uses a lower cut-off.
pub const RAW_RATIO_ACTIVATION_THRESHOLD: f32 = 0.3;

/// Fixed confidence reported for readings from a traditional OCR engine.
pub const TRADITIONAL_OCR_CONFIDENCE: f32 = 0.6;

/// The default threshold above which a recognition result counts as confident.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Number of segments in a seven-segment cell.
pub const SEGMENT_COUNT: usize = 7;

/// Number of decimal digit classes.
pub const DIGIT_COUNT: usize = 10;
