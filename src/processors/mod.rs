//! Image processing for structural recognition.
//!
//! # Modules
//!
//! * `contrast` - Grayscale conversion, CLAHE, blurring and thresholding
//! * `activation` - Per-segment activation estimation over fixed regions

pub mod activation;
pub mod contrast;

pub use activation::{
    ActivationRule, EstimatorConfig, RoiRect, SegmentActivationEstimator, roi_ratio, segment_roi,
};
pub use contrast::{
    adaptive_threshold_mean, adaptive_window_radius, clahe, clean_mask, gaussian_blur,
    otsu_dark_mask, otsu_level, rgb_to_gray,
};
