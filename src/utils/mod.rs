//! Utility functions shared across the crate.

pub mod image;

// Re-export image processing functions
pub use image::{clamp_to_u8, dynamic_to_rgb, encode_png, ensure_non_empty, fill_polygon};
