//! Segment geometry and the digit truth table.
//!
//! Segment outlines are defined once in unit coordinates (`x` to the right,
//! `y` downward, both in `[0, 1]`) and scaled to the canvas at render time.
//! Each outline covers the matching activation region of interest and stays
//! clear of every other segment's region, so a clean render reads back
//! exactly.

use super::segment::{Digit, Segment, SegmentSet};
use crate::core::OcrResult;

use Segment::{A, B, C, D, E, F, G};

/// Unit-square outline of each segment, indexed `A..G`.
const UNIT_POLYGONS: [&[(f64, f64)]; 7] = [
    // A: horizontal bar, bevelled towards the cell interior.
    &[(0.20, 0.08), (0.80, 0.08), (0.74, 0.18), (0.26, 0.18)],
    // B
    &[(0.90, 0.12), (0.90, 0.48), (0.78, 0.44), (0.78, 0.20)],
    // C
    &[(0.78, 0.56), (0.90, 0.52), (0.90, 0.88), (0.78, 0.80)],
    // D
    &[(0.26, 0.82), (0.74, 0.82), (0.80, 0.92), (0.20, 0.92)],
    // E
    &[(0.10, 0.52), (0.22, 0.56), (0.22, 0.80), (0.10, 0.88)],
    // F
    &[(0.10, 0.12), (0.22, 0.20), (0.22, 0.44), (0.10, 0.48)],
    // G: hexagon.
    &[
        (0.24, 0.51),
        (0.30, 0.46),
        (0.70, 0.46),
        (0.76, 0.51),
        (0.70, 0.56),
        (0.30, 0.56),
    ],
];

/// Active segments per digit, indexed by digit value.
const DIGIT_SEGMENTS: [SegmentSet; 10] = [
    SegmentSet::from_segments(&[A, B, C, D, E, F]),
    SegmentSet::from_segments(&[B, C]),
    SegmentSet::from_segments(&[A, B, G, E, D]),
    SegmentSet::from_segments(&[A, B, G, C, D]),
    SegmentSet::from_segments(&[F, G, B, C]),
    SegmentSet::from_segments(&[A, F, G, C, D]),
    SegmentSet::from_segments(&[A, F, G, E, D, C]),
    SegmentSet::from_segments(&[A, B, C]),
    SegmentSet::from_segments(&[A, B, C, D, E, F, G]),
    SegmentSet::from_segments(&[A, B, C, D, F, G]),
];

/// Static description of a seven-segment cell.
///
/// Stateless; all methods are associated functions over the fixed tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentGeometry;

impl SegmentGeometry {
    /// Outline of `segment` in unit coordinates.
    pub fn unit_polygon(segment: Segment) -> &'static [(f64, f64)] {
        UNIT_POLYGONS[segment.index()]
    }

    /// Outline of `segment` scaled to a `width` x `height` canvas.
    ///
    /// Coordinates are truncated towards zero, matching an integer cast.
    ///
    /// # Arguments
    ///
    /// * `segment` - The segment to outline.
    /// * `width` - Canvas width in pixels.
    /// * `height` - Canvas height in pixels.
    ///
    /// # Returns
    ///
    /// Ordered `(x, y)` pixel vertices.
    pub fn polygon(segment: Segment, width: u32, height: u32) -> Vec<(i32, i32)> {
        let (w, h) = (f64::from(width), f64::from(height));
        Self::unit_polygon(segment)
            .iter()
            .map(|&(x, y)| ((x * w) as i32, (y * h) as i32))
            .collect()
    }

    /// Segments lit for `digit`.
    pub fn active_segments(digit: Digit) -> SegmentSet {
        DIGIT_SEGMENTS[digit.index()]
    }

    /// Segments lit for a raw digit value.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::InvalidDigit` if `digit` is not in `0..=9`.
    pub fn active_segments_u8(digit: u8) -> OcrResult<SegmentSet> {
        Ok(Self::active_segments(Digit::new(digit)?))
    }
}
