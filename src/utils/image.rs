//! Utility functions for image buffers.
//!
//! This module provides the conversions and drawing helpers shared by the
//! synthesizer, the degradation pipeline and the activation estimator:
//! format conversion, buffer validation, polygon filling that tolerates
//! degenerate polygons, and in-memory PNG encoding for callers that persist
//! samples.

use crate::core::{OCRError, OcrResult};
use image::{DynamicImage, ImageBuffer, Pixel, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Converts a DynamicImage to an RgbImage.
///
/// # Arguments
///
/// * `img` - The DynamicImage to convert
///
/// # Returns
///
/// * `RgbImage` - The converted RGB image
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Fails with `InvalidImage` when a buffer has no pixels.
pub fn ensure_non_empty(width: u32, height: u32) -> OcrResult<()> {
    if width == 0 || height == 0 {
        return Err(OCRError::invalid_image(width, height));
    }
    Ok(())
}

/// Fills a polygon given in pixel coordinates.
///
/// Consecutive duplicate vertices and a closing vertex equal to the first are
/// removed before drawing. Polygons that collapse to a single point on small
/// canvases are skipped.
///
/// # Arguments
///
/// * `canvas` - The image to draw on.
/// * `points` - Polygon vertices as `(x, y)` pixel coordinates.
/// * `color` - The fill color.
pub fn fill_polygon<P>(canvas: &mut ImageBuffer<P, Vec<P::Subpixel>>, points: &[(i32, i32)], color: P)
where
    P: Pixel,
{
    let mut vertices: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let point = Point::new(x, y);
        if vertices.last() != Some(&point) {
            vertices.push(point);
        }
    }
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.len() < 2 {
        return;
    }
    draw_polygon_mut(canvas, &vertices, color);
}

/// Clamps a float channel value into `[0, 255]` and rounds it to `u8`.
#[inline]
pub fn clamp_to_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// Encodes an RGB image as PNG bytes.
///
/// The crate never writes files itself; callers persisting samples can hand
/// these bytes to whatever storage they use.
///
/// # Errors
///
/// Returns `OCRError::Image` if the encoder fails.
pub fn encode_png(image: &RgbImage) -> OcrResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
