//! Grayscale conversion, local contrast equalization and binarization.
//!
//! These are the building blocks of the segment activation estimator. They
//! operate on 8-bit grayscale buffers and never fail; empty inputs produce
//! empty outputs.

use crate::utils::clamp_to_u8;
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology;

/// ITU-R BT.601 luma weights for red, green and blue.
pub const BT601_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Number of gray levels in an 8-bit histogram.
const LEVELS: usize = 256;

/// Converts an RGB image to grayscale with BT.601 weights.
pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    let [wr, wg, wb] = BT601_WEIGHTS;
    let mut gray = GrayImage::new(image.width(), image.height());
    for (dst, src) in gray.pixels_mut().zip(image.pixels()) {
        let [r, g, b] = src.0;
        dst.0[0] = clamp_to_u8(wr * f32::from(r) + wg * f32::from(g) + wb * f32::from(b));
    }
    gray
}

/// Gaussian blur that leaves images no larger than the kernel untouched.
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if !(sigma > 0.0) {
        return image.clone();
    }
    let kernel = 2 * (3.0 * sigma).ceil() as u32 + 1;
    if image.width() <= kernel || image.height() <= kernel {
        return image.clone();
    }
    gaussian_blur_f32(image, sigma)
}

/// Contrast limited adaptive histogram equalization.
///
/// The image is split into a `tiles.0` x `tiles.1` grid. Each tile gets an
/// equalization table built from its clipped histogram, and every pixel is
/// mapped by bilinear interpolation between the tables of the four nearest
/// tile centers.
///
/// # Arguments
///
/// * `image` - The grayscale input.
/// * `clip_limit` - Histogram clip limit, relative to a flat histogram.
/// * `tiles` - Grid size as `(columns, rows)`; clamped to the image size.
///
/// # Returns
///
/// The equalized image, same size as the input.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: (u32, u32)) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = tiles.0.clamp(1, width);
    let tiles_y = tiles.1.clamp(1, height);

    // Tile boundaries: tile i covers [edges[i], edges[i + 1]).
    let edges = |count: u32, len: u32| -> Vec<u32> {
        (0..=count).map(|i| (u64::from(i) * u64::from(len) / u64::from(count)) as u32).collect()
    };
    let x_edges = edges(tiles_x, width);
    let y_edges = edges(tiles_y, height);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            let mut histogram = [0u32; LEVELS];
            for y in y_edges[ty]..y_edges[ty + 1] {
                for x in x_edges[tx]..x_edges[tx + 1] {
                    histogram[image.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x_edges[tx + 1] - x_edges[tx]) * (y_edges[ty + 1] - y_edges[ty]);
            luts.push(tile_lut(&mut histogram, area, clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    let neighbours = |pos: u32, size: f32, count: u32| -> (usize, usize, f32) {
        let t = (pos as f32 + 0.5) / size - 0.5;
        let lo = t.floor();
        let frac = t - lo;
        let max = count as i64 - 1;
        let i0 = (lo as i64).clamp(0, max) as usize;
        let i1 = (lo as i64 + 1).clamp(0, max) as usize;
        (i0, i1, frac)
    };

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, fy) = neighbours(y, tile_h, tiles_y);
        for x in 0..width {
            let (tx0, tx1, fx) = neighbours(x, tile_w, tiles_x);
            let v = image.get_pixel(x, y).0[0] as usize;
            let at = |tx: usize, ty: usize| luts[ty * tiles_x as usize + tx][v];
            let top = at(tx0, ty0) * (1.0 - fx) + at(tx1, ty0) * fx;
            let bottom = at(tx0, ty1) * (1.0 - fx) + at(tx1, ty1) * fx;
            out.put_pixel(x, y, Luma([clamp_to_u8(top * (1.0 - fy) + bottom * fy)]));
        }
    }
    out
}

/// Builds the equalization table of one tile from its histogram.
fn tile_lut(histogram: &mut [u32; LEVELS], area: u32, clip_limit: f32) -> [f32; LEVELS] {
    let mut lut = [0.0f32; LEVELS];
    if area == 0 {
        for (level, entry) in lut.iter_mut().enumerate() {
            *entry = level as f32;
        }
        return lut;
    }

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / LEVELS as f32) as u32).max(1);
        let mut excess = 0u32;
        for count in histogram.iter_mut() {
            if *count > limit {
                excess += *count - limit;
                *count = limit;
            }
        }
        let batch = excess / LEVELS as u32;
        let residual = (excess % LEVELS as u32) as usize;
        for count in histogram.iter_mut() {
            *count += batch;
        }
        if residual > 0 {
            let step = (LEVELS / residual).max(1);
            for count in histogram.iter_mut().step_by(step).take(residual) {
                *count += 1;
            }
        }
    }

    let scale = (LEVELS - 1) as f32 / area as f32;
    let mut cumulative = 0u32;
    for (entry, count) in lut.iter_mut().zip(histogram.iter()) {
        cumulative += count;
        *entry = (cumulative as f32 * scale).round();
    }
    lut
}

/// Window radius used by [`adaptive_threshold_mean`] for an image of this size.
pub fn adaptive_window_radius(width: u32, height: u32) -> u32 {
    (width.min(height) / 8).max(1)
}

/// Marks pixels darker than their local mean.
///
/// A pixel is foreground (255) when it is below `mean - offset`, where the
/// mean is taken over the `(2 * radius + 1)` square window clipped to the
/// image.
pub fn adaptive_threshold_mean(image: &GrayImage, radius: u32, offset: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    // Summed-area table with a zero row and column in front.
    let (w, h) = (width as usize, height as usize);
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(image.get_pixel(x as u32, y as u32).0[0]);
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let r = radius as usize;
    for y in 0..h {
        let (y0, y1) = (y.saturating_sub(r), (y + r + 1).min(h));
        for x in 0..w {
            let (x0, x1) = (x.saturating_sub(r), (x + r + 1).min(w));
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let count = ((y1 - y0) * (x1 - x0)) as f32;
            let mean = sum as f32 / count;
            let value = f32::from(image.get_pixel(x as u32, y as u32).0[0]);
            if value < mean - offset {
                out.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }
    out
}

/// Otsu's global threshold level.
pub fn otsu_level(image: &GrayImage) -> u8 {
    if image.width() == 0 || image.height() == 0 {
        return 0;
    }
    imageproc::contrast::otsu_level(image)
}

/// Marks pixels at or below the Otsu level as foreground (255).
pub fn otsu_dark_mask(image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    let mut out = GrayImage::new(image.width(), image.height());
    for (dst, src) in out.pixels_mut().zip(image.pixels()) {
        if src.0[0] <= level {
            dst.0[0] = 255;
        }
    }
    out
}

/// Closes then opens a binary mask with a 3x3 square element.
pub fn clean_mask(mask: &GrayImage) -> GrayImage {
    if mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    let closed = morphology::close(mask, Norm::LInf, 1);
    morphology::open(&closed, Norm::LInf, 1)
}
