//! Randomized sensor degradation.
//!
//! A clean render is passed through up to six stages in a fixed order:
//! contrast compression, reflections, smudges, dust, Gaussian noise and a
//! lighting gradient. Each stage is a pure function of the current image,
//! the clean image, the configuration and the caller's RNG, and every pixel
//! store is clamped to `[0, 255]`.

use super::config::DegradationConfig;
use crate::core::OcrResult;
use crate::core::config::ConfigValidatorExt;
use crate::processors::contrast::gaussian_blur;
use crate::utils::clamp_to_u8;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// One stage of the degradation pipeline. Variants are declared in the
/// order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationStep {
    Contrast,
    Reflections,
    Smudges,
    Dust,
    Noise,
    Lighting,
}

impl DegradationStep {
    /// Every stage in canonical order.
    pub const ALL: [DegradationStep; 6] = [
        DegradationStep::Contrast,
        DegradationStep::Reflections,
        DegradationStep::Smudges,
        DegradationStep::Dust,
        DegradationStep::Noise,
        DegradationStep::Lighting,
    ];

    /// Runs this stage.
    ///
    /// # Arguments
    ///
    /// * `image` - The image produced by the previous stage.
    /// * `clean` - The undegraded render; only the contrast stage reads it.
    /// * `config` - Sampling ranges for every stage.
    /// * `rng` - Source of all randomness.
    ///
    /// # Returns
    ///
    /// The degraded image and a record of what was drawn.
    pub fn apply<R: Rng + ?Sized>(
        self,
        image: &RgbImage,
        clean: &RgbImage,
        config: &DegradationConfig,
        rng: &mut R,
    ) -> (RgbImage, AppliedEffect) {
        match self {
            DegradationStep::Contrast => reduce_contrast(image, clean, config, rng),
            DegradationStep::Reflections => add_reflections(image, config, rng),
            DegradationStep::Smudges => add_smudges(image, config, rng),
            DegradationStep::Dust => add_dust(image, config, rng),
            DegradationStep::Noise => add_noise(image, config, rng),
            DegradationStep::Lighting => vary_lighting(image, config, rng),
        }
    }
}

/// Direction of the lighting gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightingDirection {
    /// Bright on the left edge, dim on the right.
    Left,
    /// Bright on the right edge, dim on the left.
    Right,
    /// Bright on the top edge, dim at the bottom.
    Top,
    /// Bright at the bottom, dim on the top edge.
    Bottom,
    /// Brightest at the center, dim at the corners.
    Center,
}

impl LightingDirection {
    pub const ALL: [LightingDirection; 5] = [
        LightingDirection::Left,
        LightingDirection::Right,
        LightingDirection::Top,
        LightingDirection::Bottom,
        LightingDirection::Center,
    ];
}

/// Record of what a stage drew. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum AppliedEffect {
    LowContrast { factor: f32, lift: f32 },
    Reflections { count: u32 },
    Smudges { count: u32 },
    Dust { particles: u32 },
    Noise { sigma: f32 },
    LightingVariation { direction: LightingDirection },
}

impl AppliedEffect {
    /// Short name recorded in sample metadata.
    pub const fn name(&self) -> &'static str {
        match self {
            AppliedEffect::LowContrast { .. } => "low_contrast",
            AppliedEffect::Reflections { .. } => "reflections",
            AppliedEffect::Smudges { .. } => "smudges",
            AppliedEffect::Dust { .. } => "dust",
            AppliedEffect::Noise { .. } => "noise",
            AppliedEffect::LightingVariation { .. } => "lighting_variation",
        }
    }
}

impl fmt::Display for AppliedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A degraded image together with the effects applied to it.
#[derive(Debug, Clone)]
pub struct Degraded {
    pub image: RgbImage,
    pub effects: Vec<AppliedEffect>,
}

/// Applies the configured degradation stages in order.
#[derive(Debug, Clone, Default)]
pub struct DegradationPipeline {
    config: DegradationConfig,
}

impl DegradationPipeline {
    /// Creates a pipeline from a validated configuration.
    pub fn new(config: DegradationConfig) -> OcrResult<Self> {
        Ok(Self {
            config: config.validate_and_wrap_ocr_error()?,
        })
    }

    /// The stages this pipeline runs.
    pub fn steps(&self) -> &[DegradationStep] {
        &self.config.steps
    }

    pub fn config(&self) -> &DegradationConfig {
        &self.config
    }

    /// Degrades `clean`, drawing all randomness from `rng`.
    ///
    /// Empty images are returned unchanged with no effects.
    pub fn degrade<R: Rng + ?Sized>(&self, clean: &RgbImage, rng: &mut R) -> Degraded {
        let mut image = clean.clone();
        let mut effects = Vec::with_capacity(self.config.steps.len());
        if clean.width() == 0 || clean.height() == 0 {
            return Degraded { image, effects };
        }

        for &step in &self.config.steps {
            let (next, effect) = step.apply(&image, clean, &self.config, rng);
            debug!("Applied degradation step {:?}: {:?}", step, effect);
            image = next;
            effects.push(effect);
        }
        Degraded { image, effects }
    }
}

/// Compresses contrast around mid-gray, then lifts pixels that were ink in
/// the clean image.
pub fn reduce_contrast<R: Rng + ?Sized>(
    image: &RgbImage,
    clean: &RgbImage,
    config: &DegradationConfig,
    rng: &mut R,
) -> (RgbImage, AppliedEffect) {
    let factor = config.contrast_factor.sample(rng);
    let lift = config.dark_lift.sample(rng);
    let level = config.clean_dark_level;

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let was_ink = clean
            .get_pixel_checked(x, y)
            .is_some_and(|p| p.0.iter().all(|&c| c < level));
        for channel in pixel.0.iter_mut() {
            let mut v = 0.5 + factor * (f32::from(*channel) / 255.0 - 0.5);
            if was_ink {
                v += lift;
            }
            *channel = clamp_to_u8(v * 255.0);
        }
    }
    (out, AppliedEffect::LowContrast { factor, lift })
}

/// Adds radial highlights whose brightness falls linearly to zero at the radius.
pub fn add_reflections<R: Rng + ?Sized>(
    image: &RgbImage,
    config: &DegradationConfig,
    rng: &mut R,
) -> (RgbImage, AppliedEffect) {
    let (w, h) = image.dimensions();
    let count = config.reflection_count.sample(rng);
    let mut out = image.clone();

    for _ in 0..count {
        let cx = rng.gen_range(0..=w) as f32;
        let cy = rng.gen_range(0..=h) as f32;
        let radius = config.reflection_radius.sample(rng).max(1) as f32;
        let intensity = config.reflection_intensity.sample(rng);

        let (x0, x1) = span(cx, radius, w);
        let (y0, y1) = span(cy, radius, h);
        for y in y0..y1 {
            for x in x0..x1 {
                let distance = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                if distance > radius {
                    continue;
                }
                let boost = intensity * (1.0 - distance / radius) * 255.0;
                let pixel = out.get_pixel_mut(x, y);
                for channel in pixel.0.iter_mut() {
                    *channel = clamp_to_u8(f32::from(*channel) + boost);
                }
            }
        }
    }
    (out, AppliedEffect::Reflections { count })
}

/// Darkens the image under soft, rotated elliptical smudges.
pub fn add_smudges<R: Rng + ?Sized>(
    image: &RgbImage,
    config: &DegradationConfig,
    rng: &mut R,
) -> (RgbImage, AppliedEffect) {
    let (w, h) = image.dimensions();
    let count = config.smudge_count.sample(rng);
    let mut out = image.clone();

    for _ in 0..count {
        let semi_major = config.smudge_semi_major.sample(rng).max(1);
        let semi_minor = config.smudge_semi_minor.sample(rng).max(1);
        // Anchored so that most of the smudge lands on the canvas.
        let cx = rng.gen_range(0..=w.saturating_sub(50)) + semi_major;
        let cy = rng.gen_range(0..=h.saturating_sub(50)) + semi_minor;
        let angle = rng.gen_range(0.0f32..180.0).to_radians();
        let intensity = config.smudge_intensity.sample(rng);

        let Some((x0, y0, mask)) = smudge_mask(
            (w, h),
            (cx as f32, cy as f32),
            (semi_major as f32, semi_minor as f32),
            angle,
            config.smudge_blur_sigma,
        ) else {
            continue;
        };

        for (x, y, weight) in mask.enumerate_pixels() {
            if weight.0[0] == 0 {
                continue;
            }
            let darken = f32::from(weight.0[0]) / 255.0 * intensity * 255.0;
            let pixel = out.get_pixel_mut(x0 + x, y0 + y);
            for channel in pixel.0.iter_mut() {
                *channel = clamp_to_u8(f32::from(*channel) - darken);
            }
        }
    }
    (out, AppliedEffect::Smudges { count })
}

/// Scatters small gray particles over the image.
pub fn add_dust<R: Rng + ?Sized>(
    image: &RgbImage,
    config: &DegradationConfig,
    rng: &mut R,
) -> (RgbImage, AppliedEffect) {
    let (w, h) = image.dimensions();
    let particles = config.dust_count.sample(rng);
    let mut out = image.clone();
    if w == 0 || h == 0 {
        return (out, AppliedEffect::Dust { particles: 0 });
    }

    for _ in 0..particles {
        let x = rng.gen_range(0..w);
        let y = rng.gen_range(0..h);
        let radius = config.dust_radius.sample(rng).max(1);
        let gray = config.dust_gray.sample(rng);
        let color = Rgb([gray; 3]);
        if radius == 1 {
            out.put_pixel(x, y, color);
        } else {
            draw_filled_circle_mut(&mut out, (x as i32, y as i32), radius as i32, color);
        }
    }
    (out, AppliedEffect::Dust { particles })
}

/// Adds zero-mean Gaussian noise to every channel of every pixel.
pub fn add_noise<R: Rng + ?Sized>(
    image: &RgbImage,
    config: &DegradationConfig,
    rng: &mut R,
) -> (RgbImage, AppliedEffect) {
    let sigma = config.noise_sigma.sample(rng);
    let mut out = image.clone();
    let Ok(normal) = Normal::new(0.0f32, sigma) else {
        return (out, AppliedEffect::Noise { sigma: 0.0 });
    };

    for channel in out.iter_mut() {
        *channel = clamp_to_u8(f32::from(*channel) + normal.sample(rng));
    }
    (out, AppliedEffect::Noise { sigma })
}

/// Multiplies the image by a lighting gradient in a randomly chosen direction.
pub fn vary_lighting<R: Rng + ?Sized>(
    image: &RgbImage,
    config: &DegradationConfig,
    rng: &mut R,
) -> (RgbImage, AppliedEffect) {
    let direction = LightingDirection::ALL[rng.gen_range(0..LightingDirection::ALL.len())];
    (
        apply_lighting(image, direction, config),
        AppliedEffect::LightingVariation { direction },
    )
}

/// Multiplies the image by the lighting gradient for `direction`.
pub fn apply_lighting(
    image: &RgbImage,
    direction: LightingDirection,
    config: &DegradationConfig,
) -> RgbImage {
    let (w, h) = image.dimensions();
    let bright = config.lighting_bright;
    let dim = config.lighting_dim;
    let peak = config.lighting_center_peak;

    let ramp = |pos: u32, len: u32, from: f32, to: f32| {
        if len <= 1 {
            from
        } else {
            from + (to - from) * pos as f32 / (len - 1) as f32
        }
    };
    let (cx, cy) = ((w / 2) as f32, (h / 2) as f32);
    let max_distance = (cx * cx + cy * cy).sqrt();

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let factor = match direction {
            LightingDirection::Left => ramp(x, w, bright, dim),
            LightingDirection::Right => ramp(x, w, dim, bright),
            LightingDirection::Top => ramp(y, h, bright, dim),
            LightingDirection::Bottom => ramp(y, h, dim, bright),
            LightingDirection::Center => {
                if max_distance > 0.0 {
                    let distance = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                    peak - (peak - dim) * distance / max_distance
                } else {
                    peak
                }
            }
        };
        for channel in pixel.0.iter_mut() {
            *channel = clamp_to_u8(f32::from(*channel) * factor);
        }
    }
    out
}

/// Pixel range `[start, end)` covered by `center ± radius`, clipped to `len`.
fn span(center: f32, radius: f32, len: u32) -> (u32, u32) {
    let start = (center - radius).floor().max(0.0) as u32;
    let end = ((center + radius).ceil() + 1.0).clamp(0.0, len as f32) as u32;
    (start.min(len), end)
}

/// Blurred smudge mask restricted to the ellipse's neighbourhood.
///
/// Returns the patch origin and the patch. The patch extends past the
/// ellipse by more than the blur kernel reaches, so it equals the matching
/// window of a full-canvas mask blurred with the same sigma. A dimension too
/// short for the blur spans the whole canvas, keeping the small-image guard
/// of `gaussian_blur` identical. `None` when the patch misses the canvas.
fn smudge_mask(
    canvas: (u32, u32),
    center: (f32, f32),
    axes: (f32, f32),
    angle: f32,
    sigma: f32,
) -> Option<(u32, u32, GrayImage)> {
    let (w, h) = canvas;
    let kernel = if sigma > 0.0 {
        2 * (3.0 * sigma).ceil() as u32 + 1
    } else {
        0
    };
    let reach = axes.0.max(axes.1) + kernel as f32;
    let widen = |(start, end): (u32, u32), len: u32| {
        if end.saturating_sub(start) <= kernel { (0, len) } else { (start, end) }
    };
    let (x0, x1) = widen(span(center.0, reach, w), w);
    let (y0, y1) = widen(span(center.1, reach, h), h);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let mut mask = GrayImage::new(x1 - x0, y1 - y0);
    fill_rotated_ellipse(
        &mut mask,
        (center.0 - x0 as f32, center.1 - y0 as f32),
        axes,
        angle,
    );
    Some((x0, y0, gaussian_blur(&mask, sigma)))
}

fn fill_rotated_ellipse(mask: &mut GrayImage, center: (f32, f32), axes: (f32, f32), angle: f32) {
    let (w, h) = mask.dimensions();
    let (cx, cy) = center;
    let (a, b) = axes;
    let (sin, cos) = angle.sin_cos();
    let reach = a.max(b);
    let (x0, x1) = span(cx, reach, w);
    let (y0, y1) = span(cy, reach, h);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            if (u / a).powi(2) + (v / b).powi(2) <= 1.0 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
}
