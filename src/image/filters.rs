// Step order is part of the output contract: resize, brightness, contrast,
// saturation, tint, desaturate, contrast boost, warm blend, grain.

use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image as FirImage, ImageRef as FirImageRef},
};
use image::{Rgb, RgbImage};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use tracing::debug;

use crate::error::{StudioError, StudioResult};

pub const CANONICAL_PHOTO_SIZE: u32 = 500;

const NEUTRAL_PERCENT: f32 = 100.0;
const NEUTRAL_TINT: f32 = 50.0;
const MAGENTA_BOOST: f32 = 0.15;
const MAGENTA_GREEN_CUT: f32 = 0.10;
const GREEN_BOOST: f32 = 0.20;
const GREEN_MAGENTA_CUT: f32 = 0.10;

const VINTAGE_SATURATION: f32 = 0.88;
const VINTAGE_CONTRAST: f32 = 1.08;
const WARM_OVERLAY: [f32; 3] = [255.0, 248.0, 220.0];
const WARM_OVERLAY_ALPHA: f32 = 0.06;
const GRAIN_STD_DEV: f32 = 6.0;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub tint: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL_PERCENT,
            contrast: NEUTRAL_PERCENT,
            saturation: NEUTRAL_PERCENT,
            tint: NEUTRAL_TINT,
        }
    }
}

impl FilterParams {
    pub fn from_json(filters_json: &str) -> StudioResult<Self> {
        if filters_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str::<FilterParams>(filters_json)
            .map(|params| params.sanitized())
            .map_err(|e| StudioError::InvalidFilterConfig(e.to_string()))
    }

    pub fn sanitized(self) -> Self {
        Self {
            brightness: self.brightness.max(0.0),
            contrast: self.contrast.max(0.0),
            saturation: self.saturation.max(0.0),
            tint: self.tint.clamp(0.0, 100.0),
        }
    }
}

pub fn apply_filter_stack<R: Rng + ?Sized>(
    image: &RgbImage,
    params: &FilterParams,
    rng: &mut R,
) -> StudioResult<RgbImage> {
    if image.width() != image.height() {
        return Err(StudioError::ProcessingFailed(format!(
            "filter stack expects a square image, got {}x{}",
            image.width(),
            image.height()
        )));
    }

    let resized = resize_to_canonical(image)?;
    let adjusted = apply_user_adjustments(&resized, params);
    let vintage = apply_vintage_tone(&adjusted);
    debug!(?params, "applied filter stack");
    add_film_grain(&vintage, rng)
}

fn resize_to_canonical(image: &RgbImage) -> StudioResult<RgbImage> {
    if image.width() == 0 {
        return Err(StudioError::InvalidImage(
            "cannot resize an empty image".to_string(),
        ));
    }
    if image.dimensions() == (CANONICAL_PHOTO_SIZE, CANONICAL_PHOTO_SIZE) {
        return Ok(image.clone());
    }

    let source = FirImageRef::new(
        image.width(),
        image.height(),
        image.as_raw().as_slice(),
        PixelType::U8x3,
    )
    .map_err(|e| StudioError::ProcessingFailed(format!("invalid RGB buffer: {e}")))?;
    let mut resized = FirImage::new(CANONICAL_PHOTO_SIZE, CANONICAL_PHOTO_SIZE, PixelType::U8x3);
    let options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    Resizer::new()
        .resize(&source, &mut resized, Some(&options))
        .map_err(|e| StudioError::ProcessingFailed(format!("failed to resize photo: {e}")))?;

    RgbImage::from_raw(
        CANONICAL_PHOTO_SIZE,
        CANONICAL_PHOTO_SIZE,
        resized.buffer().to_vec(),
    )
    .ok_or_else(|| StudioError::ProcessingFailed("resized buffer has wrong length".to_string()))
}

pub fn apply_user_adjustments(image: &RgbImage, params: &FilterParams) -> RgbImage {
    let mut result = image.clone();
    if params.brightness != NEUTRAL_PERCENT {
        result = adjust_brightness(&result, params.brightness / 100.0);
    }
    if params.contrast != NEUTRAL_PERCENT {
        result = adjust_contrast(&result, params.contrast / 100.0);
    }
    if params.saturation != NEUTRAL_PERCENT {
        result = adjust_saturation(&result, params.saturation / 100.0);
    }
    if params.tint != NEUTRAL_TINT {
        result = apply_tint(&result, params.tint);
    }
    result
}

pub fn apply_vintage_tone(image: &RgbImage) -> RgbImage {
    let desaturated = adjust_saturation(image, VINTAGE_SATURATION);
    let contrasted = adjust_contrast(&desaturated, VINTAGE_CONTRAST);
    blend_flat_color(&contrasted, WARM_OVERLAY, WARM_OVERLAY_ALPHA)
}

pub fn adjust_brightness(image: &RgbImage, factor: f32) -> RgbImage {
    map_channels(image, |_, value| value * factor)
}

pub fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luma(image);
    map_channels(image, |_, value| mean + (value - mean) * factor)
}

pub fn adjust_saturation(image: &RgbImage, factor: f32) -> RgbImage {
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        let gray = luma(pixel) as f32;
        for channel in pixel.0.iter_mut() {
            *channel = round_channel(gray + (*channel as f32 - gray) * factor);
        }
    }
    result
}

pub fn apply_tint(image: &RgbImage, tint: f32) -> RgbImage {
    let factor = (tint - NEUTRAL_TINT) / NEUTRAL_TINT;
    if factor == 0.0 {
        return image.clone();
    }

    let multipliers = if factor > 0.0 {
        [
            1.0 + factor * MAGENTA_BOOST,
            1.0 - factor * MAGENTA_GREEN_CUT,
            1.0 + factor * MAGENTA_BOOST,
        ]
    } else {
        let strength = factor.abs();
        [
            1.0 - strength * GREEN_MAGENTA_CUT,
            1.0 + strength * GREEN_BOOST,
            1.0 - strength * GREEN_MAGENTA_CUT,
        ]
    };

    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        for (channel, multiplier) in pixel.0.iter_mut().zip(multipliers) {
            *channel = (*channel as f32 * multiplier).clamp(0.0, 255.0) as u8;
        }
    }
    result
}

pub fn add_film_grain<R: Rng + ?Sized>(image: &RgbImage, rng: &mut R) -> StudioResult<RgbImage> {
    let noise = Normal::new(0.0f32, GRAIN_STD_DEV)
        .map_err(|e| StudioError::ProcessingFailed(format!("invalid grain distribution: {e}")))?;

    let mut result = image.clone();
    for channel in result.iter_mut() {
        let offset = noise.sample(rng) as i16;
        *channel = (i16::from(*channel) + offset).clamp(0, 255) as u8;
    }
    Ok(result)
}

fn blend_flat_color(image: &RgbImage, color: [f32; 3], alpha: f32) -> RgbImage {
    map_channels(image, |index, value| {
        value * (1.0 - alpha) + color[index] * alpha
    })
}

fn map_channels(image: &RgbImage, f: impl Fn(usize, f32) -> f32) -> RgbImage {
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        for (index, channel) in pixel.0.iter_mut().enumerate() {
            *channel = round_channel(f(index, *channel as f32));
        }
    }
    result
}

fn round_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

// ITU-R 601-2 luma in 16-bit fixed point, rounded to nearest.
fn luma(pixel: &Rgb<u8>) -> u32 {
    let [r, g, b] = pixel.0;
    (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16
}

fn mean_luma(image: &RgbImage) -> f32 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let total: u64 = image.pixels().map(|p| u64::from(luma(p))).sum();
    (total as f64 / count as f64).round() as f32
}
