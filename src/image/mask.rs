use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage, imageops};
use imageproc::{
    drawing::{Canvas, draw_filled_circle_mut, draw_filled_rect_mut},
    rect::Rect,
};

use crate::error::{StudioError, StudioResult};

pub fn fill_rounded_rect<C>(
    canvas: &mut C,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    radius: u32,
    color: C::Pixel,
) where
    C: Canvas,
{
    if width == 0 || height == 0 {
        return;
    }
    let radius = radius.min(width / 2).min(height / 2);
    if radius == 0 {
        draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(width, height), color);
        return;
    }

    if height > 2 * radius {
        draw_filled_rect_mut(
            canvas,
            Rect::at(x, y + radius as i32).of_size(width, height - 2 * radius),
            color,
        );
    }
    if width > 2 * radius {
        draw_filled_rect_mut(
            canvas,
            Rect::at(x + radius as i32, y).of_size(width - 2 * radius, height),
            color,
        );
    }

    let r = radius as i32;
    let left = x + r;
    let right = x + width as i32 - 1 - r;
    let top = y + r;
    let bottom = y + height as i32 - 1 - r;
    for center in [(left, top), (right, top), (left, bottom), (right, bottom)] {
        draw_filled_circle_mut(canvas, center, r, color);
    }
}

/// Opaque rounded rectangle on a transparent `width`x`height` mask. The shape
/// spans the inclusive corners `(0, 0)` and `(width, height)`, so its right and
/// bottom arcs are clipped by one pixel.
pub fn rounded_rect_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    fill_rounded_rect(&mut mask, 0, 0, width + 1, height + 1, radius, Luma([255]));
    mask
}

pub fn with_alpha_mask(image: &RgbaImage, mask: &GrayImage) -> StudioResult<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(StudioError::ProcessingFailed(format!(
            "mask is {:?} but image is {:?}",
            mask.dimensions(),
            image.dimensions()
        )));
    }

    let mut masked = image.clone();
    for (pixel, alpha) in masked.pixels_mut().zip(mask.pixels()) {
        pixel[3] = alpha[0];
    }
    Ok(masked)
}

pub fn flatten_onto(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let [r, g, b] = background.0;
    let mut base = RgbaImage::from_pixel(image.width(), image.height(), Rgba([r, g, b, 255]));
    imageops::overlay(&mut base, image, 0, 0);
    DynamicImage::ImageRgba8(base).to_rgb8()
}
