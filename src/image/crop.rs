use image::{RgbImage, imageops};
use tracing::debug;

use crate::{
    error::{StudioError, StudioResult},
    ml::types::FaceBox,
};

const NEARLY_SQUARE_MIN_RATIO: f64 = 0.8;
const NEARLY_SQUARE_MAX_RATIO: f64 = 1.25;
const LARGE_FACE_AREA_RATIO: f64 = 0.25;
const SMALL_FACE_AREA_RATIO: f64 = 0.08;
const LARGE_FACE_CROP_SCALE: f64 = 0.85;
const MEDIUM_FACE_CROP_SCALE: f64 = 0.92;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

pub fn is_nearly_square(width: u32, height: u32) -> bool {
    if height == 0 {
        return false;
    }
    let aspect_ratio = f64::from(width) / f64::from(height);
    (NEARLY_SQUARE_MIN_RATIO..=NEARLY_SQUARE_MAX_RATIO).contains(&aspect_ratio)
}

/// Computes the square crop for an image of `width`x`height`.
///
/// Without a face this is the centered square of side `min(width, height)`.
/// With a face, the face is centered horizontally and its center placed a
/// third of the way down the crop; the side shrinks for prominent faces on
/// images that are far from square. The window always lies inside the image.
pub fn compute_crop_region(width: u32, height: u32, face: Option<&FaceBox>) -> CropRegion {
    let base_crop_size = width.min(height);

    let Some(face) = face else {
        return CropRegion {
            x: (width - base_crop_size) / 2,
            y: (height - base_crop_size) / 2,
            size: base_crop_size,
        };
    };

    let crop_size = if is_nearly_square(width, height) {
        base_crop_size
    } else {
        let image_area = f64::from(width) * f64::from(height);
        let area_ratio = face.area() as f64 / image_area;
        if area_ratio > LARGE_FACE_AREA_RATIO {
            (f64::from(base_crop_size) * LARGE_FACE_CROP_SCALE) as u32
        } else if area_ratio < SMALL_FACE_AREA_RATIO {
            base_crop_size
        } else {
            (f64::from(base_crop_size) * MEDIUM_FACE_CROP_SCALE) as u32
        }
    };
    let crop_size = crop_size.max(1);

    let (face_center_x, face_center_y) = face.center();
    let size = i64::from(crop_size);
    let target_face_y = size / 3;

    let crop_x = clamp_origin(face_center_x - size / 2, i64::from(width) - size);
    let crop_y = clamp_origin(face_center_y - target_face_y, i64::from(height) - size);

    CropRegion {
        x: crop_x,
        y: crop_y,
        size: crop_size,
    }
}

fn clamp_origin(origin: i64, max_origin: i64) -> u32 {
    origin.min(max_origin).max(0) as u32
}

pub fn smart_crop(image: &RgbImage, face: Option<&FaceBox>) -> StudioResult<RgbImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(StudioError::InvalidImage(
            "cannot crop an empty image".to_string(),
        ));
    }

    let region = compute_crop_region(width, height, face);
    if region.x + region.size > width || region.y + region.size > height {
        return Err(StudioError::ProcessingFailed(format!(
            "crop {region:?} exceeds {width}x{height} image"
        )));
    }

    debug!(
        width,
        height,
        face = face.is_some(),
        crop_x = region.x,
        crop_y = region.y,
        crop_size = region.size,
        "computed smart crop"
    );
    Ok(imageops::crop_imm(image, region.x, region.y, region.size, region.size).to_image())
}
