use image::RgbImage;
use tracing::debug;

use crate::{
    error::StudioResult,
    ml::{face::detect::FaceDetector, types::FaceBox},
};

const CENTER_WEIGHT: f64 = 0.6;
const SIZE_WEIGHT: f64 = 0.4;
const SIZE_SCORE_GAIN: f64 = 4.0;

pub fn locate_best_face(
    detector: &dyn FaceDetector,
    image: &RgbImage,
) -> StudioResult<Option<FaceBox>> {
    let faces = detector.detect_faces(image)?;
    let best = select_best_face(&faces, image.width(), image.height());
    debug!(faces = faces.len(), best = ?best, "located faces");
    Ok(best)
}

/// Picks the face with the highest `0.6 * center + 0.4 * size` score.
///
/// Ties keep the earliest face. Returns `None` only for an empty slice.
pub fn select_best_face(faces: &[FaceBox], width: u32, height: u32) -> Option<FaceBox> {
    let mut best: Option<(FaceBox, f64)> = None;
    for face in faces {
        let score = face_score(face, width, height);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((*face, score)),
        }
    }
    best.map(|(face, _)| face)
}

fn face_score(face: &FaceBox, width: u32, height: u32) -> f64 {
    let (face_cx, face_cy) = face.center();
    let center_x = i64::from(width / 2);
    let center_y = i64::from(height / 2);

    let dx = (face_cx - center_x) as f64;
    let dy = (face_cy - center_y) as f64;
    let center_distance = (dx * dx + dy * dy).sqrt();
    let max_distance = (f64::from(width).powi(2) + f64::from(height).powi(2)).sqrt();
    let center_score = if max_distance > 0.0 {
        1.0 - center_distance / max_distance
    } else {
        0.0
    };

    let image_area = u64::from(width) * u64::from(height);
    let area_ratio = if image_area > 0 {
        face.area() as f64 / image_area as f64
    } else {
        0.0
    };
    let size_score = (area_ratio * SIZE_SCORE_GAIN).min(1.0);

    center_score * CENTER_WEIGHT + size_score * SIZE_WEIGHT
}
