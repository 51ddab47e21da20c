use image::RgbImage;
use ort::Session;
use tracing::debug;

use crate::{
    error::{StudioError, StudioResult},
    ml::{
        onnx, preprocess,
        runtime::{DetectionConfig, DetectorRuntimeConfig},
        types::{FaceBox, FaceDetection},
    },
};

const INPUT_WIDTH: f32 = preprocess::YOLO_INPUT_WIDTH as f32;
const INPUT_HEIGHT: f32 = preprocess::YOLO_INPUT_HEIGHT as f32;
const ROW_LEN: usize = 16;

/// Frontal face detector. Implementations are immutable once built so one
/// instance can serve concurrent requests.
pub trait FaceDetector: Send + Sync {
    /// Returns every confirmed face in source pixel coordinates, in no
    /// particular order. An empty list is a normal outcome.
    fn detect_faces(&self, image: &RgbImage) -> StudioResult<Vec<FaceBox>>;
}

#[derive(Debug)]
pub struct OnnxFaceDetector {
    session: Session,
    detection: DetectionConfig,
}

impl OnnxFaceDetector {
    pub fn new(config: &DetectorRuntimeConfig) -> StudioResult<Self> {
        config.validate()?;
        let session = onnx::build_session(&config.model_path, &config.provider_policy)?;
        Ok(Self {
            session,
            detection: config.detection.clone(),
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect_faces(&self, image: &RgbImage) -> StudioResult<Vec<FaceBox>> {
        let detections = run_face_detection(&self.session, image, &self.detection)?;
        let faces = filter_small_faces(
            detections
                .iter()
                .map(|d| d.to_face_box(image.width(), image.height())),
            self.detection.min_face_size,
        );
        debug!(
            raw = detections.len(),
            kept = faces.len(),
            "face detection finished"
        );
        Ok(faces)
    }
}

fn run_face_detection(
    session: &Session,
    image: &RgbImage,
    config: &DetectionConfig,
) -> StudioResult<Vec<FaceDetection>> {
    let (input, scaled_width, scaled_height) = preprocess::preprocess_yolo(image)?;
    let (_, output_data) = onnx::run_f32(
        session,
        input,
        vec![1, 3, INPUT_HEIGHT as i64, INPUT_WIDTH as i64],
    )?;

    decode_yolo_rows(&output_data, scaled_width, scaled_height, config)
}

fn decode_yolo_rows(
    output_data: &[f32],
    scaled_width: usize,
    scaled_height: usize,
    config: &DetectionConfig,
) -> StudioResult<Vec<FaceDetection>> {
    if output_data.len() < ROW_LEN {
        return Err(StudioError::ProcessingFailed(
            "unexpected face detector output size".to_string(),
        ));
    }

    let mut detections = Vec::new();
    for row in output_data.chunks_exact(ROW_LEN) {
        let score = row[4];
        if score < config.min_score {
            continue;
        }

        let mut box_xyxy = [
            (row[0] - row[2] / 2.0) / INPUT_WIDTH,
            (row[1] - row[3] / 2.0) / INPUT_HEIGHT,
            (row[0] + row[2] / 2.0) / INPUT_WIDTH,
            (row[1] + row[3] / 2.0) / INPUT_HEIGHT,
        ];
        correct_for_maintained_aspect_ratio(&mut box_xyxy, scaled_width, scaled_height);

        detections.push(FaceDetection { score, box_xyxy });
    }

    Ok(naive_non_max_suppression(detections, config.iou_threshold))
}

fn correct_for_maintained_aspect_ratio(
    box_xyxy: &mut [f32; 4],
    scaled_width: usize,
    scaled_height: usize,
) {
    if scaled_width == INPUT_WIDTH as usize && scaled_height == INPUT_HEIGHT as usize {
        return;
    }

    let scale_x = INPUT_WIDTH / scaled_width as f32;
    let scale_y = INPUT_HEIGHT / scaled_height as f32;

    box_xyxy[0] = (box_xyxy[0] * scale_x).clamp(0.0, 1.0);
    box_xyxy[1] = (box_xyxy[1] * scale_y).clamp(0.0, 1.0);
    box_xyxy[2] = (box_xyxy[2] * scale_x).clamp(0.0, 1.0);
    box_xyxy[3] = (box_xyxy[3] * scale_y).clamp(0.0, 1.0);
}

fn filter_small_faces(faces: impl Iterator<Item = FaceBox>, min_face_size: u32) -> Vec<FaceBox> {
    faces
        .filter(|face| face.width >= min_face_size && face.height >= min_face_size)
        .collect()
}

fn naive_non_max_suppression(
    mut detections: Vec<FaceDetection>,
    iou_threshold: f32,
) -> Vec<FaceDetection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut i = 0usize;
    while i + 1 < detections.len() {
        let mut j = i + 1;
        while j < detections.len() {
            let iou = calculate_iou(&detections[i], &detections[j]);
            if iou >= iou_threshold {
                detections.remove(j);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
    detections
}

fn calculate_iou(a: &FaceDetection, b: &FaceDetection) -> f32 {
    let area_a =
        (a.box_xyxy[2] - a.box_xyxy[0]).max(0.0) * (a.box_xyxy[3] - a.box_xyxy[1]).max(0.0);
    let area_b =
        (b.box_xyxy[2] - b.box_xyxy[0]).max(0.0) * (b.box_xyxy[3] - b.box_xyxy[1]).max(0.0);

    let intersection_width = a.box_xyxy[2].min(b.box_xyxy[2]) - a.box_xyxy[0].max(b.box_xyxy[0]);
    let intersection_height = a.box_xyxy[3].min(b.box_xyxy[3]) - a.box_xyxy[1].max(b.box_xyxy[1]);
    if intersection_width < 0.0 || intersection_height < 0.0 {
        return 0.0;
    }

    let intersection_area = intersection_width * intersection_height;
    let union_area = area_a + area_b - intersection_area;
    if union_area <= 0.0 {
        return 0.0;
    }
    intersection_area / union_area
}
