use std::sync::Arc;

use chrono::{DateTime, Local};
use image::RgbImage;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info};

use crate::{
    error::StudioResult,
    image::{
        crop::smart_crop,
        decode::decode_image_from_bytes,
        encode::encode_png,
        filters::{FilterParams, apply_filter_stack},
        frame::{FrameStyle, compose_polaroid},
    },
    ml::{
        face::{
            detect::{FaceDetector, OnnxFaceDetector},
            locate::locate_best_face,
        },
        runtime::DetectorRuntimeConfig,
        types::FaceBox,
    },
};

#[derive(Clone, Debug)]
pub struct PolaroidResult {
    pub image_bytes: Vec<u8>,
    pub suggested_filename: String,
    pub style: FrameStyle,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone)]
pub struct PolaroidPipeline {
    detector: Option<Arc<dyn FaceDetector>>,
}

impl PolaroidPipeline {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    pub fn without_face_detection() -> Self {
        Self { detector: None }
    }

    pub fn from_config(config: &DetectorRuntimeConfig) -> StudioResult<Self> {
        Ok(Self::new(Arc::new(OnnxFaceDetector::new(config)?)))
    }

    pub fn generate(
        &self,
        image_bytes: &[u8],
        style: FrameStyle,
        filters: &FilterParams,
    ) -> StudioResult<PolaroidResult> {
        self.generate_with_rng(image_bytes, style, filters, &mut rand::thread_rng())
    }

    pub fn generate_seeded(
        &self,
        image_bytes: &[u8],
        style: FrameStyle,
        filters: &FilterParams,
        seed: u64,
    ) -> StudioResult<PolaroidResult> {
        self.generate_with_rng(image_bytes, style, filters, &mut StdRng::seed_from_u64(seed))
    }

    fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        image_bytes: &[u8],
        style: FrameStyle,
        filters: &FilterParams,
        rng: &mut R,
    ) -> StudioResult<PolaroidResult> {
        let decoded = decode_image_from_bytes(image_bytes)?;
        let polaroid = self.render(&decoded, style, filters, rng)?;
        let image_bytes = encode_png(&polaroid)?;
        let suggested_filename = suggested_filename(style, Local::now());

        info!(
            style = style.name(),
            width = polaroid.width(),
            height = polaroid.height(),
            bytes = image_bytes.len(),
            filename = %suggested_filename,
            "generated polaroid"
        );
        Ok(PolaroidResult {
            image_bytes,
            suggested_filename,
            style,
            width: polaroid.width(),
            height: polaroid.height(),
        })
    }

    pub fn render<R: Rng + ?Sized>(
        &self,
        decoded: &RgbImage,
        style: FrameStyle,
        filters: &FilterParams,
        rng: &mut R,
    ) -> StudioResult<RgbImage> {
        let face = self.best_face(decoded)?;
        let cropped = smart_crop(decoded, face.as_ref())?;
        let filtered = apply_filter_stack(&cropped, filters, rng)?;
        compose_polaroid(&filtered, style, rng)
    }

    fn best_face(&self, image: &RgbImage) -> StudioResult<Option<FaceBox>> {
        match &self.detector {
            Some(detector) => locate_best_face(detector.as_ref(), image),
            None => {
                debug!("face detection disabled, center cropping");
                Ok(None)
            }
        }
    }
}

pub fn suggested_filename(style: FrameStyle, timestamp: DateTime<Local>) -> String {
    format!(
        "polaroid_{}_{}.png",
        style.name(),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}
