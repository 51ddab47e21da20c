use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use tracing::{error, warn};

use crate::{
    error::{StudioError, StudioResult},
    image::{filters::FilterParams, frame::FrameStyle},
    pipeline::{PolaroidPipeline, PolaroidResult},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameStyleInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub badge: String,
    pub premium: bool,
}

pub fn list_frame_styles() -> Vec<FrameStyleInfo> {
    FrameStyle::ALL
        .into_iter()
        .map(|style| {
            let descriptor = style.descriptor();
            FrameStyleInfo {
                id: style.name().to_string(),
                name: descriptor.display_name.to_string(),
                description: descriptor.description.to_string(),
                badge: descriptor.badge.to_string(),
                premium: descriptor.premium,
            }
        })
        .collect()
}

pub fn parse_filters_or_default(filters_json: Option<&str>) -> FilterParams {
    let Some(raw) = filters_json else {
        return FilterParams::default();
    };
    match FilterParams::from_json(raw) {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "ignoring malformed filters");
            FilterParams::default()
        }
    }
}

/// Entry point for the serving layer: raw upload bytes plus the optional
/// `frame_style` and `filters` form values.
///
/// Unknown styles fall back to curvy and malformed filters to neutral values.
/// Only undecodable uploads ([`StudioError::InvalidImage`]) and internal
/// failures ([`StudioError::ProcessingFailed`]) are reported; a panic inside
/// the pipeline is converted into the latter.
pub fn generate_polaroid(
    pipeline: &PolaroidPipeline,
    image_bytes: &[u8],
    frame_style: Option<&str>,
    filters_json: Option<&str>,
) -> StudioResult<PolaroidResult> {
    let style = FrameStyle::resolve(frame_style);
    let filters = parse_filters_or_default(filters_json);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        pipeline.generate(image_bytes, style, &filters)
    }));
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            error!(detail = %detail, "polaroid pipeline panicked");
            Err(StudioError::ProcessingFailed(detail))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::RgbImage;

    use super::{generate_polaroid, list_frame_styles, panic_message, parse_filters_or_default};
    use crate::{
        error::{StudioError, StudioResult},
        image::{filters::FilterParams, frame::FrameStyle},
        ml::{face::detect::FaceDetector, types::FaceBox},
        pipeline::PolaroidPipeline,
    };

    struct PanickingDetector;

    impl FaceDetector for PanickingDetector {
        fn detect_faces(&self, _image: &RgbImage) -> StudioResult<Vec<FaceBox>> {
            panic!("detector exploded");
        }
    }

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(30, 40, image::Rgb([120, 90, 60]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("png encoding should succeed");
        bytes
    }

    #[test]
    fn catalogue_lists_both_styles() {
        let styles = list_frame_styles();

        assert_eq!(styles.len(), 2);
        assert_eq!(styles[0].id, "curvy");
        assert_eq!(styles[0].badge, "Apple Style");
        assert!(styles[0].premium);
        assert_eq!(styles[1].id, "classic");
        assert_eq!(styles[1].name, "Classic Sharp");
        assert!(!styles[1].premium);
    }

    #[test]
    fn malformed_filters_become_neutral() {
        assert_eq!(parse_filters_or_default(Some("{oops")), FilterParams::default());
        assert_eq!(parse_filters_or_default(None), FilterParams::default());
        assert_eq!(parse_filters_or_default(Some(r#"{"contrast": 80}"#)).contrast, 80.0);
    }

    #[test]
    fn unknown_style_generates_curvy_polaroid() {
        let pipeline = PolaroidPipeline::without_face_detection();

        let result = generate_polaroid(&pipeline, &tiny_png(), Some("banana"), Some("{bad"))
            .expect("generation should succeed");

        assert_eq!(result.style, FrameStyle::Curvy);
        assert!(result.suggested_filename.starts_with("polaroid_curvy_"));
    }

    #[test]
    fn empty_upload_is_invalid_image() {
        let pipeline = PolaroidPipeline::without_face_detection();

        let result = generate_polaroid(&pipeline, &[], None, None);

        assert!(matches!(result, Err(StudioError::InvalidImage(_))));
    }

    #[test]
    fn pipeline_panic_is_reported_as_processing_failure() {
        let pipeline = PolaroidPipeline::new(Arc::new(PanickingDetector));

        let result = generate_polaroid(&pipeline, &tiny_png(), Some("classic"), None);

        match result {
            Err(StudioError::ProcessingFailed(detail)) => assert!(detail.contains("exploded")),
            other => panic!("expected processing failure, got {other:?}"),
        }
    }

    #[test]
    fn panic_message_handles_owned_strings() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));

        assert_eq!(panic_message(payload.as_ref()), "owned");
    }
}
