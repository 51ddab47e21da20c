//! Turns an uploaded photograph into a framed "polaroid" card.

pub mod api;
pub mod error;
pub mod image;
pub mod ml;
pub mod pipeline;

pub use error::{StudioError, StudioResult};
pub use crate::image::{filters::FilterParams, frame::FrameStyle};
pub use ml::{
    face::detect::{FaceDetector, OnnxFaceDetector},
    runtime::{DetectionConfig, DetectorRuntimeConfig, ExecutionProviderPolicy},
    types::FaceBox,
};
pub use pipeline::{PolaroidPipeline, PolaroidResult};
