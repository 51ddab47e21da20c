use crate::error::{StudioError, StudioResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionProviderPolicy {
    pub prefer_xnnpack: bool,
    pub allow_cpu_fallback: bool,
}

impl Default for ExecutionProviderPolicy {
    fn default() -> Self {
        Self {
            prefer_xnnpack: false,
            allow_cpu_fallback: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectionConfig {
    pub min_face_size: u32,
    pub min_score: f32,
    pub iou_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_face_size: 50,
            min_score: 0.5,
            iou_threshold: 0.4,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorRuntimeConfig {
    pub model_path: String,
    pub provider_policy: ExecutionProviderPolicy,
    pub detection: DetectionConfig,
}

impl DetectorRuntimeConfig {
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            provider_policy: ExecutionProviderPolicy::default(),
            detection: DetectionConfig::default(),
        }
    }

    pub fn validate(&self) -> StudioResult<()> {
        if self.model_path.trim().is_empty() {
            return Err(StudioError::InvalidRequest(
                "missing required face detection model path".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.min_score)
            || !(0.0..=1.0).contains(&self.detection.iou_threshold)
        {
            return Err(StudioError::InvalidRequest(format!(
                "detection thresholds must lie in [0, 1] (min_score={}, iou_threshold={})",
                self.detection.min_score, self.detection.iou_threshold
            )));
        }
        Ok(())
    }
}
