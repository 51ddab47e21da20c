use thiserror::Error;

pub type StudioResult<T> = Result<T, StudioError>;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("invalid filter configuration: {0}")]
    InvalidFilterConfig(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

impl From<ort::Error> for StudioError {
    fn from(value: ort::Error) -> Self {
        StudioError::ProcessingFailed(format!("onnx runtime error: {value}"))
    }
}

impl From<image::ImageError> for StudioError {
    fn from(value: image::ImageError) -> Self {
        StudioError::ProcessingFailed(value.to_string())
    }
}
