use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::png::PngEncoder};

use crate::error::{StudioError, StudioResult};

pub fn encode_png(image: &RgbImage) -> StudioResult<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(StudioError::ProcessingFailed(
            "cannot encode image with zero width or height".to_string(),
        ));
    }

    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| StudioError::ProcessingFailed(format!("failed to encode PNG: {e}")))?;
    Ok(encoded)
}
