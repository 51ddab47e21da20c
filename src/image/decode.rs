use std::io::Cursor;

use exif::{In, Reader as ExifReader, Tag};
use image::{DynamicImage, ImageReader, Limits, RgbImage};
use tracing::debug;

use crate::error::{StudioError, StudioResult};

pub const MAX_DECODE_ALLOC_BYTES: u64 = 512 * 1024 * 1024;

pub fn decode_image_from_bytes(image_bytes: &[u8]) -> StudioResult<RgbImage> {
    if image_bytes.is_empty() {
        return Err(StudioError::InvalidImage("image payload is empty".to_string()));
    }

    let mut reader = ImageReader::new(Cursor::new(image_bytes))
        .with_guessed_format()
        .map_err(|e| StudioError::InvalidImage(format!("failed to guess image format: {e}")))?;
    let mut limits = Limits::default();
    limits.max_alloc = Some(MAX_DECODE_ALLOC_BYTES);
    reader.limits(limits);

    let decoded = reader
        .decode()
        .map_err(|e| StudioError::InvalidImage(format!("failed to decode image: {e}")))?;
    let orientation = read_exif_orientation(image_bytes);
    let oriented = apply_exif_orientation(decoded, orientation).to_rgb8();

    if oriented.width() == 0 || oriented.height() == 0 {
        return Err(StudioError::InvalidImage(
            "decoded image has no pixels".to_string(),
        ));
    }

    debug!(
        width = oriented.width(),
        height = oriented.height(),
        orientation,
        "decoded upload"
    );
    Ok(oriented)
}

fn read_exif_orientation(image_data: &[u8]) -> u32 {
    let mut reader = Cursor::new(image_data);
    let exif = match ExifReader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(error = %e, "no readable EXIF metadata, assuming upright");
            return 1;
        }
    };
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

fn apply_exif_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.fliph().rotate270(),
        6 => image.rotate90(),
        7 => image.fliph().rotate90(),
        8 => image.rotate270(),
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::{apply_exif_orientation, decode_image_from_bytes, read_exif_orientation};
    use crate::error::StudioError;

    #[test]
    fn decode_rejects_empty_payload() {
        let result = decode_image_from_bytes(&[]);

        assert!(matches!(result, Err(StudioError::InvalidImage(_))));
    }

    #[test]
    fn decode_rejects_corrupted_payload() {
        let mut bytes = encode_png(&RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        bytes.truncate(bytes.len() / 2);
        let garbage = b"definitely not an image".to_vec();

        assert!(matches!(
            decode_image_from_bytes(&bytes),
            Err(StudioError::InvalidImage(_))
        ));
        assert!(matches!(
            decode_image_from_bytes(&garbage),
            Err(StudioError::InvalidImage(_))
        ));
    }

    #[test]
    fn missing_exif_means_upright() {
        let bytes = encode_png(&RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));

        assert_eq!(read_exif_orientation(&bytes), 1);
        assert_eq!(read_exif_orientation(b"not even an image"), 1);
    }

    #[test]
    fn decode_round_trips_png_pixels() {
        let source = RgbImage::from_fn(6, 4, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 7]));
        let bytes = encode_png(&source);

        let decoded = decode_image_from_bytes(&bytes).expect("png should decode");

        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded, source);
    }

    #[test]
    fn decode_drops_alpha_channel() {
        let rgba = image::RgbaImage::from_pixel(3, 3, image::Rgba([200, 100, 50, 10]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encoding should succeed");

        let decoded = decode_image_from_bytes(&bytes).expect("rgba png should decode");

        assert_eq!(decoded.get_pixel(1, 1), &Rgb([200, 100, 50]));
    }

    #[test]
    fn exif_rotation_swaps_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 2));

        assert_eq!(apply_exif_orientation(image.clone(), 6).width(), 2);
        assert_eq!(apply_exif_orientation(image.clone(), 8).height(), 4);
        assert_eq!(apply_exif_orientation(image, 1).width(), 4);
    }

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encoding should succeed");
        bytes
    }
}
