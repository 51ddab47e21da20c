use image::RgbImage;

use crate::error::{StudioError, StudioResult};

pub const YOLO_INPUT_WIDTH: usize = 640;
pub const YOLO_INPUT_HEIGHT: usize = 640;
const PAD_VALUE: f32 = 114.0;

pub fn preprocess_yolo(image: &RgbImage) -> StudioResult<(Vec<f32>, usize, usize)> {
    if image.width() == 0 || image.height() == 0 {
        return Err(StudioError::InvalidImage(
            "image dimensions cannot be zero".to_string(),
        ));
    }

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let scale = (YOLO_INPUT_WIDTH as f32 / src_w).min(YOLO_INPUT_HEIGHT as f32 / src_h);
    let scaled_width = (src_w * scale).round().clamp(0.0, YOLO_INPUT_WIDTH as f32) as usize;
    let scaled_height = (src_h * scale).round().clamp(0.0, YOLO_INPUT_HEIGHT as f32) as usize;

    let mut output = vec![0f32; 3 * YOLO_INPUT_WIDTH * YOLO_INPUT_HEIGHT];
    let green_offset = YOLO_INPUT_WIDTH * YOLO_INPUT_HEIGHT;
    let blue_offset = 2 * YOLO_INPUT_WIDTH * YOLO_INPUT_HEIGHT;

    for y in 0..YOLO_INPUT_HEIGHT {
        for x in 0..YOLO_INPUT_WIDTH {
            let idx = y * YOLO_INPUT_WIDTH + x;
            let rgb = if x >= scaled_width || y >= scaled_height {
                [PAD_VALUE, PAD_VALUE, PAD_VALUE]
            } else {
                sample_bilinear_rgb(image, x as f32 / scale, y as f32 / scale)
            };
            output[idx] = rgb[0] / 255.0;
            output[idx + green_offset] = rgb[1] / 255.0;
            output[idx + blue_offset] = rgb[2] / 255.0;
        }
    }

    Ok((output, scaled_width, scaled_height))
}

fn sample_bilinear_rgb(image: &RgbImage, fx: f32, fy: f32) -> [f32; 3] {
    let max_x = image.width().saturating_sub(1) as f32;
    let max_y = image.height().saturating_sub(1) as f32;
    let fx = fx.clamp(0.0, max_x);
    let fy = fy.clamp(0.0, max_y);

    let x0 = fx.floor() as u32;
    let x1 = fx.ceil() as u32;
    let y0 = fy.floor() as u32;
    let y1 = fy.ceil() as u32;
    let dx = fx - x0 as f32;
    let dy = fy - y0 as f32;
    let dx1 = 1.0 - dx;
    let dy1 = 1.0 - dy;

    let p1 = read_rgb(image, x0, y0);
    let p2 = read_rgb(image, x1, y0);
    let p3 = read_rgb(image, x0, y1);
    let p4 = read_rgb(image, x1, y1);

    let blend = |v1: f32, v2: f32, v3: f32, v4: f32| -> f32 {
        v1 * dx1 * dy1 + v2 * dx * dy1 + v3 * dx1 * dy + v4 * dx * dy
    };

    [
        blend(p1[0], p2[0], p3[0], p4[0]),
        blend(p1[1], p2[1], p3[1], p4[1]),
        blend(p1[2], p2[2], p3[2], p4[2]),
    ]
}

fn read_rgb(image: &RgbImage, x: u32, y: u32) -> [f32; 3] {
    let pixel = image.get_pixel(x, y);
    [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32]
}
