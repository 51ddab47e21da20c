#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (i64, i64) {
        (
            i64::from(self.x) + i64::from(self.width) / 2,
            i64::from(self.y) + i64::from(self.height) / 2,
        )
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[derive(Clone, Debug)]
pub struct FaceDetection {
    pub score: f32,
    pub box_xyxy: [f32; 4],
}

impl FaceDetection {
    pub fn to_face_box(&self, image_width: u32, image_height: u32) -> FaceBox {
        let w = image_width as f32;
        let h = image_height as f32;
        let x_min = (self.box_xyxy[0].clamp(0.0, 1.0) * w).round();
        let y_min = (self.box_xyxy[1].clamp(0.0, 1.0) * h).round();
        let x_max = (self.box_xyxy[2].clamp(0.0, 1.0) * w).round();
        let y_max = (self.box_xyxy[3].clamp(0.0, 1.0) * h).round();

        FaceBox {
            x: x_min as u32,
            y: y_min as u32,
            width: (x_max - x_min).max(0.0) as u32,
            height: (y_max - y_min).max(0.0) as u32,
        }
    }
}
